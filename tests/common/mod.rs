//! Shared fixtures: a scripted upstream and scheduler constructors.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::time::Instant;

use campus_scheduler::config::{CredentialPair, SchedulerConfig};
use campus_scheduler::core::{
    AccessToken, ApiResponse, ClientCredential, InMemoryDispatchLog, OutboundRequest,
    RequestScheduler, SchedulerError, Upstream,
};
use campus_scheduler::runtime::TokioSpawner;

/// Scripted reply for one attempt.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Body(u16, String),
    Transport(&'static str),
    Panic(&'static str),
}

/// One call observed by the upstream.
#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub token: String,
    pub at: Instant,
}

/// In-process upstream with per-path scripted replies.
///
/// Unscripted attempts answer 200 with the request path as body.
#[derive(Clone, Default)]
pub struct ScriptedUpstream {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    always: Arc<Mutex<HashMap<String, Reply>>>,
    failing_credentials: Arc<Mutex<HashSet<u32>>>,
    exchanges: Arc<Mutex<HashMap<u32, u32>>>,
    token_calls: Arc<AtomicUsize>,
    token_delay: Arc<Mutex<Duration>>,
    token_ttl: Arc<Mutex<Option<Duration>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for successive attempts on `path`.
    pub fn script(&self, path: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.replies
            .lock()
            .entry(path.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Answer every attempt on `path` with `reply`.
    pub fn always(&self, path: &str, reply: Reply) -> &Self {
        self.always.lock().insert(path.to_string(), reply);
        self
    }

    /// Make token exchanges for credential `index` fail.
    pub fn fail_credential(&self, index: u32) -> &Self {
        self.failing_credentials.lock().insert(index);
        self
    }

    /// Delay each token exchange.
    pub fn token_delay(&self, delay: Duration) -> &Self {
        *self.token_delay.lock() = delay;
        self
    }

    /// Issue tokens that expire after `ttl`.
    pub fn token_ttl(&self, ttl: Duration) -> &Self {
        *self.token_ttl.lock() = Some(ttl);
        self
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn call_tokens(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.token).collect()
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        if let Some(reply) = self.always.lock().get(path) {
            return Some(reply.clone());
        }
        self.replies.lock().get_mut(path).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn exchange_token(
        &self,
        credential: &ClientCredential,
    ) -> Result<AccessToken, SchedulerError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.token_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing_credentials.lock().contains(&credential.index) {
            return Err(SchedulerError::TokenExchange {
                index: credential.index,
                reason: "invalid_client".into(),
            });
        }

        let generation = {
            let mut exchanges = self.exchanges.lock();
            let n = exchanges.entry(credential.index).or_insert(0);
            *n += 1;
            *n
        };
        let value = if generation == 1 {
            format!("tok{}", credential.index)
        } else {
            format!("tok{}-g{generation}", credential.index)
        };
        let ttl = *self.token_ttl.lock();
        Ok(match ttl {
            Some(ttl) => AccessToken::expiring(value, Instant::now() + ttl),
            None => AccessToken::new(value),
        })
    }

    async fn send(
        &self,
        request: &OutboundRequest,
        token: &AccessToken,
    ) -> Result<ApiResponse, SchedulerError> {
        let path = request.path().to_string();
        self.calls.lock().push(Call {
            path: path.clone(),
            token: token.secret().to_string(),
            at: Instant::now(),
        });

        match self.next_reply(&path) {
            Some(Reply::Transport(reason)) => Err(SchedulerError::Transport(reason.into())),
            Some(Reply::Panic(message)) => panic!("{message}"),
            Some(Reply::Status(code)) => Ok(ApiResponse::new(
                status_of(code),
                Default::default(),
                path.into_bytes(),
            )),
            Some(Reply::Body(code, body)) => Ok(ApiResponse::new(
                status_of(code),
                Default::default(),
                body.into_bytes(),
            )),
            None => Ok(ApiResponse::new(
                StatusCode::OK,
                Default::default(),
                path.into_bytes(),
            )),
        }
    }
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Config with `n` complete credential pairs, indices 1..=n.
pub fn config_with_pairs(n: u32) -> SchedulerConfig {
    SchedulerConfig {
        credentials: (1..=n)
            .map(|i| CredentialPair::new(i, format!("id{i}"), format!("secret{i}")))
            .collect(),
        ..SchedulerConfig::default()
    }
}

/// Scheduler on the current runtime with an in-memory dispatch log.
pub fn scheduler_with_log(
    cfg: &SchedulerConfig,
    upstream: ScriptedUpstream,
) -> (
    RequestScheduler<ScriptedUpstream, TokioSpawner>,
    Arc<InMemoryDispatchLog>,
) {
    let log = Arc::new(InMemoryDispatchLog::new(1024));
    let scheduler =
        RequestScheduler::with_dispatch_sink(cfg, upstream, TokioSpawner::current(), log.clone());
    (scheduler, log)
}
