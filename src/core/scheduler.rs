//! The request scheduler: a single paced drain loop over a FIFO queue,
//! rotating across a lazily initialized token pool.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, OnceCell};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::{CredentialPair, SchedulerConfig};
use crate::core::{
    ApiResponse, DispatchEvent, DispatchOutcome, DispatchSink, OutboundRequest, Pacer,
    QueuedRequest, RequestOptions, RequestOutcome, RequestQueue, RetryDecision, RetryPolicy,
    SchedulerError, TokenCheckout, TokenPool, Upstream,
};

/// Abstraction for spawning the drain loop on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Counters describing scheduler activity since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Requests accepted by `submit`.
    pub submitted: u64,
    /// Dispatch attempts, retries included.
    pub dispatched: u64,
    /// Attempts that ended in a 429 and were requeued.
    pub retried: u64,
    /// Requests resolved with a response.
    pub completed: u64,
    /// Resolved requests whose final response was still a 429.
    pub rate_limit_exhausted: u64,
    /// Requests rejected with a transport error.
    pub transport_failures: u64,
    /// Largest queue depth observed.
    pub peak_queue_depth: usize,
}

struct DispatchState {
    queue: RequestQueue,
    pacer: Pacer,
    /// Set while a drain loop is scheduled or running. Only changed under
    /// this lock, together with the queue.
    draining: bool,
    stats: SchedulerStats,
}

struct Shared<U> {
    upstream: U,
    credentials: Vec<CredentialPair>,
    retry: RetryPolicy,
    requests_per_token_per_second: u32,
    refresh_expired_tokens: bool,
    /// Single-flight initialization; the outcome, fatal or not, is kept.
    pool: OnceCell<Result<Arc<TokenPool>, SchedulerError>>,
    state: Mutex<DispatchState>,
    sink: Option<Arc<dyn DispatchSink>>,
}

/// Handle to a submitted request.
#[derive(Debug)]
pub struct PendingResponse {
    id: Uuid,
    rx: oneshot::Receiver<RequestOutcome>,
}

impl PendingResponse {
    /// Request identifier, as reported in dispatch events.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the request to resolve or reject.
    pub async fn wait(self) -> Result<ApiResponse, SchedulerError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(SchedulerError::Abandoned))
    }
}

/// Outbound request scheduler.
///
/// Cheap to clone; all clones share one queue, one token pool and one drain
/// loop. Create one per process and hand clones to every caller.
///
/// At most one request is in flight at any time. Consecutive dispatches are
/// spaced by at least `1s / (requests_per_token_per_second * pool_size)`.
pub struct RequestScheduler<U, S> {
    shared: Arc<Shared<U>>,
    spawner: S,
}

impl<U, S: Clone> Clone for RequestScheduler<U, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<U, S> RequestScheduler<U, S>
where
    U: Upstream,
    S: Spawn,
{
    /// Create a scheduler. No network traffic happens until the first
    /// submission or an explicit [`initialize`](Self::initialize).
    pub fn new(config: &SchedulerConfig, upstream: U, spawner: S) -> Self {
        Self::build(config, upstream, spawner, None)
    }

    /// Create a scheduler that reports every attempt to `sink`.
    pub fn with_dispatch_sink(
        config: &SchedulerConfig,
        upstream: U,
        spawner: S,
        sink: Arc<dyn DispatchSink>,
    ) -> Self {
        Self::build(config, upstream, spawner, Some(sink))
    }

    fn build(
        config: &SchedulerConfig,
        upstream: U,
        spawner: S,
        sink: Option<Arc<dyn DispatchSink>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                upstream,
                credentials: config.credentials.clone(),
                retry: config.retry_policy(),
                requests_per_token_per_second: config.requests_per_token_per_second,
                refresh_expired_tokens: config.refresh_expired_tokens,
                pool: OnceCell::new(),
                state: Mutex::new(DispatchState {
                    queue: RequestQueue::new(),
                    pacer: Pacer::default(),
                    draining: false,
                    stats: SchedulerStats::default(),
                }),
                sink,
            }),
            spawner,
        }
    }

    async fn pool(&self) -> Result<Arc<TokenPool>, SchedulerError> {
        let shared = &self.shared;
        shared
            .pool
            .get_or_init(|| async {
                TokenPool::initialize(&shared.upstream, &shared.credentials)
                    .await
                    .map(Arc::new)
            })
            .await
            .clone()
    }

    /// Run token initialization now instead of on first use.
    /// Returns the pool size.
    pub async fn initialize(&self) -> Result<usize, SchedulerError> {
        self.pool().await.map(|pool| pool.len())
    }

    /// Queue `path` for dispatch and return a handle to its outcome.
    ///
    /// Waits for token initialization if it has not completed. A fatal
    /// initialization failure is returned here, to this and every later call.
    pub async fn submit(
        &self,
        path: impl Into<String>,
        options: RequestOptions,
    ) -> Result<PendingResponse, SchedulerError> {
        let pool = self.pool().await?;
        let (queued, rx) = QueuedRequest::new(OutboundRequest::new(path, options));
        let id = queued.id;

        let start_drain = {
            let mut state = self.shared.state.lock();
            state.queue.push_back(queued);
            state.stats.submitted += 1;
            state.stats.peak_queue_depth = state.queue.peak_depth();
            let idle = !state.draining;
            state.draining = true;
            idle
        };

        tracing::debug!(%id, start_drain, "request queued");
        if start_drain {
            self.spawner.spawn(Arc::clone(&self.shared).drain(pool));
        }
        Ok(PendingResponse { id, rx })
    }

    /// Submit and wait for the response.
    ///
    /// Any HTTP status is returned as a response, including a 429 once the
    /// retries are exhausted. Only transport failures are errors.
    pub async fn fetch(
        &self,
        path: impl Into<String>,
        options: RequestOptions,
    ) -> Result<ApiResponse, SchedulerError> {
        self.submit(path, options).await?.wait().await
    }
}

impl<U, S> RequestScheduler<U, S> {
    /// Activity counters.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.state.lock().stats.clone()
    }

    /// Requests waiting for dispatch.
    pub fn queue_len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Whether a drain loop is scheduled or running.
    pub fn is_draining(&self) -> bool {
        self.shared.state.lock().draining
    }

    /// Pool size once initialization succeeded.
    pub fn pool_size(&self) -> Option<usize> {
        match self.shared.pool.get() {
            Some(Ok(pool)) => Some(pool.len()),
            _ => None,
        }
    }

    /// Cached fatal initialization error, if any.
    pub fn initialization_error(&self) -> Option<SchedulerError> {
        match self.shared.pool.get() {
            Some(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// Minimum spacing between dispatches once the pool is known.
    pub fn dispatch_interval(&self) -> Option<Duration> {
        self.pool_size().map(|size| {
            crate::core::token_pool::dispatch_interval(
                self.shared.requests_per_token_per_second,
                size,
            )
        })
    }
}

/// Clears `draining` if the drain task ends without reaching an empty queue,
/// so the next submission starts a fresh loop.
struct DrainReset<'a, U> {
    shared: &'a Shared<U>,
    armed: bool,
}

impl<U> DrainReset<'_, U> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<U> Drop for DrainReset<'_, U> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.state.lock().draining = false;
            tracing::error!("drain loop exited abnormally, next submission restarts it");
        }
    }
}

impl<U: Upstream> Shared<U> {
    async fn drain(self: Arc<Self>, pool: Arc<TokenPool>) {
        let interval = pool.dispatch_interval(self.requests_per_token_per_second);
        tracing::debug!(?interval, "drain loop started");
        let mut reset = DrainReset {
            shared: &*self,
            armed: true,
        };

        loop {
            let wait = {
                let mut state = self.state.lock();
                if state.queue.is_empty() {
                    state.draining = false;
                    reset.disarm();
                    break;
                }
                state.pacer.remaining(interval, Instant::now())
            };
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            let (job, dispatched_at) = {
                let mut state = self.state.lock();
                let Some(job) = state.queue.pop_front() else {
                    state.draining = false;
                    reset.disarm();
                    break;
                };
                let now = Instant::now();
                state.pacer.mark(now);
                state.stats.dispatched += 1;
                (job, now)
            };

            self.dispatch(job, &pool, dispatched_at).await;
        }

        tracing::debug!("drain loop idle");
    }

    async fn dispatch(&self, mut job: QueuedRequest, pool: &TokenPool, dispatched_at: Instant) {
        let checkout = self.checkout(pool).await;
        let attempt = job.retries + 1;
        tracing::debug!(
            id = %job.id,
            path = job.request.path(),
            slot = checkout.slot,
            attempt,
            "dispatching"
        );

        let result = AssertUnwindSafe(self.upstream.send(&job.request, &checkout.token))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(upstream_panic(panic.as_ref())));
        self.report(&job, checkout.slot, attempt, dispatched_at, &result);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.state.lock().stats.transport_failures += 1;
                tracing::warn!(id = %job.id, path = job.request.path(), error = %e, "request failed");
                job.complete(Err(e));
                return;
            }
        };

        match self.retry.decide(response.status(), job.retries) {
            RetryDecision::Retry { delay } => {
                tracing::warn!(
                    id = %job.id,
                    path = job.request.path(),
                    retries = job.retries,
                    ?delay,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                job.retries += 1;
                let mut state = self.state.lock();
                state.stats.retried += 1;
                state.queue.requeue_front(job);
                state.stats.peak_queue_depth = state.queue.peak_depth();
            }
            RetryDecision::Resolve => {
                let exhausted = response.is_rate_limited();
                {
                    let mut state = self.state.lock();
                    state.stats.completed += 1;
                    if exhausted {
                        state.stats.rate_limit_exhausted += 1;
                    }
                }
                if exhausted {
                    tracing::warn!(
                        id = %job.id,
                        path = job.request.path(),
                        attempts = attempt,
                        "still rate limited after final retry"
                    );
                }
                job.complete(Ok(response));
            }
        }
    }

    /// Next token in rotation, refreshed first if enabled and expired.
    async fn checkout(&self, pool: &TokenPool) -> TokenCheckout {
        let mut checkout = pool.checkout();
        if !self.refresh_expired_tokens || !checkout.token.is_expired(Instant::now()) {
            return checkout;
        }

        let refreshed = AssertUnwindSafe(self.upstream.exchange_token(&checkout.credential))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(upstream_panic(panic.as_ref())));
        match refreshed {
            Ok(token) => {
                tracing::info!(slot = checkout.slot, "refreshed expired access token");
                pool.replace(checkout.slot, token.clone());
                checkout.token = token;
            }
            Err(e) => {
                tracing::warn!(slot = checkout.slot, error = %e, "token refresh failed, using stale token");
            }
        }
        checkout
    }

    fn report(
        &self,
        job: &QueuedRequest,
        token_slot: usize,
        attempt: u32,
        dispatched_at: Instant,
        result: &RequestOutcome,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };
        let outcome = match result {
            Ok(response) => DispatchOutcome::Status(response.status().as_u16()),
            Err(e) => DispatchOutcome::TransportError(e.to_string()),
        };
        sink.record(DispatchEvent {
            request_id: job.id,
            path: job.request.path().to_string(),
            token_slot,
            attempt,
            dispatched_at,
            queue_wait: dispatched_at.saturating_duration_since(job.submitted_at),
            outcome,
        });
    }
}

/// A panicking upstream call fails only the request it was serving.
fn upstream_panic(panic: &(dyn Any + Send)) -> SchedulerError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    SchedulerError::Transport(format!("upstream panicked: {message}"))
}
