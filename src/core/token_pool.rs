//! Token pool with round-robin checkout.

use std::time::Duration;

use parking_lot::Mutex;

use crate::config::CredentialPair;
use crate::core::{AccessToken, ClientCredential, SchedulerError, Upstream};

/// One pool slot: the credential and the token it produced.
#[derive(Debug, Clone)]
struct TokenSlot {
    credential: ClientCredential,
    token: AccessToken,
}

#[derive(Debug)]
struct PoolInner {
    slots: Vec<TokenSlot>,
    /// Next slot to hand out. Always `< slots.len()`.
    cursor: usize,
}

/// A token handed out for one dispatch.
#[derive(Debug, Clone)]
pub struct TokenCheckout {
    /// Slot index within the pool.
    pub slot: usize,
    /// Credential that produced the token, for refresh.
    pub credential: ClientCredential,
    /// Bearer token to authenticate with.
    pub token: AccessToken,
}

/// Ordered, non-empty set of access tokens with a circular cursor.
///
/// The pool size is fixed at construction. Slots may only be refreshed in
/// place.
#[derive(Debug)]
pub struct TokenPool {
    inner: Mutex<PoolInner>,
    size: usize,
}

impl TokenPool {
    /// Build a pool from already-exchanged tokens.
    pub fn new(tokens: Vec<(ClientCredential, AccessToken)>) -> Result<Self, SchedulerError> {
        if tokens.is_empty() {
            return Err(SchedulerError::InitializationFailed(
                "token pool must not be empty".into(),
            ));
        }
        let slots: Vec<_> = tokens
            .into_iter()
            .map(|(credential, token)| TokenSlot { credential, token })
            .collect();
        let size = slots.len();
        Ok(Self {
            inner: Mutex::new(PoolInner { slots, cursor: 0 }),
            size,
        })
    }

    /// Exchange one token per complete credential pair.
    ///
    /// Incomplete pairs are skipped and individual exchange failures are
    /// logged; the pool is built from whatever succeeded. Fails only when no
    /// pair is complete or every exchange failed.
    pub async fn initialize<U>(
        upstream: &U,
        pairs: &[CredentialPair],
    ) -> Result<Self, SchedulerError>
    where
        U: Upstream + ?Sized,
    {
        let mut attempted = 0usize;
        let mut tokens = Vec::new();

        for pair in pairs {
            let Some(credential) = pair.to_credential() else {
                tracing::warn!(
                    index = pair.index,
                    "skipping credential pair with a missing id or secret"
                );
                continue;
            };
            attempted += 1;
            match upstream.exchange_token(&credential).await {
                Ok(token) => {
                    tracing::info!(index = credential.index, "obtained access token");
                    tokens.push((credential, token));
                }
                Err(e) => {
                    tracing::warn!(index = credential.index, error = %e, "token exchange failed");
                }
            }
        }

        if attempted == 0 {
            tracing::error!("no complete credential pairs configured");
            return Err(SchedulerError::NoCredentials);
        }
        if tokens.is_empty() {
            tracing::error!(attempted, "every token exchange failed");
            return Err(SchedulerError::InitializationFailed(format!(
                "all {attempted} token exchanges failed"
            )));
        }

        tracing::info!(pool_size = tokens.len(), attempted, "token pool ready");
        Self::new(tokens)
    }

    /// Number of tokens in the pool.
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Always false for a constructed pool.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Hand out the token under the cursor and advance it circularly.
    pub fn checkout(&self) -> TokenCheckout {
        let mut inner = self.inner.lock();
        let slot = inner.cursor;
        inner.cursor = (slot + 1) % inner.slots.len();
        let entry = &inner.slots[slot];
        TokenCheckout {
            slot,
            credential: entry.credential.clone(),
            token: entry.token.clone(),
        }
    }

    /// Replace the token in `slot`. Out-of-range slots are ignored.
    pub fn replace(&self, slot: usize, token: AccessToken) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.slots.get_mut(slot) {
            entry.token = token;
        }
    }

    /// Minimum spacing between dispatches for this pool size:
    /// one second divided by the pool-wide request budget.
    pub fn dispatch_interval(&self, requests_per_token_per_second: u32) -> Duration {
        dispatch_interval(requests_per_token_per_second, self.size)
    }
}

/// `1000ms / (requests_per_token_per_second * pool_size)`. A zero budget counts as one.
pub fn dispatch_interval(requests_per_token_per_second: u32, pool_size: usize) -> Duration {
    let pool_size = u32::try_from(pool_size).unwrap_or(u32::MAX);
    let budget = requests_per_token_per_second.saturating_mul(pool_size).max(1);
    Duration::from_secs(1) / budget
}
