//! Upstream API abstraction: token exchange and authenticated dispatch.

use std::fmt;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ApiResponse, OutboundRequest, SchedulerError};

/// A complete client-credentials pair.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredential {
    /// Configuration index (the `i` in `CLIENT_ID{i}`).
    pub index: u32,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("index", &self.index)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token obtained from a client-credentials exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    /// Token with no known expiry.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Token that expires at `expires_at`.
    pub fn expiring(value: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }

    /// The bearer secret.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// Expiry reported by the token endpoint, if any.
    pub const fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// True once `now` has reached the reported expiry.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The campus API as seen by the scheduler.
///
/// Implementations perform exactly one network exchange per call and never
/// retry on their own: pacing, rotation and 429 handling belong to the
/// scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use campus_scheduler::core::{AccessToken, ApiResponse, ClientCredential, OutboundRequest, SchedulerError, Upstream};
///
/// struct Canned;
///
/// #[async_trait]
/// impl Upstream for Canned {
///     async fn exchange_token(&self, c: &ClientCredential) -> Result<AccessToken, SchedulerError> {
///         Ok(AccessToken::new(format!("token-{}", c.index)))
///     }
///     async fn send(&self, _req: &OutboundRequest, _token: &AccessToken) -> Result<ApiResponse, SchedulerError> {
///         Ok(ApiResponse::from_status(reqwest::StatusCode::OK))
///     }
/// }
/// ```
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// Run one client-credentials exchange.
    async fn exchange_token(
        &self,
        credential: &ClientCredential,
    ) -> Result<AccessToken, SchedulerError>;

    /// Issue `request` authenticated with `token`.
    ///
    /// Any HTTP status is a successful outcome here; only transport-level
    /// failures are errors.
    async fn send(
        &self,
        request: &OutboundRequest,
        token: &AccessToken,
    ) -> Result<ApiResponse, SchedulerError>;
}
