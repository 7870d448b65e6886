//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// `Clone` so that a fatal initialization outcome can be cached once and
/// handed to every caller queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No complete client id/secret pair was configured.
    #[error("no usable client credentials configured")]
    NoCredentials,
    /// Every configured credential pair failed its token exchange.
    #[error("token pool initialization failed: {0}")]
    InitializationFailed(String),
    /// A single client-credentials exchange failed.
    #[error("token exchange failed for credential #{index}: {reason}")]
    TokenExchange {
        /// Configuration index of the credential pair.
        index: u32,
        /// Upstream or transport failure description.
        reason: String,
    },
    /// Network-level failure while issuing a request.
    #[error("transport error: {0}")]
    Transport(String),
    /// The drain loop dropped the request without producing an outcome.
    #[error("request abandoned before completion")]
    Abandoned,
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Upstream answered with a non-success status where one was required.
    #[error("upstream returned status {status} for {path}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Request path, relative to the API prefix.
        path: String,
    },
    /// Response body did not match the expected shape.
    #[error("failed to decode response for {path}: {reason}")]
    Decode {
        /// Request path, relative to the API prefix.
        path: String,
        /// Decoder failure description.
        reason: String,
    },
}

impl SchedulerError {
    /// Whether this error is a cached, process-lifetime initialization failure.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::NoCredentials | Self::InitializationFailed(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
