//! Core scheduling abstractions: queue, pacing, retries and token rotation.

pub mod dispatch_log;
pub mod error;
pub mod pacing;
pub mod queue;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod token_pool;
pub mod upstream;

pub use dispatch_log::{DispatchEvent, DispatchOutcome, DispatchSink, InMemoryDispatchLog};
pub use error::{AppResult, SchedulerError};
pub use pacing::Pacer;
pub use queue::{QueuedRequest, RequestOutcome, RequestQueue};
pub use request::{ApiResponse, OutboundRequest, RequestOptions};
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::{PendingResponse, RequestScheduler, SchedulerStats, Spawn};
pub use token_pool::{TokenCheckout, TokenPool};
pub use upstream::{AccessToken, ClientCredential, Upstream};
