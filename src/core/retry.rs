//! Bounded exponential backoff for rate-limited responses.

use std::time::Duration;

use reqwest::StatusCode;

/// What the drain loop does with a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the response to the caller.
    Resolve,
    /// Wait `delay`, then requeue at the front.
    Retry {
        /// Backoff before requeueing.
        delay: Duration,
    },
}

/// Retry ceiling and base delay for 429 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// `base_delay * 2^retries`, saturating.
    pub fn backoff(&self, retries: u32) -> Duration {
        let factor = 1u32.checked_shl(retries).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Only 429 is retried, and only while `retries` is under the ceiling.
    pub fn decide(&self, status: StatusCode, retries: u32) -> RetryDecision {
        if status == StatusCode::TOO_MANY_REQUESTS && retries < self.max_retries {
            RetryDecision::Retry {
                delay: self.backoff(retries),
            }
        } else {
            RetryDecision::Resolve
        }
    }
}
