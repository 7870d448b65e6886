//! Dispatch pacing: a strict floor on the spacing between dispatches.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the last dispatch start and computes the wait before the next one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacer {
    last_dispatch: Option<Instant>,
}

impl Pacer {
    /// Time still to wait at `now` so the next dispatch is at least
    /// `interval` after the previous one.
    pub fn remaining(&self, interval: Duration, now: Instant) -> Duration {
        self.last_dispatch.map_or(Duration::ZERO, |last| {
            interval.saturating_sub(now.saturating_duration_since(last))
        })
    }

    /// Record a dispatch start.
    pub fn mark(&mut self, at: Instant) {
        self.last_dispatch = Some(at);
    }
}
