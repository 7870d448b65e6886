//! Dispatch event sinks.
//!
//! Every attempt the drain loop makes is reported as a [`DispatchEvent`].
//! The in-memory sink keeps a bounded history for inspection.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Upstream answered with this status.
    Status(u16),
    /// Transport-level failure.
    TransportError(String),
}

/// One dispatch attempt.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    /// Request identifier.
    pub request_id: Uuid,
    /// Path relative to the API prefix.
    pub path: String,
    /// Token pool slot used.
    pub token_slot: usize,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// When the dispatch started.
    pub dispatched_at: Instant,
    /// Time between submission and this dispatch, backoff included.
    pub queue_wait: Duration,
    /// Result of the attempt.
    pub outcome: DispatchOutcome,
}

/// Receiver of dispatch events.
pub trait DispatchSink: Send + Sync {
    /// Record a dispatch event.
    fn record(&self, event: DispatchEvent);
}

/// Bounded in-memory sink for tests and diagnostics.
pub struct InMemoryDispatchLog {
    events: Mutex<VecDeque<DispatchEvent>>,
    max_events: usize,
}

impl InMemoryDispatchLog {
    /// Create a sink retaining at most `max_events`, dropping the oldest.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events: max_events.max(1),
        }
    }

    /// Snapshot of stored events, oldest first.
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl DispatchSink for InMemoryDispatchLog {
    fn record(&self, event: DispatchEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}
