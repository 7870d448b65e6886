//! FIFO request queue with head-of-line requeue for retries.

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::{ApiResponse, OutboundRequest, SchedulerError};

/// Result delivered to the submitting caller.
pub type RequestOutcome = Result<ApiResponse, SchedulerError>;

/// A request waiting in (or taken from) the queue.
#[derive(Debug)]
pub struct QueuedRequest {
    /// Unique request identifier.
    pub id: Uuid,
    /// What to send.
    pub request: OutboundRequest,
    /// 429 retries performed so far.
    pub retries: u32,
    /// When the caller submitted it.
    pub submitted_at: Instant,
    responder: oneshot::Sender<RequestOutcome>,
}

impl QueuedRequest {
    /// New request plus the receiver its outcome will be delivered on.
    pub fn new(request: OutboundRequest) -> (Self, oneshot::Receiver<RequestOutcome>) {
        let (tx, rx) = oneshot::channel();
        let queued = Self {
            id: Uuid::new_v4(),
            request,
            retries: 0,
            submitted_at: Instant::now(),
            responder: tx,
        };
        (queued, rx)
    }

    /// Deliver the terminal outcome. Returns false if the caller went away.
    pub fn complete(self, outcome: RequestOutcome) -> bool {
        let id = self.id;
        let delivered = self.responder.send(outcome).is_ok();
        if !delivered {
            tracing::debug!(%id, "caller dropped before the outcome was delivered");
        }
        delivered
    }
}

/// Ordered pending requests. Oldest at the head, retries reinserted at the head.
#[derive(Debug, Default)]
pub struct RequestQueue {
    items: VecDeque<QueuedRequest>,
    peak_depth: usize,
}

impl RequestQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new submission at the tail.
    pub fn push_back(&mut self, request: QueuedRequest) {
        self.items.push_back(request);
        self.peak_depth = self.peak_depth.max(self.items.len());
    }

    /// Reinsert a retry at the head, ahead of everything submitted after it.
    pub fn requeue_front(&mut self, request: QueuedRequest) {
        self.items.push_front(request);
        self.peak_depth = self.peak_depth.max(self.items.len());
    }

    /// Take the head.
    pub fn pop_front(&mut self) -> Option<QueuedRequest> {
        self.items.pop_front()
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No pending requests.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Largest depth observed.
    pub const fn peak_depth(&self) -> usize {
        self.peak_depth
    }
}
