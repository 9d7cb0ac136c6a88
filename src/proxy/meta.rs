//! Request-scoped retry and failover bookkeeping.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-request retry state, threaded through dispatch by value.
///
/// Each retry or failover derives a fresh copy; earlier values are never
/// mutated. Dropped together with the request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Retries against the current backend.
    retries: u32,
    /// Backends abandoned so far for this request.
    attempts: u32,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestMeta {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            retries: 0,
            attempts: 0,
            deadline: None,
            cancel,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Metadata for one more try against the same backend.
    pub fn next_retry(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self.clone()
        }
    }

    /// Metadata for moving on to another backend. The retry count restarts.
    pub fn next_attempt(&self) -> Self {
        Self {
            retries: 0,
            attempts: self.attempts + 1,
            ..self.clone()
        }
    }
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
