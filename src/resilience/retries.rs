//! Retry policy for transport failures.
//!
//! # Design Decisions
//! - Only transport errors (connect, reset, timeout) are retried; any HTTP
//!   response from the backend, including 5xx, is passed through
//! - Fixed backoff between retries against the same backend
//! - Once retries are used up the backend is abandoned and the request fails over

use std::time::Duration;

use crate::config::RetryConfig;
use crate::proxy::meta::RequestMeta;

/// What to do after a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then try the same backend again.
    Retry { delay: Duration },
    /// Give up on this backend.
    Failover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.backoff_ms))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn decide(&self, meta: &RequestMeta) -> RetryDecision {
        if meta.retries() < self.max_retries {
            RetryDecision::Retry { delay: self.backoff }
        } else {
            RetryDecision::Failover
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BACKOFF)
    }
}
