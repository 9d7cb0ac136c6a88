//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream endpoint
//! - Track liveness (alive/dead)
//! - Own the proxy adapter bound to the endpoint

use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

use crate::proxy::adapter::{HttpClient, ProxyAdapter};
use crate::resilience::retries::RetryPolicy;

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Endpoint address, fixed at construction.
    url: Url,
    /// Liveness flag. Written by the health monitor and the failover path.
    alive: AtomicBool,
    /// Forwarding handle bound to `url`, reused for every request.
    adapter: ProxyAdapter,
}

impl Backend {
    /// Create a new backend. Backends start out alive.
    pub fn new(url: Url, client: HttpClient, policy: RetryPolicy) -> Self {
        let adapter = ProxyAdapter::new(url.clone(), client, policy);
        Self {
            url,
            alive: AtomicBool::new(true),
            adapter,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn adapter(&self) -> &ProxyAdapter {
        &self.adapter
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Set liveness, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::AcqRel)
    }
}
