//! Backend pool management.
//!
//! # Responsibilities
//! - Build the fixed, ordered set of backends from configuration
//! - Select the next live backend by round robin
//! - Apply liveness updates by address

use std::sync::Arc;
use url::Url;

use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};
use crate::observability::metrics;
use crate::proxy::adapter::HttpClient;
use crate::resilience::retries::RetryPolicy;

/// Error building a pool from configured addresses.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid backend address `{address}`: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },
    #[error("backend address `{0}` must use the http scheme")]
    UnsupportedScheme(String),
    #[error("backend address `{0}` has no host")]
    MissingHost(String),
}

/// Parse and check a single backend address.
pub fn parse_backend_url(address: &str) -> Result<Url, PoolError> {
    let url = Url::parse(address).map_err(|source| PoolError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;
    if url.scheme() != "http" {
        return Err(PoolError::UnsupportedScheme(address.to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(PoolError::MissingHost(address.to_string()));
    }
    Ok(url)
}

/// Ordered set of backends sharing one rotation counter.
///
/// Membership is fixed at construction; only liveness changes afterwards.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    rotation: RoundRobin,
}

impl BackendPool {
    /// Build a pool from backend addresses.
    ///
    /// Fails on the first malformed address; no partial pool is returned.
    pub fn new(addresses: &[String], client: HttpClient, policy: RetryPolicy) -> Result<Self, PoolError> {
        let backends = addresses
            .iter()
            .map(|address| {
                parse_backend_url(address)
                    .map(|url| Arc::new(Backend::new(url, client.clone(), policy)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for backend in &backends {
            tracing::info!(backend = %backend.url(), "Backend registered");
        }

        Ok(Self {
            backends,
            rotation: RoundRobin::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Advance the rotation and return the starting index for a selection.
    pub fn next_index(&self) -> Option<usize> {
        self.rotation.next(self.backends.len())
    }

    /// Select the next live backend.
    ///
    /// Scans at most one full turn from the rotation position. When a dead
    /// backend is skipped, the rotation is moved to the chosen index so the
    /// next caller does not rescan past the same dead entries.
    pub fn next_peer(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.next_index()?;

        for offset in 0..len {
            let index = (start + offset) % len;
            let backend = &self.backends[index];
            if backend.is_alive() {
                if index != start {
                    self.rotation.advance_to(index);
                }
                return Some(backend.clone());
            }
        }
        None
    }

    /// Set liveness of the backend whose address equals `url`.
    ///
    /// Unknown addresses are logged and ignored. Returns whether a backend matched.
    pub fn mark_status(&self, url: &Url, alive: bool) -> bool {
        match self.backends.iter().find(|b| b.url() == url) {
            Some(backend) => {
                let previous = backend.set_alive(alive);
                if previous != alive {
                    tracing::info!(backend = %url, alive, "Backend status changed");
                }
                metrics::record_backend_health(url.as_str(), alive);
                true
            }
            None => {
                tracing::warn!(backend = %url, "Backend not found in pool");
                false
            }
        }
    }

    pub fn reset_counter(&self) {
        self.rotation.reset();
    }

    pub fn live_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::adapter::build_client;
    use std::collections::HashMap;
    use std::time::Duration;

    fn pool(addresses: &[&str]) -> BackendPool {
        let addresses: Vec<String> = addresses.iter().map(|s| s.to_string()).collect();
        BackendPool::new(&addresses, build_client(Duration::from_secs(1)), RetryPolicy::default()).unwrap()
    }

    fn abc() -> BackendPool {
        pool(&["http://a.test:8081", "http://b.test:8082", "http://c.test:8083"])
    }

    fn host(backend: &Backend) -> &str {
        backend.url().host_str().unwrap()
    }

    #[tokio::test]
    async fn test_rotation_starts_after_first_backend() {
        let pool = abc();
        let picks: Vec<_> = (0..3).map(|_| host(&pool.next_peer().unwrap()).to_string()).collect();
        assert_eq!(picks, ["b.test", "c.test", "a.test"]);
    }

    #[tokio::test]
    async fn test_fairness_over_full_cycles() {
        let pool = abc();
        let first: Vec<_> = (0..3).map(|_| host(&pool.next_peer().unwrap()).to_string()).collect();
        let second: Vec<_> = (0..3).map(|_| host(&pool.next_peer().unwrap()).to_string()).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dead_backend_skipped() {
        let pool = abc();
        for _ in 0..3 {
            pool.next_peer();
        }
        let b = Url::parse("http://b.test:8082").unwrap();
        assert!(pool.mark_status(&b, false));

        for _ in 0..30 {
            let peer = pool.next_peer().expect("live backends remain");
            assert_ne!(host(&peer), "b.test");
        }
    }

    #[tokio::test]
    async fn test_skip_advances_rotation() {
        let pool = abc();
        let b = Url::parse("http://b.test:8082").unwrap();
        pool.mark_status(&b, false);

        // counter 0 -> start at b (dead) -> c is chosen and the rotation moves to it
        assert_eq!(host(&pool.next_peer().unwrap()), "c.test");
        assert_eq!(pool.rotation.current(), 2);
        assert_eq!(host(&pool.next_peer().unwrap()), "a.test");
    }

    #[tokio::test]
    async fn test_revived_backend_selectable_again() {
        let pool = abc();
        let b = Url::parse("http://b.test:8082").unwrap();
        pool.mark_status(&b, false);
        pool.mark_status(&b, true);
        pool.reset_counter();
        assert_eq!(host(&pool.next_peer().unwrap()), "b.test");
    }

    #[tokio::test]
    async fn test_all_dead_returns_none() {
        let pool = abc();
        for backend in pool.backends() {
            backend.set_alive(false);
        }
        for _ in 0..5 {
            assert!(pool.next_peer().is_none());
        }
        assert_eq!(pool.live_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let pool = pool(&[]);
        assert!(pool.is_empty());
        assert_eq!(pool.next_index(), None);
        assert!(pool.next_peer().is_none());
    }

    #[tokio::test]
    async fn test_unknown_backend_ignored() {
        let pool = abc();
        let unknown = Url::parse("http://z.test:9999").unwrap();
        assert!(!pool.mark_status(&unknown, false));
        assert_eq!(pool.live_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_address_rejected() {
        let addresses = vec!["http://ok.test:80".to_string(), "not a url".to_string()];
        let err = BackendPool::new(&addresses, build_client(Duration::from_secs(1)), RetryPolicy::default())
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidAddress { .. }));

        assert!(matches!(
            parse_backend_url("https://secure.test"),
            Err(PoolError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_concurrent_selection_is_even() {
        let pool = abc();
        let threads = 8;
        let per_thread = 300;

        let counts = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        let mut seen: HashMap<String, usize> = HashMap::new();
                        for _ in 0..per_thread {
                            let peer = pool.next_peer().unwrap();
                            *seen.entry(host(&peer).to_string()).or_default() += 1;
                        }
                        seen
                    })
                })
                .collect();

            let mut total: HashMap<String, usize> = HashMap::new();
            for handle in handles {
                for (name, count) in handle.join().unwrap() {
                    *total.entry(name).or_default() += count;
                }
            }
            total
        });

        assert_eq!(pool.rotation.current(), threads * per_thread);
        for name in ["a.test", "b.test", "c.test"] {
            assert_eq!(counts[name], threads * per_thread / 3);
        }
    }
}
