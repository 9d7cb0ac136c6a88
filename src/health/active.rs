//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends with a raw TCP connect
//! - Update backend liveness from each result, with no debounce

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time;
use url::Url;

use crate::config::HealthCheckConfig;
use crate::load_balancer::pool::BackendPool;
use crate::observability::metrics;

pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    /// Run probe cycles on a fixed interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let alive = self.check_all().await;
                    tracing::debug!(alive, total = self.pool.len(), "Health check cycle complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once and apply the results. Returns the number
    /// of backends found alive.
    ///
    /// Probes run concurrently, at most `max_concurrent_probes` at a time.
    pub async fn check_all(&self) -> usize {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut probes = stream::iter(self.pool.backends().iter().cloned())
            .map(|backend| async move {
                let alive = probe(backend.url(), timeout).await;
                (backend, alive)
            })
            .buffer_unordered(self.config.max_concurrent_probes.max(1));

        let mut alive_count = 0;
        while let Some((backend, alive)) = probes.next().await {
            let was_alive = backend.set_alive(alive);
            if was_alive != alive {
                if alive {
                    tracing::info!(backend = %backend.url(), "Backend up");
                } else {
                    tracing::warn!(backend = %backend.url(), "Backend down");
                }
            } else {
                tracing::debug!(backend = %backend.url(), status = if alive { "up" } else { "down" }, "Probe result");
            }
            metrics::record_backend_health(backend.url().as_str(), alive);
            alive_count += usize::from(alive);
        }
        alive_count
    }
}

/// Open and close a TCP connection to the backend within `timeout`.
pub async fn probe(url: &Url, timeout: Duration) -> bool {
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    match time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            tracing::debug!(backend = %url, error = %e, "Probe failed: connection error");
            false
        }
        Err(_) => {
            tracing::debug!(backend = %url, "Probe failed: timeout");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::adapter::build_client;
    use crate::resilience::retries::RetryPolicy;
    use tokio::net::TcpListener;

    async fn listening() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, format!("http://{}", addr))
    }

    async fn refused() -> String {
        let (listener, address) = listening().await;
        drop(listener);
        address
    }

    fn monitor(addresses: Vec<String>) -> HealthMonitor {
        let pool = BackendPool::new(&addresses, build_client(Duration::from_secs(1)), RetryPolicy::default()).unwrap();
        let config = HealthCheckConfig {
            enabled: true,
            interval_secs: 1,
            timeout_secs: 2,
            max_concurrent_probes: 4,
        };
        HealthMonitor::new(Arc::new(pool), config)
    }

    #[tokio::test]
    async fn test_probe() {
        let (_listener, up) = listening().await;
        let down = refused().await;

        assert!(probe(&Url::parse(&up).unwrap(), Duration::from_secs(2)).await);
        assert!(!probe(&Url::parse(&down).unwrap(), Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_single_failure_marks_dead() {
        let (_listener, up) = listening().await;
        let down = refused().await;
        let monitor = monitor(vec![up, down]);

        assert_eq!(monitor.check_all().await, 1);
        assert!(monitor.pool.backends()[0].is_alive());
        assert!(!monitor.pool.backends()[1].is_alive());
    }

    #[tokio::test]
    async fn test_single_success_revives() {
        let (_listener, up) = listening().await;
        let monitor = monitor(vec![up]);
        let backend = monitor.pool.backends()[0].clone();

        // killed by the failover path moments earlier
        backend.set_alive(false);
        assert_eq!(monitor.check_all().await, 1);
        assert!(backend.is_alive());
    }

    #[tokio::test]
    async fn test_disabled_monitor_returns_immediately() {
        let mut monitor = monitor(vec![refused().await]);
        monitor.config.enabled = false;
        let (_tx, rx) = broadcast::channel(1);

        time::timeout(Duration::from_secs(1), monitor.run(rx)).await.unwrap();
    }
}
