//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by final status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_backend_retries_total` (counter): transport retries per backend
//! - `proxy_backend_failovers_total` (counter): backends abandoned per backend
//! - `proxy_backend_health` (gauge): 1=alive, 0=dead
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(status: u16, start: Instant) {
    counter!("proxy_requests_total", "status" => status.to_string()).increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_retry(backend: &str) {
    counter!("proxy_backend_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_failover(backend: &str) {
    counter!("proxy_backend_failovers_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("proxy_backend_health", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}
