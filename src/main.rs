//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                  LOAD BALANCER                     │
//!                      │                                                    │
//!   Client Request     │  ┌──────────┐    ┌────────────┐    ┌────────────┐ │
//!   ───────────────────┼─▶│  http    │───▶│ dispatcher │───▶│    pool    │ │
//!                      │  │ server   │    │            │    │ round robin│ │
//!                      │  └──────────┘    └─────┬──────┘    └────────────┘ │
//!                      │                        │  ▲ failover              │
//!                      │                        ▼  │                       │
//!   Client Response    │                  ┌────────────┐                   │
//!   ◀──────────────────┼──────────────────│  adapter   │◀──────────────────┼──── Backend
//!                      │                  │ retry x3   │                   │
//!                      │                  └────────────┘                   │
//!                      │                                                    │
//!                      │  health monitor: TCP probe → backend liveness      │
//!                      └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use rr_proxy::cli::Cli;
use rr_proxy::lifecycle::startup;
use rr_proxy::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    init_logging(&config.observability.log_level);

    tracing::info!("rr-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = ?config.backends,
        health_interval_secs = config.health_check.interval_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
