//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → TCP connect to each backend (bounded fan-out, 2s timeout)
//!     → Backend::set_alive(result)
//!
//! Passive detection lives in the dispatcher: a backend that exhausts its
//! retries is marked dead for the whole pool.
//! ```
//!
//! # Design Decisions
//! - No hysteresis: one probe result flips liveness immediately
//! - A probe may revive a backend the failover path just killed; that race is accepted
//! - Health state is per-backend, not per-pool

pub mod active;

pub use active::HealthMonitor;
