//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (race the call against deadline and cancellation)
//!     → On transport failure: retries.rs (retry same backend with fixed backoff)
//!     → Retries used up: dispatcher marks backend dead and fails over
//! ```

pub mod retries;
pub mod timeouts;
