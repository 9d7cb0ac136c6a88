//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher needs a peer
//!     → pool.rs (next_peer)
//!     → round_robin.rs (advance shared rotation counter)
//!     → scan one full turn for a live backend.rs
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - Pool membership is fixed at startup; only liveness changes
//! - Rotation counter is the only pool-wide mutable state, touched atomically
//! - Liveness is tracked per backend; no lock spans the pool

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{BackendPool, PoolError};
