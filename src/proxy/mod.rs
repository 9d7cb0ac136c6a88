//! Request routing engine.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → dispatcher.rs (ask pool for next live backend)
//!     → adapter.rs (forward; retry same backend on transport error)
//!     → success: response flows back
//!     → retries used up: mark backend dead, next_attempt(), select again
//!     → no live backend: 503
//! ```
//!
//! `meta.rs` carries per-request retry/attempt counters, deadline and
//! cancellation through every step.

pub mod adapter;
pub mod dispatcher;
pub mod meta;

pub use adapter::{build_client, ForwardError, HttpClient, ProxyAdapter};
pub use dispatcher::{DispatchError, Dispatcher};
pub use meta::RequestMeta;
