//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body + trailers, strip hop-by-hop, X-Forwarded-For)
//!     → proxy::Dispatcher (pick backend, forward, retry/failover)
//!     → response.rs (503 when no backend could answer)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{BufferedRequest, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
