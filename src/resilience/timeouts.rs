//! Deadline and cancellation enforcement.
//!
//! # Responsibilities
//! - Race backend calls and backoff waits against the request deadline
//! - Abort cleanly when the request is cancelled (client gone, shutdown)
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities
//! - Interruption is distinct from transport failure and is never retried

use std::future::Future;
use tokio::time;

use crate::proxy::meta::RequestMeta;

/// Why a guarded operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("request cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Run `fut` unless the request is cancelled or its deadline passes first.
pub async fn guard<F>(meta: &RequestMeta, fut: F) -> Result<F::Output, Interrupted>
where
    F: Future,
{
    let deadline = async {
        match meta.deadline() {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = meta.cancellation().cancelled() => Err(Interrupted::Cancelled),
        _ = deadline => Err(Interrupted::DeadlineExceeded),
        output = fut => Ok(output),
    }
}
