//! Request dispatch across the backend pool.

use axum::body::Body;
use axum::http::Response;
use std::sync::Arc;

use crate::http::request::BufferedRequest;
use crate::load_balancer::pool::BackendPool;
use crate::observability::metrics;
use crate::proxy::adapter::ForwardError;
use crate::proxy::meta::RequestMeta;
use crate::resilience::timeouts::Interrupted;

/// Terminal outcome of a request that produced no backend response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no live backend available")]
    PoolExhausted,
    #[error("gave up after failing over {attempts} backends")]
    AttemptsExhausted { attempts: u32 },
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Entry point for every inbound request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<BackendPool>,
    max_attempts: u32,
}

impl Dispatcher {
    /// `max_attempts` caps how many backends one request may be sent to.
    /// Defaults to the pool size.
    pub fn new(pool: Arc<BackendPool>, max_attempts: Option<u32>) -> Self {
        let max_attempts = max_attempts
            .unwrap_or_else(|| u32::try_from(pool.len()).unwrap_or(u32::MAX))
            .max(1);
        Self { pool, max_attempts }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Forward `request` to a live backend, failing over when a backend
    /// exhausts its retries.
    ///
    /// A backend that exhausts its retries is marked dead for every request,
    /// not just this one.
    pub async fn dispatch(
        &self,
        request: &BufferedRequest,
        meta: RequestMeta,
    ) -> Result<Response<Body>, DispatchError> {
        let mut meta = meta;
        loop {
            let Some(peer) = self.pool.next_peer() else {
                tracing::warn!(attempts = meta.attempts(), "No live backends");
                return Err(DispatchError::PoolExhausted);
            };

            tracing::debug!(
                backend = %peer.url(),
                method = %request.method(),
                path = %request.uri().path(),
                attempt = meta.attempts(),
                "Forwarding request"
            );

            match peer.adapter().forward(request, meta.clone()).await {
                Ok(response) => return Ok(response),
                Err(ForwardError::Exhausted { backend, retries, source }) => {
                    self.pool.mark_status(&backend, false);
                    metrics::record_failover(backend.as_str());

                    meta = meta.next_attempt();
                    tracing::warn!(
                        backend = %backend,
                        retries,
                        attempts = meta.attempts(),
                        error = %source,
                        "Backend marked dead, failing over"
                    );

                    if meta.attempts() >= self.max_attempts {
                        return Err(DispatchError::AttemptsExhausted {
                            attempts: meta.attempts(),
                        });
                    }
                }
                Err(ForwardError::Interrupted(reason)) => return Err(reason.into()),
                Err(ForwardError::Request(error)) => return Err(error.into()),
            }
        }
    }
}
