//! Per-backend forwarding with retry on transport failure.

use axum::body::Body;
use axum::http::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use url::Url;

use crate::http::headers::strip_hop_by_hop;
use crate::http::request::BufferedRequest;
use crate::observability::metrics;
use crate::proxy::meta::RequestMeta;
use crate::resilience::retries::{RetryDecision, RetryPolicy};
use crate::resilience::timeouts::{self, Interrupted};

/// Shared outbound HTTP client. Cloning shares the connection pool.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the outbound client used by every adapter.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Outcome of forwarding that did not produce a response.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Retries against this backend are used up.
    #[error("backend {backend} unreachable after {retries} retries")]
    Exhausted {
        backend: Url,
        retries: u32,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Forwards requests to one backend.
#[derive(Debug, Clone)]
pub struct ProxyAdapter {
    target: Url,
    client: HttpClient,
    policy: RetryPolicy,
}

impl ProxyAdapter {
    pub fn new(target: Url, client: HttpClient, policy: RetryPolicy) -> Self {
        Self {
            target,
            client,
            policy,
        }
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Send `request` to the bound backend.
    ///
    /// Transport failures are retried against the same backend per the retry
    /// policy. Any HTTP response, whatever its status, is returned as is.
    pub async fn forward(
        &self,
        request: &BufferedRequest,
        meta: RequestMeta,
    ) -> Result<Response<Body>, ForwardError> {
        let mut meta = meta;
        loop {
            let outbound = request.build_for(&self.target)?;
            let error = match timeouts::guard(&meta, self.client.request(outbound)).await? {
                Ok(response) => {
                    let (mut parts, body) = response.into_parts();
                    strip_hop_by_hop(&mut parts.headers);
                    return Ok(Response::from_parts(parts, Body::new(body)));
                }
                Err(error) => error,
            };

            tracing::warn!(
                backend = %self.target,
                retry = meta.retries(),
                error = ?error,
                "Upstream transport error"
            );

            match self.policy.decide(&meta) {
                RetryDecision::Retry { delay } => {
                    metrics::record_retry(self.target.as_str());
                    timeouts::guard(&meta, tokio::time::sleep(delay)).await?;
                    meta = meta.next_retry();
                }
                RetryDecision::Failover => {
                    return Err(ForwardError::Exhausted {
                        backend: self.target.clone(),
                        retries: meta.retries(),
                        source: error,
                    });
                }
            }
        }
    }
}
