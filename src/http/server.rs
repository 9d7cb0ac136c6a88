//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the backend pool and dispatcher from configuration
//! - Create the Axum router with a catch-all dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Spawn the health monitor alongside the server
//! - Serve until shutdown, cancelling in-flight retry loops on the way out

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::health::HealthMonitor;
use crate::http::request::{BufferedRequest, UuidRequestId, X_REQUEST_ID};
use crate::http::response;
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::load_balancer::pool::{BackendPool, PoolError};
use crate::observability::metrics;
use crate::proxy::{build_client, Dispatcher, RequestMeta};
use crate::resilience::retries::RetryPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    /// Parent of every request's cancellation token; cancelled on shutdown.
    pub cancel: CancellationToken,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<BackendPool>,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if any backend address is malformed.
    pub fn new(config: ProxyConfig) -> Result<Self, PoolError> {
        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
        let policy = RetryPolicy::from_config(&config.retries);
        let pool = Arc::new(BackendPool::new(&config.backends, client, policy)?);
        let dispatcher = Arc::new(Dispatcher::new(pool.clone(), config.retries.max_attempts));
        let cancel = CancellationToken::new();

        let state = AppState {
            dispatcher,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            max_body_bytes: config.limits.max_body_bytes,
            cancel: cancel.clone(),
        };

        Ok(Self {
            router: Self::build_router(state),
            config,
            pool,
            cancel,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch_handler))
            .route("/{*path}", any(dispatch_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        let cancel = self.cancel.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                wait_for_shutdown(shutdown).await;
                cancel.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffers the request, then hands it to the dispatcher.
async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let buffered = match BufferedRequest::from_request(request, state.max_body_bytes, Some(client)).await {
        Ok(buffered) => buffered,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting request body");
            let response = response::from_body_error(&e);
            metrics::record_request(response.status().as_u16(), start_time);
            return response;
        }
    };

    // Dropping the handler (client disconnect) cancels any in-flight retries.
    let cancel = state.cancel.child_token();
    let _disconnect = cancel.clone().drop_guard();
    let meta = RequestMeta::new(cancel).with_timeout(state.request_timeout);

    let response = match state.dispatcher.dispatch(&buffered, meta).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %buffered.method(),
                path = %buffered.uri().path(),
                error = %e,
                "Request rejected"
            );
            response::from_dispatch_error(&e)
        }
    };

    metrics::record_request(response.status().as_u16(), start_time);
    response
}
