//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Buffer the inbound request once so every retry replays the same payload
//! - Rewrite the request onto a backend's base URL
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body and trailers are buffered up to a configured limit; larger bodies are rejected
//! - Original request preserved; a fresh copy is built for each attempt

use axum::body::{Body, Bytes};
use axum::http::{self, header, request::Request, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited, StreamBody};
use hyper::body::Frame;
use std::convert::Infallible;
use std::net::SocketAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;

use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator backed by UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Failure reading the inbound body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// An inbound request held in memory so it can be sent more than once.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    trailers: Option<HeaderMap>,
}

impl BufferedRequest {
    /// Read `request` fully, keeping at most `limit` body bytes.
    ///
    /// Hop-by-hop headers are dropped and `client` is appended to `X-Forwarded-For`.
    pub async fn from_request(
        request: Request<Body>,
        limit: usize,
        client: Option<SocketAddr>,
    ) -> Result<Self, BodyError> {
        let (parts, body) = request.into_parts();

        let collected = Limited::new(body, limit).collect().await.map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                BodyError::TooLarge { limit }
            } else {
                BodyError::Read(e.to_string())
            }
        })?;
        let trailers = collected.trailers().cloned();
        let body = collected.to_bytes();

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if let Some(client) = client {
            append_forwarded_for(&mut headers, client.ip());
        }

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers,
            body,
            trailers,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Build a fresh outbound request aimed at `target`.
    pub fn build_for(&self, target: &Url) -> Result<Request<Body>, http::Error> {
        let uri = rewrite_uri(target, &self.uri)?;

        let body = match &self.trailers {
            None => Body::from(self.body.clone()),
            Some(trailers) => {
                let frames = [Frame::data(self.body.clone()), Frame::trailers(trailers.clone())];
                let stream = futures_util::stream::iter(frames.into_iter().map(Ok::<_, Infallible>));
                Body::new(StreamBody::new(stream))
            }
        };

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(body)?;
        *request.headers_mut() = self.headers.clone();

        // hyper only emits trailer fields that `Trailer` declares
        if let Some(trailers) = &self.trailers {
            let declared = trailers.keys().map(HeaderName::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&declared) {
                request.headers_mut().insert(header::TRAILER, value);
            }
        }
        Ok(request)
    }
}

/// Point `inbound` at `target`: scheme and authority from the target, paths
/// joined with a single slash, query strings concatenated.
pub fn rewrite_uri(target: &Url, inbound: &Uri) -> Result<Uri, http::Error> {
    let host = target.host_str().unwrap_or_default();
    let authority = match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let path = join_paths(target.path(), inbound.path());
    let query = match (target.query().unwrap_or(""), inbound.query().unwrap_or("")) {
        ("", q) | (q, "") => q.to_string(),
        (base, extra) => format!("{}&{}", base, extra),
    };
    let path_and_query = if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    };

    Uri::builder()
        .scheme(target.scheme())
        .authority(authority.as_str())
        .path_and_query(path_and_query)
        .build()
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
