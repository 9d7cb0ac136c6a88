//! Responses synthesized by the proxy itself.
//!
//! Backend responses pass through untouched; the proxy only produces its own
//! response when no backend could answer (503) or the inbound body could not
//! be buffered.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::request::BodyError;
use crate::proxy::dispatcher::DispatchError;

pub const UNAVAILABLE_BODY: &str = "Service not available";

pub fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_BODY).into_response()
}

pub fn from_dispatch_error(err: &DispatchError) -> Response {
    match err {
        DispatchError::PoolExhausted | DispatchError::AttemptsExhausted { .. } => service_unavailable(),
        other => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{}: {}", UNAVAILABLE_BODY, other),
        )
            .into_response(),
    }
}

pub fn from_body_error(err: &BodyError) -> Response {
    let status = match err {
        BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        BodyError::Read(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::timeouts::Interrupted;
    use axum::http::header;
    use http_body_util::BodyExt;

    async fn text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_pool_exhausted_is_plain_503() {
        let response = from_dispatch_error(&DispatchError::PoolExhausted);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
        assert_eq!(text(response).await, "Service not available");
    }

    #[tokio::test]
    async fn test_deadline_is_503_with_reason() {
        let response = from_dispatch_error(&DispatchError::Interrupted(Interrupted::DeadlineExceeded));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(text(response).await, "Service not available: request deadline exceeded");
    }

    #[test]
    fn test_body_errors() {
        let response = from_body_error(&BodyError::TooLarge { limit: 10 });
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
