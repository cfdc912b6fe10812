// Path: crates/http-api/src/error.rs
//! Maps `CoreError` to the `{"error": {"code", "message", "details"}}`
//! envelope (spec §6, §7). Internal errors are structured-logged with a
//! correlation id and never leak detail to the client beyond that id
//! (SPEC_FULL.md §C "Correlation id propagation").

use ackify_types::error::{CoreError, ErrorCode};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Wraps a `CoreError` with the request's correlation id so `IntoResponse`
/// can echo it in `details.request_id` without threading extractors
/// through every handler's return type.
pub struct ApiError {
    pub error: CoreError,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(error: CoreError) -> Self {
        Self {
            error,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        Self::new(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error.code();
        let status = StatusCode::from_u16(self.error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        ackify_telemetry::error_metrics().inc_error(code);

        let message = match &self.error {
            // Internal detail never reaches the client; only the
            // correlation id does (spec §7 propagation policy).
            CoreError::Internal(e) => {
                tracing::error!(target: "http-api", request_id = ?self.request_id, error = ?e, "internal error");
                "internal error".to_string()
            }
            CoreError::Transient(msg) => {
                tracing::warn!(target: "http-api", request_id = ?self.request_id, error = %msg, "transient failure");
                "service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": code,
                "message": message,
                "details": { "request_id": self.request_id },
            }
        }));

        (status, body).into_response()
    }
}

/// Wraps a successful payload in the `{"data": ...}` envelope (spec §6).
pub fn ok<T: serde::Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "data": data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn internal_errors_never_leak_their_message() {
        let err = ApiError::new(CoreError::Internal(anyhow::anyhow!("pool exhausted, dsn=secret")))
            .with_request_id("req-1");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "INTERNAL");
        assert_eq!(json["error"]["message"], "internal error");
        assert_eq!(json["error"]["details"]["request_id"], "req-1");
    }

    #[tokio::test]
    async fn already_signed_maps_to_409_with_verbatim_message() {
        let response = ApiError::new(CoreError::AlreadySigned).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "ALREADY_SIGNED");
    }

    #[tokio::test]
    async fn rate_limited_maps_to_429() {
        let response = ApiError::new(CoreError::RateLimited).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
