// Path: crates/http-api/src/request_id.rs
//! Per-request correlation id (SPEC_FULL.md §C "Correlation id
//! propagation"): every response carries `X-Request-Id`, and every error
//! body's `details.request_id` matches it.

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use rand::RngCore;

pub const HEADER_NAME: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Stamps every response with `X-Request-Id` and, for an error envelope
/// produced by [`crate::error::ApiError`] (which is built before a request
/// id exists), backfills `details.request_id` to match — so handlers never
/// need to thread the id through themselves.
pub async fn middleware(mut req: Request<Body>, next: Next) -> Response {
    let id = new_request_id();
    req.extensions_mut().insert(RequestId(id.clone()));

    let response = next.run(req).await;
    let response = backfill_request_id(response, &id).await;
    response
}

async fn backfill_request_id(response: Response, id: &str) -> Response {
    let (mut parts, body) = response.into_parts();
    if !parts.status.is_client_error() && !parts.status.is_server_error() {
        let mut response = Response::from_parts(parts, body);
        if let Ok(value) = HeaderValue::from_str(id) {
            response.headers_mut().insert(HEADER_NAME, value);
        }
        return response;
    }

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let mut response = Response::from_parts(parts, Body::empty());
            if let Ok(value) = HeaderValue::from_str(id) {
                response.headers_mut().insert(HEADER_NAME, value);
            }
            return response;
        }
    };

    let patched = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|mut value| {
            value
                .get_mut("error")?
                .get_mut("details")?
                .as_object_mut()?
                .insert("request_id".to_string(), serde_json::Value::String(id.to_string()));
            serde_json::to_vec(&value).ok()
        });

    let body = Body::from(patched.unwrap_or_else(|| bytes.to_vec()));
    if let Ok(value) = HeaderValue::from_str(id) {
        parts.headers.insert(HEADER_NAME, value);
    }
    Response::from_parts(parts, body)
}

fn new_request_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
