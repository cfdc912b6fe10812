// Path: crates/http-api/src/ratelimit.rs
//! Per-surface rate limiting (spec §4.4.3, §6), grounded on the teacher's
//! `IpLimiter` pattern but generalized via `ackify_identity::TokenBucketLimiter`
//! to also key on email for the magic-link surface.

use crate::error::ApiError;
use crate::state::AppState;
use ackify_types::error::CoreError;
use axum::body::Body;
use axum::extract::{ConnectInfo, FromRef, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Auth,
    General,
    Document,
}

/// The state baked into each `middleware::from_fn_with_state(...)` call
/// below: the shared `AppState` plus which surface's bucket to draw from.
/// Axum has no blanket `FromRef` for tuples, so this struct (and its
/// `FromRef<RateLimitState> for AppState` impl) is the substate carrier
/// instead — one per route group, cloned cheaply per request.
#[derive(Clone)]
pub struct RateLimitState {
    pub app: AppState,
    pub surface: Surface,
}

impl FromRef<RateLimitState> for AppState {
    fn from_ref(input: &RateLimitState) -> Self {
        input.app.clone()
    }
}

fn client_ip(req: &Request<Body>) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip())
        .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]))
}

/// Builds a `middleware::from_fn_with_state`-compatible closure for one of
/// the IP-keyed surfaces. Magic-link has its own dual email+IP check
/// wired directly in its handler, since the limiter key there depends on
/// the request body (the target email), not just the connection.
pub async fn limit(State(limiter_state): State<RateLimitState>, req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let RateLimitState { app, surface } = limiter_state;
    let ip = client_ip(&req);
    let allowed = match surface {
        Surface::Auth => app.rate_limiters.auth_ip.allow(ip),
        Surface::General => app.rate_limiters.general_ip.allow(ip),
        Surface::Document => app.rate_limiters.document_ip.allow(ip),
    };

    if allowed {
        Ok(next.run(req).await)
    } else {
        ackify_telemetry::http_metrics().inc_rate_limited(surface_label(surface));
        Err(ApiError::from(CoreError::RateLimited))
    }
}

fn surface_label(surface: Surface) -> &'static str {
    match surface {
        Surface::Auth => "auth",
        Surface::General => "general",
        Surface::Document => "document",
    }
}
