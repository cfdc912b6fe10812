// Path: crates/http-api/src/lib.rs
//! The `/api/v1` HTTP boundary (spec §6): thin routing over the components
//! in `ackify-ledger`, `ackify-identity`, `ackify-registry`, and
//! `ackify-mailer`. Grounded on the teacher's `http-rpc-gateway` router —
//! same `ServiceBuilder` layering, same per-surface middleware composition
//! via `middleware::from_fn_with_state` closures baked with their own
//! state, `.merge()`d under a shared `Router<AppState>`.

pub mod error;
pub mod handlers;
pub mod ratelimit;
pub mod request_id;
pub mod session;
pub mod state;

use axum::error_handling::HandleErrorLayer;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{BoxError, Router};
use ratelimit::{RateLimitState, Surface};
use state::AppState;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Converts a `TimeoutLayer` rejection into the same error envelope as
/// every other failure (spec §7 `TRANSIENT` → 503), grounded on the
/// teacher's `HandleErrorLayer` composition.
async fn handle_timeout(err: BoxError) -> Response {
    let code = if err.is::<tower::timeout::error::Elapsed>() {
        ackify_types::error::CoreError::Transient("request timed out".into())
    } else {
        ackify_types::error::CoreError::Internal(anyhow::anyhow!(err))
    };
    error::ApiError::new(code).into_response()
}

/// Builds the full `/api/v1` router plus its `/health` liveness endpoint,
/// ready to be nested into a binary's top-level `Router` alongside
/// `ackify-telemetry`'s separate `/healthz`+`/metrics` server.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/start", post(handlers::auth::start))
        .route("/callback", get(handlers::auth::callback))
        .route("/magic-link/request", post(handlers::auth::magic_link_request))
        .route("/magic-link/verify", get(handlers::auth::magic_link_verify))
        .route("/logout", get(handlers::auth::logout))
        .route_layer(middleware::from_fn_with_state(RateLimitState { app: state.clone(), surface: Surface::Auth }, ratelimit::limit));

    let document_routes = Router::new()
        .route("/documents/:doc_id", get(handlers::documents::get_document))
        .route("/documents/:doc_id/signatures", get(handlers::documents::list_signatures))
        .route("/documents/:doc_id/expected-signers", get(handlers::documents::list_expected_signers))
        .route("/signatures", post(handlers::signatures::create).get(handlers::signatures::list_mine))
        .route_layer(middleware::from_fn_with_state(RateLimitState { app: state.clone(), surface: Surface::Document }, ratelimit::limit));

    let admin_routes = Router::new()
        .route("/documents/:doc_id/signers", post(handlers::admin::add_signer))
        .route("/documents/:doc_id/signers/:email", delete(handlers::admin::remove_signer))
        .route("/documents/:doc_id/reminders", post(handlers::admin::send_reminders));

    let general_routes = Router::new()
        .route("/users/me", get(handlers::users::me))
        .route_layer(middleware::from_fn_with_state(RateLimitState { app: state.clone(), surface: Surface::General }, ratelimit::limit));

    let api_v1 = Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(document_routes)
        .merge(general_routes)
        .route_layer(middleware::from_fn(session::csrf_middleware));

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id::middleware))
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CatchPanicLayer::new())
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}
