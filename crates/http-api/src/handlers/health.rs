// Path: crates/http-api/src/handlers/health.rs
//! `GET /health` (spec §6): a liveness probe that also reports whether the
//! backing store is reachable. Distinct from `ackify-telemetry`'s
//! `/healthz`/`/metrics` mini-surface, which is an ambient operator-facing
//! endpoint on its own port, not part of the versioned API contract.

use crate::error::ok;
use crate::state::AppState;
use axum::extract::State;
use serde_json::Value;

pub async fn health(State(state): State<AppState>) -> axum::Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(target: "http-api", error = %e, "health check database probe failed");
            "unreachable"
        }
    };
    ok(serde_json::json!({
        "status": "ok",
        "database": database,
    }))
}
