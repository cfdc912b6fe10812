// Path: crates/http-api/src/handlers/users.rs
//! `GET /users/me` (spec §6).

use crate::error::ok;
use crate::session::CurrentUser;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

/// `can_create_documents` is reserved for future use (SPEC_FULL.md §C
/// "Admin capability surface"): document creation is out of scope for this
/// core (spec §1), so it is always `false` for non-admins and mirrors
/// `is_admin` for admins.
pub async fn me(State(state): State<AppState>, CurrentUser(identity): CurrentUser) -> Json<Value> {
    let is_admin = state.is_admin(&identity.email);
    ok(serde_json::json!({
        "sub": identity.sub,
        "email": identity.email,
        "name": identity.name,
        "is_admin": is_admin,
        "can_create_documents": is_admin,
    }))
}
