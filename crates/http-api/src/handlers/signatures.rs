// Path: crates/http-api/src/handlers/signatures.rs
//! `POST /signatures` and `GET /signatures` (spec §6): the core
//! proof-of-read action and the caller's own attestation history.

use crate::error::{ok, ApiError};
use crate::session::CurrentUser;
use crate::state::AppState;
use ackify_types::error::CoreError;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CreateSignatureRequest {
    pub doc_id: String,
}

/// `POST /signatures`. Fails `VALIDATION_ERROR` on a blank `doc_id`,
/// `NOT_FOUND` if it names no document, `ALREADY_SIGNED` if this user has
/// already signed (spec §4.3, I1).
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    headers: HeaderMap,
    Json(body): Json<CreateSignatureRequest>,
) -> Result<Json<Value>, ApiError> {
    let doc_id = body.doc_id.trim();
    if doc_id.is_empty() {
        return Err(CoreError::Validation("doc_id is required".into()).into());
    }
    // Surfaces NOT_FOUND before the engine does any chain work, so an
    // unknown doc_id never burns a retry budget on CHAIN_CONFLICT.
    state.documents.get(doc_id).await?;

    let referer = headers
        .get(axum::http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let attestation = state.signing_engine.create(doc_id, &identity, referer).await?;
    Ok(ok(attestation))
}

/// `GET /signatures`: every attestation made by the current user, newest
/// first, each paired with whether its document has since been
/// soft-deleted (SPEC_FULL.md §C).
pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let rows = state.ledger.list_for_user(&identity.sub).await?;
    let items: Vec<Value> = rows
        .into_iter()
        .map(|(attestation, doc_deleted_at)| {
            serde_json::json!({
                "attestation": attestation,
                "doc_deleted": doc_deleted_at.is_some(),
            })
        })
        .collect();
    Ok(ok(items))
}
