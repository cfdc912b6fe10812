// Path: crates/http-api/src/handlers/documents.rs
//! `GET /documents/{doc_id}`, `/signatures`, and `/expected-signers` (spec
//! §6). Document metadata is visible to any caller so the `next` URL of an
//! unauthenticated login flow can still render "what you're about to
//! sign"; the attestation list and expected-signer roster carry personal
//! data and are access-controlled per §7.

use crate::error::{ok, ApiError};
use crate::session::{AdminUser, CurrentUser, MaybeUser};
use crate::state::AppState;
use ackify_types::error::CoreError;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

/// `GET /documents/{doc_id}`. Soft-deleted documents resolve to
/// `NOT_FOUND` for everyone except admins, who see a `deleted` flag
/// instead (SPEC_FULL.md §C "Soft-delete propagation").
pub async fn get_document(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let is_admin = caller
        .map(|identity| state.is_admin(&identity.email))
        .unwrap_or(false);

    let view = if is_admin {
        state.documents.get_including_deleted(&doc_id).await?
    } else {
        state.documents.get(&doc_id).await?
    };

    Ok(ok(serde_json::json!({
        "doc_id": view.document.doc_id,
        "title": view.document.title,
        "url": view.document.url,
        "checksum": view.document.checksum,
        "checksum_algorithm": view.document.checksum_algorithm,
        "description": view.document.description,
        "created_at": view.document.created_at,
        "updated_at": view.document.updated_at,
        "created_by": view.document.created_by,
        "deleted": view.document.deleted_at.is_some(),
        "signature_count": view.signature_count,
    })))
}

/// `GET /documents/{doc_id}/signatures`: the full attestation list for a
/// document, carrying signer email/name. Requires an authenticated caller
/// (spec §6 "access-controlled per §7").
pub async fn list_signatures(
    State(state): State<AppState>,
    CurrentUser(_identity): CurrentUser,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.documents.get(&doc_id).await.map_err(|e| match e {
        CoreError::NotFound(_) => CoreError::NotFound(format!("document {doc_id}")),
        other => other,
    })?;
    let attestations = state.ledger.list_for_doc(&doc_id).await?;
    Ok(ok(attestations))
}

/// `GET /documents/{doc_id}/expected-signers`: the pre-declared roster of
/// readers an administrator is tracking, including those who have not yet
/// signed. Admin-only — unlike the signature list, this exposes emails
/// that never consented to appearing in a completed ledger.
pub async fn list_expected_signers(
    State(state): State<AppState>,
    AdminUser(_identity): AdminUser,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let signers = state.signers.list(&doc_id).await?;
    let stats = state.signers.completion_stats(&doc_id).await?;
    Ok(ok(serde_json::json!({
        "signers": signers,
        "stats": stats,
    })))
}
