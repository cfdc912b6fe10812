// Path: crates/http-api/src/handlers/admin.rs
//! `/admin/documents/{doc_id}/*` (spec §6): the expected-signer roster and
//! reminder dispatch. Every route here requires [`AdminUser`].

use crate::error::{ok, ApiError};
use crate::session::AdminUser;
use crate::state::AppState;
use ackify_types::domain::email::NewEmailJob;
use ackify_types::domain::document::NewExpectedSigner;
use ackify_types::error::CoreError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct AddSignerRequest {
    pub email: String,
    pub name: Option<String>,
    pub notes: Option<String>,
}

fn valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.contains('@') && !email.starts_with('@') && !email.ends_with('@')
}

/// `POST /admin/documents/{doc_id}/signers`.
pub async fn add_signer(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(doc_id): Path<String>,
    Json(body): Json<AddSignerRequest>,
) -> Result<Json<Value>, ApiError> {
    if !valid_email(&body.email) {
        return Err(CoreError::Validation("email is not well-formed".into()).into());
    }
    state.documents.get_including_deleted(&doc_id).await?;

    let signer = state
        .signers
        .add(
            &doc_id,
            NewExpectedSigner {
                email: body.email,
                name: body.name,
                notes: body.notes,
            },
            &admin.email,
        )
        .await?;
    Ok(ok(signer))
}

/// `DELETE /admin/documents/{doc_id}/signers/{email}`.
pub async fn remove_signer(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path((doc_id, email)): Path<(String, String)>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.signers.remove(&doc_id, &email).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    /// Explicit recipient list; when absent, every expected signer who
    /// hasn't yet signed is reminded (SPEC_FULL.md §C "Reminder fan-out
    /// default").
    pub emails: Option<Vec<String>>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en".to_string()
}

/// `POST /admin/documents/{doc_id}/reminders`: enqueues one `reminder`
/// template job per recipient and returns the number enqueued. Requires
/// SMTP to be configured (§6); otherwise fails `TRANSIENT`.
pub async fn send_reminders(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(doc_id): Path<String>,
    Json(body): Json<ReminderRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(queue) = state.email_queue.as_ref() else {
        return Err(CoreError::Transient("email dispatch is not configured".into()).into());
    };

    let document = state.documents.get_including_deleted(&doc_id).await?;

    let recipients = match body.emails {
        Some(emails) => emails,
        None => {
            let signers = state.signers.list(&doc_id).await?;
            let attestations = state.ledger.list_for_doc(&doc_id).await?;
            let signed: std::collections::HashSet<String> = attestations
                .into_iter()
                .map(|a| a.user_email.to_ascii_lowercase())
                .collect();
            signers
                .into_iter()
                .filter(|s| !signed.contains(&s.email.to_ascii_lowercase()))
                .map(|s| s.email)
                .collect()
        }
    };

    let mut enqueued = 0u32;
    for email in recipients {
        if !valid_email(&email) {
            continue;
        }
        let job = NewEmailJob {
            to_addrs: vec![email],
            subject: format!("Reminder: please review {}", document.document.title),
            template: "reminder".to_string(),
            locale: body.locale.clone(),
            data: serde_json::json!({
                "doc_id": doc_id,
                "title": document.document.title,
                "url": document.document.url,
            }),
            reference_type: Some("reminder".to_string()),
            reference_id: Some(doc_id.clone()),
            created_by: Some(admin.email.clone()),
            ..Default::default()
        };
        queue.enqueue(job).await?;
        enqueued += 1;
    }

    Ok(ok(serde_json::json!({ "enqueued": enqueued })))
}
