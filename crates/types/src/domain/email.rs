// Path: crates/types/src/domain/email.rs
//! `EmailJob` and `ReminderLog` (spec §3, §4.7 — owned exclusively by the
//! email queue, C7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queued email (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

/// A unit of durable, priority-ordered outbound mail work.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailJob {
    pub id: i64,
    pub to_addrs: Vec<String>,
    pub cc_addrs: Vec<String>,
    pub bcc_addrs: Vec<String>,
    pub subject: String,
    pub template: String,
    pub locale: String,
    /// Structured payload substituted into the template.
    pub data: serde_json::Value,
    pub headers: Option<serde_json::Value>,
    pub status: EmailStatus,
    /// Higher sorts first in the dispatcher's claim query.
    pub priority: i32,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub error_details: Option<serde_json::Value>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_by: Option<String>,
}

/// Caller-supplied fields for `enqueue` (§4.7).
#[derive(Debug, Clone)]
pub struct NewEmailJob {
    pub to_addrs: Vec<String>,
    pub cc_addrs: Vec<String>,
    pub bcc_addrs: Vec<String>,
    pub subject: String,
    pub template: String,
    pub locale: String,
    pub data: serde_json::Value,
    pub headers: Option<serde_json::Value>,
    pub priority: i32,
    pub max_retries: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_by: Option<String>,
}

impl Default for NewEmailJob {
    fn default() -> Self {
        Self {
            to_addrs: Vec::new(),
            cc_addrs: Vec::new(),
            bcc_addrs: Vec::new(),
            subject: String::new(),
            template: String::new(),
            locale: "en".to_string(),
            data: serde_json::Value::Null,
            headers: None,
            priority: 0,
            max_retries: 3,
            scheduled_for: None,
            reference_type: None,
            reference_id: None,
            created_by: None,
        }
    }
}

/// Outcome of a reminder delivery attempt (§4.7 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ReminderStatus {
    Sent,
    Failed,
    Bounced,
}

/// Immutable audit record of a delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReminderLog {
    pub id: i64,
    pub doc_id: String,
    pub recipient_email: String,
    pub sent_at: DateTime<Utc>,
    pub sent_by: Option<String>,
    pub template_used: String,
    pub status: ReminderStatus,
    pub error_message: Option<String>,
}
