// Path: crates/types/src/domain/document.rs
//! `Document` metadata and the `ExpectedSigner` registry overlay (spec §3,
//! §4.6). Orthogonal to the ledger: referenced only by `doc_id`, never by
//! foreign key into attestations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The hash algorithm a document's `checksum` was computed with. The
/// checksum-verification table exists in the schema but is not wired to any
/// API in this core (spec §9's third Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha512,
    Md5,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Sha512 => write!(f, "SHA-512"),
            Self::Md5 => write!(f, "MD5"),
        }
    }
}

/// Document metadata, orthogonal to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub doc_id: String,
    pub title: String,
    pub url: Option<String>,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    /// Soft delete marker; non-null documents are hidden from non-admin
    /// reads (SPEC_FULL.md §C).
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A document's metadata plus its ledger signature count, as returned by
/// `GET /documents/{doc_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub signature_count: i64,
}

/// A pre-declared email an administrator wishes to track for completion of
/// a document.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExpectedSigner {
    pub doc_id: String,
    pub email: String,
    pub name: Option<String>,
    pub added_at: DateTime<Utc>,
    pub added_by: Option<String>,
    pub notes: Option<String>,
}

/// `(doc_id, email, name?, notes?)` payload for `add` (§4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpectedSigner {
    pub email: String,
    pub name: Option<String>,
    pub notes: Option<String>,
}

/// Completion statistics computed by joining the registry with the ledger
/// on `(doc_id, lowercased user_email)` (§4.6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CompletionStats {
    pub expected: i64,
    pub signed: i64,
    pub pending: i64,
    /// Percentage signed, 0.0-100.0; `0.0` when `expected == 0`.
    pub pct: f64,
}

impl CompletionStats {
    pub fn compute(expected: i64, signed: i64) -> Self {
        let pending = (expected - signed).max(0);
        let pct = if expected > 0 {
            (signed as f64 / expected as f64) * 100.0
        } else {
            0.0
        };
        Self {
            expected,
            signed,
            pending,
            pct,
        }
    }
}
