// Path: crates/types/src/domain/attestation.rs
//! The `Attestation`: the unit of the ledger (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The sentinel `prev_hash` carried by the first attestation of a chain.
pub const GENESIS: &str = "GENESIS";

/// A single signed, ledger-persisted record that a user acknowledged a
/// document. Created by the signing engine (C3), never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attestation {
    /// Monotonically assigned sequence number, storage-assigned.
    pub id: i64,
    pub doc_id: String,
    /// Stable subject identifier issued by the identity provider.
    pub user_sub: String,
    pub user_email: String,
    pub user_name: Option<String>,
    /// Instant the attestation was accepted, truncated to millisecond
    /// precision per the canonical payload's RFC-3339 formatting (§4.1).
    pub signed_at: DateTime<Utc>,
    /// Hex digest (SHA-256) of the canonical payload string.
    pub payload_hash: String,
    /// Base64 of the Ed25519 signature over the canonical payload bytes.
    pub signature: String,
    /// Lowercase hex of 16 random bytes, unique per attestation.
    pub nonce: String,
    /// Hex digest of the predecessor's `payload_hash`, or [`GENESIS`].
    pub prev_hash: String,
    pub referer: Option<String>,
    /// Storage-assigned wall clock; immutable after INSERT (I2).
    pub created_at: DateTime<Utc>,
}

/// The fields needed to compute and append a new attestation, before the
/// storage layer assigns `id`/`created_at`.
#[derive(Debug, Clone)]
pub struct NewAttestation {
    pub doc_id: String,
    pub user_sub: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub signed_at: DateTime<Utc>,
    pub payload_hash: String,
    pub signature: String,
    pub nonce: String,
    pub prev_hash: String,
    pub referer: Option<String>,
}

/// Result of `GET /signatures?doc_id=` (§4.3 "Status query").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignStatus {
    pub is_signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
}

/// An `Attestation` joined with the soft-delete state of its document, per
/// SPEC_FULL.md §C's resolution of the `list_for_user` open question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationWithDocState {
    #[serde(flatten)]
    pub attestation: Attestation,
    pub doc_deleted_at: Option<DateTime<Utc>>,
}

/// Outcome of the offline chain-integrity verifier (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainVerification {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<String>,
}
