// Path: crates/types/src/domain/session.rs
//! `Session` and `MagicLink` (spec §3, owned by C5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-side session record keyed by an opaque cookie value (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub session_id: String,
    pub user_sub: String,
    pub user_email: String,
    pub user_name: Option<String>,
    /// AEAD ciphertext of the issuer's long-lived refresh token, or `None`
    /// for magic-link sessions which have no upstream credential.
    pub refresh_token_encrypted: Option<Vec<u8>>,
    /// The 96-bit AEAD nonce paired 1:1 with `refresh_token_encrypted`.
    pub refresh_token_nonce: Option<Vec<u8>>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// The identity resolved from a validated session cookie + server-side
/// record (§4.5 "Resolving the user from a request").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
}

/// A one-time email-delivered login token (§4.4.2). The raw token is never
/// persisted; only `token_hash` is.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MagicLink {
    pub token_hash: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
