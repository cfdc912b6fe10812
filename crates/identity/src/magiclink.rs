// Path: crates/identity/src/magiclink.rs
//! Passwordless single-use email login (C4.4.2, spec §4.4.2).

use ackify_types::domain::session::MagicLink;
use ackify_types::error::CoreError;
use chrono::{Duration as ChronoDuration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

/// Token lifetime (spec §3 "expires_at = issued_at + 15 minutes").
const TOKEN_TTL: ChronoDuration = ChronoDuration::minutes(15);

/// Returned to the caller after a successful consumption (step 2).
pub struct MagicLinkIdentity {
    pub sub: String,
    pub email: String,
}

#[derive(Clone)]
pub struct MagicLinkProvider {
    pool: PgPool,
}

impl MagicLinkProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Request phase (spec §4.4.2 step 1): issues a fresh 256-bit token,
    /// persists its hash, and returns the raw token for the caller to embed
    /// in an enqueued email's callback URL. The caller MUST NOT persist or
    /// log the raw token.
    pub async fn request(&self, email: &str) -> Result<String, CoreError> {
        let raw_token = random_token_hex();
        let token_hash = sha256_hex(&raw_token);
        let expires_at = Utc::now() + TOKEN_TTL;

        sqlx::query(
            "INSERT INTO magic_links (token_hash, email, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&token_hash)
        .bind(email.to_ascii_lowercase())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(raw_token)
    }

    /// Consumption phase (spec §4.4.2 step 2): hashes the presented token,
    /// atomically marks it consumed, and derives `sub = "magic:" ||
    /// lowercase(email)`. Rejects with [`CoreError::InvalidState`] if the
    /// token is unknown, expired, or already consumed — mirroring (P9)'s
    /// "second redemption yields INVALID_STATE".
    pub async fn consume(&self, raw_token: &str) -> Result<MagicLinkIdentity, CoreError> {
        let token_hash = sha256_hex(raw_token);

        let consumed = sqlx::query_as::<_, MagicLink>(
            "UPDATE magic_links SET consumed_at = now() \
             WHERE token_hash = $1 AND consumed_at IS NULL AND expires_at > now() \
             RETURNING token_hash, email, expires_at, consumed_at, created_at",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CoreError::InvalidState)?;

        Ok(MagicLinkIdentity {
            sub: format!("magic:{}", consumed.email.to_ascii_lowercase()),
            email: consumed.email,
        })
    }

    /// Deletes rows past their expiry, run by the background cleaner task
    /// (spec §9). Returns the number of rows removed.
    pub async fn cleanup_expired(&self) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM magic_links WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn random_token_hex() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn sha256_hex(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_deterministic_and_distinct_per_input() {
        assert_eq!(sha256_hex("abc"), sha256_hex("abc"));
        assert_ne!(sha256_hex("abc"), sha256_hex("abd"));
    }

    #[test]
    fn random_token_is_high_entropy_hex() {
        let a = random_token_hex();
        let b = random_token_hex();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
