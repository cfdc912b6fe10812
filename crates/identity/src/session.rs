// Path: crates/identity/src/session.rs
//! Session lifecycle and credential storage (C5, spec §4.5).

use crate::aead::{AeadError, DerivedKey, COOKIE_CONTEXT, REFRESH_TOKEN_CONTEXT};
use ackify_types::domain::session::{Identity, Session};
use ackify_types::error::CoreError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine as _};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Rows whose `updated_at` is older than this are deleted by the reaper
/// (spec §3 "Session... Lifecycle").
pub const SESSION_MAX_AGE_DAYS: i64 = 37;
/// Rolling cookie lifetime (spec §4.5).
pub const COOKIE_LIFETIME_DAYS: i64 = 30;

/// Operations over the `sessions` table (spec §4.5).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(
        &self,
        user_sub: &str,
        user_email: &str,
        user_name: Option<&str>,
        refresh_token: Option<&str>,
        access_token_expires_at: Option<DateTime<Utc>>,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<Session, CoreError>;

    async fn get(&self, session_id: &str) -> Result<Option<Session>, CoreError>;

    async fn rotate(
        &self,
        session_id: &str,
        new_refresh_token: &str,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), CoreError>;

    async fn delete(&self, session_id: &str) -> Result<(), CoreError>;

    /// Deletes rows whose `updated_at` is older than [`SESSION_MAX_AGE_DAYS`];
    /// returns the number of rows deleted. Run every 6 hours by the
    /// background reaper task (spec §9 "Async / background tasks").
    async fn reap_expired(&self) -> Result<u64, CoreError>;

    /// Decrypts and returns the plaintext refresh token for `session`, or
    /// `None` if the session never stored one.
    fn decrypt_refresh_token(&self, session: &Session) -> Result<Option<String>, CoreError>;
}

pub struct PgSessionStore {
    pool: PgPool,
    refresh_token_key: DerivedKey,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, cookie_secret_b64: &str) -> Result<Self, CoreError> {
        let refresh_token_key = DerivedKey::derive(cookie_secret_b64, REFRESH_TOKEN_CONTEXT)
            .map_err(aead_err)?;
        Ok(Self {
            pool,
            refresh_token_key,
        })
    }

    fn encrypt_refresh_token(
        &self,
        user_sub: &str,
        refresh_token: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), CoreError> {
        let (ciphertext, nonce) = self
            .refresh_token_key
            .seal(refresh_token.as_bytes(), user_sub.as_bytes())
            .map_err(aead_err)?;
        Ok((ciphertext, nonce.to_vec()))
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(
        &self,
        user_sub: &str,
        user_email: &str,
        user_name: Option<&str>,
        refresh_token: Option<&str>,
        access_token_expires_at: Option<DateTime<Utc>>,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<Session, CoreError> {
        let session_id = new_opaque_id();
        let (ciphertext, nonce) = match refresh_token {
            Some(token) => {
                let (c, n) = self.encrypt_refresh_token(user_sub, token)?;
                (Some(c), Some(n))
            }
            None => (None, None),
        };

        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions \
             (session_id, user_sub, user_email, user_name, refresh_token_encrypted, \
              refresh_token_nonce, access_token_expires_at, user_agent, ip_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING session_id, user_sub, user_email, user_name, refresh_token_encrypted, \
                       refresh_token_nonce, access_token_expires_at, created_at, updated_at, \
                       last_refreshed_at, user_agent, ip_address",
        )
        .bind(&session_id)
        .bind(user_sub)
        .bind(user_email)
        .bind(user_name)
        .bind(&ciphertext)
        .bind(&nonce)
        .bind(access_token_expires_at)
        .bind(user_agent)
        .bind(ip_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, CoreError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT session_id, user_sub, user_email, user_name, refresh_token_encrypted, \
             refresh_token_nonce, access_token_expires_at, created_at, updated_at, \
             last_refreshed_at, user_agent, ip_address \
             FROM sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn rotate(
        &self,
        session_id: &str,
        new_refresh_token: &str,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        // Row-level lock per spec §5 "Locking discipline: Session rotation:
        // FOR UPDATE on the session row"; last-writer-wins on `updated_at`
        // for concurrent refreshes of the same session.
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query_as::<_, Session>(
            "SELECT session_id, user_sub, user_email, user_name, refresh_token_encrypted, \
             refresh_token_nonce, access_token_expires_at, created_at, updated_at, \
             last_refreshed_at, user_agent, ip_address \
             FROM sessions WHERE session_id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("session {session_id}")))?;

        let (ciphertext, nonce) = self.encrypt_refresh_token(&existing.user_sub, new_refresh_token)?;

        sqlx::query(
            "UPDATE sessions SET refresh_token_encrypted = $2, refresh_token_nonce = $3, \
             access_token_expires_at = $4, updated_at = now(), last_refreshed_at = now() \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(&ciphertext)
        .bind(&nonce)
        .bind(new_expiry)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reap_expired(&self) -> Result<u64, CoreError> {
        let cutoff = Utc::now() - ChronoDuration::days(SESSION_MAX_AGE_DAYS);
        let result = sqlx::query("DELETE FROM sessions WHERE updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn decrypt_refresh_token(&self, session: &Session) -> Result<Option<String>, CoreError> {
        let (ciphertext, nonce) = match (
            &session.refresh_token_encrypted,
            &session.refresh_token_nonce,
        ) {
            (Some(c), Some(n)) => (c, n),
            _ => return Ok(None),
        };
        let nonce: [u8; 12] = nonce
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::Internal(anyhow::anyhow!("stored nonce is not 12 bytes")))?;
        let plaintext = self
            .refresh_token_key
            .open(ciphertext, &nonce, session.user_sub.as_bytes())
            .map_err(aead_err)?;
        let token = String::from_utf8(plaintext.to_vec())
            .map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))?;
        Ok(Some(token))
    }
}

/// The payload sealed into the session cookie value: `session_id` plus the
/// identity captured at login, so resolving a request's user never needs a
/// database round trip beyond the server-side session lookup itself (spec
/// §4.5 "Resolving the user from a request").
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CookiePayload {
    session_id: String,
    identity: Identity,
    issued_at: DateTime<Utc>,
}

/// Encrypts `session_id` + `identity` into an opaque, URL-safe cookie
/// value.
pub fn encode_cookie(
    cookie_secret_b64: &str,
    session_id: &str,
    identity: &Identity,
) -> Result<String, CoreError> {
    let key = DerivedKey::derive(cookie_secret_b64, COOKIE_CONTEXT).map_err(aead_err)?;
    let payload = CookiePayload {
        session_id: session_id.to_string(),
        identity: identity.clone(),
        issued_at: Utc::now(),
    };
    let plaintext = serde_json::to_vec(&payload)
        .map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))?;
    let (ciphertext, nonce) = key.seal(&plaintext, b"").map_err(aead_err)?;
    let mut blob = Vec::with_capacity(nonce.len() + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64URL.encode(blob))
}

/// Decrypts a cookie value produced by [`encode_cookie`]. Returns `None`
/// (never an error) on any malformed or tampered input, or once the
/// rolling lifetime has elapsed — per spec §4.5, an absent or corrupt
/// cookie makes the request anonymous rather than erroring.
pub fn decode_cookie(cookie_secret_b64: &str, value: &str) -> Option<(String, Identity)> {
    let key = DerivedKey::derive(cookie_secret_b64, COOKIE_CONTEXT).ok()?;
    let blob = BASE64URL.decode(value).ok()?;
    if blob.len() < 12 {
        return None;
    }
    let (nonce_bytes, ciphertext) = blob.split_at(12);
    let nonce: [u8; 12] = nonce_bytes.try_into().ok()?;
    let plaintext = key.open(ciphertext, &nonce, b"").ok()?;
    let payload: CookiePayload = serde_json::from_slice(&plaintext).ok()?;
    if Utc::now() - payload.issued_at > ChronoDuration::days(COOKIE_LIFETIME_DAYS) {
        return None;
    }
    Some((payload.session_id, payload.identity))
}

fn aead_err(e: AeadError) -> CoreError {
    CoreError::Internal(anyhow::anyhow!(e))
}

fn new_opaque_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
