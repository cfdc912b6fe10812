// Path: crates/ledger/src/store.rs
//! The ledger store (C2, spec §4.2): a thin, transactional facade over the
//! `attestations` table. I1-I4 are enforced at the schema level (unique
//! constraint, an immutable-`created_at` trigger); this module adds the
//! chain-conflict detection that the schema alone cannot express, since
//! "the tail I read is still the tail" is a read-then-write invariant, not
//! a row constraint.

use ackify_types::domain::attestation::{Attestation, NewAttestation, GENESIS};
use ackify_types::error::CoreError;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Public operations over the per-document hash chain (spec §4.2).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// The most recent attestation for `doc_id`, or `None` if the chain is
    /// empty. Read under the same transaction as the subsequent append by
    /// callers that need `get_tail ∘ append` atomicity — see
    /// [`LedgerStore::append`], which re-reads the tail itself under lock.
    async fn get_tail(&self, doc_id: &str) -> Result<Option<Attestation>, CoreError>;

    /// Inserts `candidate` atomically. `candidate.prev_hash` must equal the
    /// tail's `payload_hash` (or [`GENESIS`] for an empty chain) as observed
    /// under an advisory lock keyed on `doc_id`; a mismatch — another
    /// appender raced between the caller's `get_tail` and this call —
    /// yields [`CoreError::ChainConflict`]. A unique-constraint collision on
    /// `(doc_id, user_sub)` yields [`CoreError::AlreadySigned`].
    async fn append(&self, candidate: NewAttestation) -> Result<Attestation, CoreError>;

    /// All attestations for `doc_id`, ordered by `id` ascending.
    async fn list_for_doc(&self, doc_id: &str) -> Result<Vec<Attestation>, CoreError>;

    /// All attestations for `user_sub`, ordered by `signed_at` descending,
    /// each paired with its document's `deleted_at` (SPEC_FULL.md §C).
    async fn list_for_user(
        &self,
        user_sub: &str,
    ) -> Result<Vec<(Attestation, Option<chrono::DateTime<chrono::Utc>>)>, CoreError>;

    /// The attestation for `(doc_id, user_sub)`, if it exists.
    async fn get_by_doc_and_user(
        &self,
        doc_id: &str,
        user_sub: &str,
    ) -> Result<Option<Attestation>, CoreError>;
}

/// Postgres-backed [`LedgerStore`].
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_tail(&self, doc_id: &str) -> Result<Option<Attestation>, CoreError> {
        let tail = sqlx::query_as::<_, Attestation>(
            "SELECT id, doc_id, user_sub, user_email, user_name, signed_at, payload_hash, \
             signature, nonce, prev_hash, referer, created_at \
             FROM attestations WHERE doc_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tail)
    }

    async fn append(&self, candidate: NewAttestation) -> Result<Attestation, CoreError> {
        let mut tx = self.pool.begin().await?;

        // Advisory lock scoped to this transaction: serializes
        // `get_tail ∘ append` per doc_id without requiring the backing
        // store to offer true SERIALIZABLE isolation (spec §4.2, §5).
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&candidate.doc_id)
            .execute(&mut *tx)
            .await?;

        let observed_tail_hash = sqlx::query(
            "SELECT payload_hash FROM attestations WHERE doc_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(&candidate.doc_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| row.get::<String, _>("payload_hash"))
        .unwrap_or_else(|| GENESIS.to_string());

        if observed_tail_hash != candidate.prev_hash {
            tx.rollback().await?;
            return Err(CoreError::ChainConflict);
        }

        let inserted = sqlx::query_as::<_, Attestation>(
            "INSERT INTO attestations \
             (doc_id, user_sub, user_email, user_name, signed_at, payload_hash, signature, \
              nonce, prev_hash, referer) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (doc_id, user_sub) DO NOTHING \
             RETURNING id, doc_id, user_sub, user_email, user_name, signed_at, payload_hash, \
                       signature, nonce, prev_hash, referer, created_at",
        )
        .bind(&candidate.doc_id)
        .bind(&candidate.user_sub)
        .bind(&candidate.user_email)
        .bind(&candidate.user_name)
        .bind(candidate.signed_at)
        .bind(&candidate.payload_hash)
        .bind(&candidate.signature)
        .bind(&candidate.nonce)
        .bind(&candidate.prev_hash)
        .bind(&candidate.referer)
        .fetch_optional(&mut *tx)
        .await?;

        match inserted {
            Some(attestation) => {
                tx.commit().await?;
                Ok(attestation)
            }
            None => {
                tx.rollback().await?;
                Err(CoreError::AlreadySigned)
            }
        }
    }

    async fn list_for_doc(&self, doc_id: &str) -> Result<Vec<Attestation>, CoreError> {
        let rows = sqlx::query_as::<_, Attestation>(
            "SELECT id, doc_id, user_sub, user_email, user_name, signed_at, payload_hash, \
             signature, nonce, prev_hash, referer, created_at \
             FROM attestations WHERE doc_id = $1 ORDER BY id ASC",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_user(
        &self,
        user_sub: &str,
    ) -> Result<Vec<(Attestation, Option<chrono::DateTime<chrono::Utc>>)>, CoreError> {
        let rows = sqlx::query(
            "SELECT a.id, a.doc_id, a.user_sub, a.user_email, a.user_name, a.signed_at, \
             a.payload_hash, a.signature, a.nonce, a.prev_hash, a.referer, a.created_at, \
             d.deleted_at AS doc_deleted_at \
             FROM attestations a LEFT JOIN documents d ON d.doc_id = a.doc_id \
             WHERE a.user_sub = $1 ORDER BY a.signed_at DESC",
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let attestation = Attestation {
                    id: row.try_get("id")?,
                    doc_id: row.try_get("doc_id")?,
                    user_sub: row.try_get("user_sub")?,
                    user_email: row.try_get("user_email")?,
                    user_name: row.try_get("user_name")?,
                    signed_at: row.try_get("signed_at")?,
                    payload_hash: row.try_get("payload_hash")?,
                    signature: row.try_get("signature")?,
                    nonce: row.try_get("nonce")?,
                    prev_hash: row.try_get("prev_hash")?,
                    referer: row.try_get("referer")?,
                    created_at: row.try_get("created_at")?,
                };
                let doc_deleted_at = row.try_get("doc_deleted_at")?;
                Ok((attestation, doc_deleted_at))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(CoreError::from)
    }

    async fn get_by_doc_and_user(
        &self,
        doc_id: &str,
        user_sub: &str,
    ) -> Result<Option<Attestation>, CoreError> {
        let row = sqlx::query_as::<_, Attestation>(
            "SELECT id, doc_id, user_sub, user_email, user_name, signed_at, payload_hash, \
             signature, nonce, prev_hash, referer, created_at \
             FROM attestations WHERE doc_id = $1 AND user_sub = $2",
        )
        .bind(doc_id)
        .bind(user_sub)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
