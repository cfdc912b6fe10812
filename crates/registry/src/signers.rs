// Path: crates/registry/src/signers.rs
//! The expected-signer registry and completion statistics (C6, spec §4.6).

use ackify_ledger::LedgerStore;
use ackify_types::domain::document::{CompletionStats, ExpectedSigner, NewExpectedSigner};
use ackify_types::error::CoreError;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;

#[async_trait]
pub trait SignerRegistry: Send + Sync {
    /// `add(doc_id, email, name?, notes?, added_by)` — unique on
    /// `(doc_id, email)`; re-adding an existing pair is an update, not an
    /// error, matching the registry's "pre-declared list" framing rather
    /// than the ledger's strict uniqueness invariant.
    async fn add(
        &self,
        doc_id: &str,
        new: NewExpectedSigner,
        added_by: &str,
    ) -> Result<ExpectedSigner, CoreError>;

    async fn remove(&self, doc_id: &str, email: &str) -> Result<(), CoreError>;

    async fn list(&self, doc_id: &str) -> Result<Vec<ExpectedSigner>, CoreError>;

    /// `completion_stats(doc_id)` — spec §4.6: joins the registry with the
    /// ledger on `(doc_id, lowercased user_email)`.
    async fn completion_stats(&self, doc_id: &str) -> Result<CompletionStats, CoreError>;
}

pub struct PgSignerRegistry {
    pool: PgPool,
    ledger: Arc<dyn LedgerStore>,
}

impl PgSignerRegistry {
    pub fn new(pool: PgPool, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { pool, ledger }
    }
}

#[async_trait]
impl SignerRegistry for PgSignerRegistry {
    async fn add(
        &self,
        doc_id: &str,
        new: NewExpectedSigner,
        added_by: &str,
    ) -> Result<ExpectedSigner, CoreError> {
        let email = new.email.to_ascii_lowercase();
        let signer = sqlx::query_as::<_, ExpectedSigner>(
            "INSERT INTO expected_signers (doc_id, email, name, added_by, notes) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (doc_id, email) DO UPDATE SET \
               name = EXCLUDED.name, notes = EXCLUDED.notes, added_by = EXCLUDED.added_by \
             RETURNING doc_id, email, name, added_at, added_by, notes",
        )
        .bind(doc_id)
        .bind(&email)
        .bind(&new.name)
        .bind(added_by)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(signer)
    }

    async fn remove(&self, doc_id: &str, email: &str) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM expected_signers WHERE doc_id = $1 AND email = $2")
            .bind(doc_id)
            .bind(email.to_ascii_lowercase())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, doc_id: &str) -> Result<Vec<ExpectedSigner>, CoreError> {
        let rows = sqlx::query_as::<_, ExpectedSigner>(
            "SELECT doc_id, email, name, added_at, added_by, notes \
             FROM expected_signers WHERE doc_id = $1 ORDER BY added_at ASC",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn completion_stats(&self, doc_id: &str) -> Result<CompletionStats, CoreError> {
        let expected_signers = self.list(doc_id).await?;
        let attestations = self.ledger.list_for_doc(doc_id).await?;

        let signed_emails: HashSet<String> = attestations
            .into_iter()
            .map(|a| a.user_email.to_ascii_lowercase())
            .collect();

        let expected = expected_signers.len() as i64;
        let signed = expected_signers
            .iter()
            .filter(|s| signed_emails.contains(&s.email.to_ascii_lowercase()))
            .count() as i64;

        Ok(CompletionStats::compute(expected, signed))
    }
}
