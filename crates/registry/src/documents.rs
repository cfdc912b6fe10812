// Path: crates/registry/src/documents.rs
//! Document metadata (spec §3) and its soft-delete lifecycle.

use ackify_ledger::LedgerStore;
use ackify_types::domain::document::{Document, DocumentView};
use ackify_types::error::CoreError;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches `doc_id`'s metadata joined with its ledger signature count.
    /// Returns [`CoreError::NotFound`] for a missing OR soft-deleted
    /// document, per spec §7's `NOT_FOUND` covering both cases — callers
    /// needing the soft-deleted row regardless (e.g. an admin audit view)
    /// should use [`DocumentStore::get_including_deleted`].
    async fn get(&self, doc_id: &str) -> Result<DocumentView, CoreError>;

    /// As [`DocumentStore::get`], but does not filter out soft-deleted
    /// documents.
    async fn get_including_deleted(&self, doc_id: &str) -> Result<DocumentView, CoreError>;

    /// Marks `doc_id` soft-deleted. Idempotent.
    async fn soft_delete(&self, doc_id: &str, actor_sub: &str) -> Result<(), CoreError>;
}

pub struct PgDocumentStore {
    pool: PgPool,
    ledger: Arc<dyn LedgerStore>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { pool, ledger }
    }

    async fn fetch(&self, doc_id: &str, include_deleted: bool) -> Result<DocumentView, CoreError> {
        let document = sqlx::query_as::<_, Document>(
            "SELECT doc_id, title, url, checksum, checksum_algorithm, description, \
             created_at, updated_at, created_by, deleted_at \
             FROM documents WHERE doc_id = $1",
        )
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("document {doc_id}")))?;

        if !include_deleted && document.deleted_at.is_some() {
            return Err(CoreError::NotFound(format!("document {doc_id}")));
        }

        let signature_count = self.ledger.list_for_doc(doc_id).await?.len() as i64;

        Ok(DocumentView {
            document,
            signature_count,
        })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, doc_id: &str) -> Result<DocumentView, CoreError> {
        self.fetch(doc_id, false).await
    }

    async fn get_including_deleted(&self, doc_id: &str) -> Result<DocumentView, CoreError> {
        self.fetch(doc_id, true).await
    }

    async fn soft_delete(&self, doc_id: &str, actor_sub: &str) -> Result<(), CoreError> {
        tracing::info!(target: "registry", doc_id = %doc_id, actor_sub = %actor_sub, "document soft-deleted");
        sqlx::query("UPDATE documents SET deleted_at = now() WHERE doc_id = $1 AND deleted_at IS NULL")
            .bind(doc_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
