// Path: crates/ledger/src/verify.rs
//! The offline chain-integrity verifier (spec §4.6). Invoked by admin
//! tooling, never by [`crate::engine::SigningEngine::create`] — it is
//! explicitly kept off the hot path (§4.3).

use crate::store::LedgerStore;
use ackify_crypto::{canonical_payload, payload_hash, Signer};
use ackify_types::domain::attestation::{ChainVerification, GENESIS};
use ackify_types::error::CoreError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Replays every attestation for `doc_id`, recomputing its hash, chain
/// linkage, and signature from stored fields. Mutates nothing.
pub async fn verify_chain(
    store: &dyn LedgerStore,
    public_key: &[u8],
    doc_id: &str,
) -> Result<ChainVerification, CoreError> {
    let attestations = store.list_for_doc(doc_id).await?;
    let mut result = ChainVerification {
        total: attestations.len(),
        ..Default::default()
    };

    let mut prev_recomputed_hash: Option<String> = None;

    for (index, attestation) in attestations.iter().enumerate() {
        let mut row_valid = true;

        let payload = canonical_payload(
            &attestation.doc_id,
            &attestation.user_sub,
            &attestation.user_email,
            attestation.signed_at,
            &attestation.nonce,
            &attestation.prev_hash,
        );
        let recomputed_hash = match payload_hash(&payload) {
            Ok(h) => h,
            Err(_) => {
                result.errors.push(format!("hash_mismatch@{}", attestation.id));
                row_valid = false;
                attestation.payload_hash.clone()
            }
        };
        if recomputed_hash != attestation.payload_hash {
            result.errors.push(format!("hash_mismatch@{}", attestation.id));
            row_valid = false;
        }

        if index == 0 {
            if attestation.prev_hash != GENESIS {
                result.errors.push(format!("genesis_violation@{}", attestation.id));
                row_valid = false;
            }
        } else if let Some(expected_prev) = &prev_recomputed_hash {
            if &attestation.prev_hash != expected_prev {
                result.errors.push(format!("chain_break@{}", attestation.id));
                row_valid = false;
            }
        }

        let signature_bytes = BASE64
            .decode(&attestation.signature)
            .unwrap_or_default();
        if Signer::verify(public_key, &payload, &signature_bytes).is_err() {
            result.errors.push(format!("signature_invalid@{}", attestation.id));
            row_valid = false;
        }

        if row_valid {
            result.valid += 1;
        } else {
            result.invalid += 1;
        }
        prev_recomputed_hash = Some(recomputed_hash);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LedgerStore;
    use ackify_types::domain::attestation::{Attestation, NewAttestation};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// An in-process stand-in for `PgLedgerStore` that exercises the same
    /// append-under-lock contract without a database, so `verify_chain` can
    /// be tested against a chain it actually built.
    struct FakeStore {
        rows: Mutex<Vec<Attestation>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self { rows: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LedgerStore for FakeStore {
        async fn get_tail(&self, doc_id: &str) -> Result<Option<Attestation>, CoreError> {
            Ok(self.rows.lock().unwrap().iter().rev().find(|a| a.doc_id == doc_id).cloned())
        }

        async fn append(&self, candidate: NewAttestation) -> Result<Attestation, CoreError> {
            let mut rows = self.rows.lock().unwrap();
            let attestation = Attestation {
                id: rows.len() as i64 + 1,
                doc_id: candidate.doc_id,
                user_sub: candidate.user_sub,
                user_email: candidate.user_email,
                user_name: candidate.user_name,
                signed_at: candidate.signed_at,
                payload_hash: candidate.payload_hash,
                signature: candidate.signature,
                nonce: candidate.nonce,
                prev_hash: candidate.prev_hash,
                referer: candidate.referer,
                created_at: Utc::now(),
            };
            rows.push(attestation.clone());
            Ok(attestation)
        }

        async fn list_for_doc(&self, doc_id: &str) -> Result<Vec<Attestation>, CoreError> {
            Ok(self.rows.lock().unwrap().iter().filter(|a| a.doc_id == doc_id).cloned().collect())
        }

        async fn list_for_user(
            &self,
            _user_sub: &str,
        ) -> Result<Vec<(Attestation, Option<chrono::DateTime<Utc>>)>, CoreError> {
            Ok(Vec::new())
        }

        async fn get_by_doc_and_user(
            &self,
            _doc_id: &str,
            _user_sub: &str,
        ) -> Result<Option<Attestation>, CoreError> {
            Ok(None)
        }
    }

    async fn signed_row(store: &FakeStore, signer: &Signer, doc_id: &str, user_sub: &str) -> Attestation {
        let prev_hash = store
            .get_tail(doc_id)
            .await
            .unwrap()
            .map(|a| a.payload_hash)
            .unwrap_or_else(|| GENESIS.to_string());
        let signed_at = Utc::now();
        let nonce = ackify_crypto::random_nonce_hex();
        let payload = canonical_payload(doc_id, user_sub, "user@example.com", signed_at, &nonce, &prev_hash);
        let digest = payload_hash(&payload).unwrap();
        let signature = signer.sign(&payload).unwrap();
        store
            .append(NewAttestation {
                doc_id: doc_id.to_string(),
                user_sub: user_sub.to_string(),
                user_email: "user@example.com".to_string(),
                user_name: None,
                signed_at,
                payload_hash: digest,
                signature: BASE64.encode(signature),
                nonce,
                prev_hash,
                referer: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn a_valid_chain_has_no_errors() {
        let signer = Signer::generate().unwrap();
        let store = FakeStore::new();
        signed_row(&store, &signer, "doc1", "u1").await;
        signed_row(&store, &signer, "doc1", "u2").await;

        let result = verify_chain(&store, &signer.public_key_bytes(), "doc1").await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.valid, 2);
        assert_eq!(result.invalid, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn a_tampered_payload_hash_is_reported() {
        let signer = Signer::generate().unwrap();
        let store = FakeStore::new();
        signed_row(&store, &signer, "doc1", "u1").await;
        {
            let mut rows = store.rows.lock().unwrap();
            rows[0].payload_hash = "deadbeef".to_string();
        }

        let result = verify_chain(&store, &signer.public_key_bytes(), "doc1").await.unwrap();
        assert_eq!(result.invalid, 1);
        assert!(result.errors.iter().any(|e| e.starts_with("hash_mismatch@")));
    }

    #[tokio::test]
    async fn signature_from_a_different_key_is_reported() {
        let signer = Signer::generate().unwrap();
        let other_signer = Signer::generate().unwrap();
        let store = FakeStore::new();
        signed_row(&store, &signer, "doc1", "u1").await;

        let result = verify_chain(&store, &other_signer.public_key_bytes(), "doc1").await.unwrap();
        assert_eq!(result.invalid, 1);
        assert!(result.errors.iter().any(|e| e.starts_with("signature_invalid@")));
    }
}
