// Path: crates/ledger/src/engine.rs
//! The signing engine (C3, spec §4.3): orchestrates
//! chain-read → canonicalize → sign → chain-append under contention.

use crate::store::LedgerStore;
use ackify_crypto::{canonical_payload, payload_hash, random_nonce_hex, Signer};
use ackify_types::domain::attestation::{Attestation, NewAttestation, SignStatus, GENESIS};
use ackify_types::domain::session::Identity;
use ackify_types::error::CoreError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{TimeZone, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// `ackify-crypto` has no dependency on `ackify-types`, so its error type
/// carries no blanket `From` conversion; map it to `Internal` here at the
/// one seam that calls into the signer.
fn crypto_err(e: ackify_crypto::CryptoError) -> CoreError {
    CoreError::Internal(anyhow::anyhow!(e))
}

/// Chain-conflict attempts beyond the first, per spec §4.3 step 9
/// ("retry... up to 3 times").
const MAX_RETRIES: u32 = 3;
const BACKOFF_MIN_MS: u64 = 10;
const BACKOFF_MAX_MS: u64 = 50;

pub struct SigningEngine {
    store: Arc<dyn LedgerStore>,
    signer: Arc<Signer>,
}

impl SigningEngine {
    pub fn new(store: Arc<dyn LedgerStore>, signer: Arc<Signer>) -> Self {
        Self { store, signer }
    }

    /// `create(doc_id, user, referer?)` — spec §4.3.
    ///
    /// On `ALREADY_SIGNED`, aborts immediately and returns that error
    /// verbatim (signing is not retried; it is idempotent from the user's
    /// perspective). On `CHAIN_CONFLICT`, retries from the tail read with
    /// randomized 10-50ms backoff; after [`MAX_RETRIES`] attempts, fails
    /// with [`CoreError::Transient`].
    pub async fn create(
        &self,
        doc_id: &str,
        user: &Identity,
        referer: Option<String>,
    ) -> Result<Attestation, CoreError> {
        let _timer = ackify_telemetry::time::Timer::new(ackify_telemetry::ledger_metrics());

        for attempt in 0..=MAX_RETRIES {
            let tail = self.store.get_tail(doc_id).await?;
            let prev_hash = tail
                .map(|a| a.payload_hash)
                .unwrap_or_else(|| GENESIS.to_string());

            let signed_at = truncate_to_millis(Utc::now());
            let nonce = random_nonce_hex();
            let payload =
                canonical_payload(doc_id, &user.sub, &user.email, signed_at, &nonce, &prev_hash);
            let digest = payload_hash(&payload).map_err(crypto_err)?;
            let signature = self.signer.sign(&payload).map_err(crypto_err)?;

            let candidate = NewAttestation {
                doc_id: doc_id.to_string(),
                user_sub: user.sub.clone(),
                user_email: user.email.clone(),
                user_name: user.name.clone(),
                signed_at,
                payload_hash: digest,
                signature: BASE64.encode(signature),
                nonce,
                prev_hash,
                referer: referer.clone(),
            };

            match self.store.append(candidate).await {
                Ok(attestation) => {
                    ackify_telemetry::ledger_metrics().inc_attestations_created();
                    tracing::info!(
                        target: "ledger",
                        doc_id = %attestation.doc_id,
                        user_sub = %attestation.user_sub,
                        "attestation created"
                    );
                    return Ok(attestation);
                }
                Err(CoreError::AlreadySigned) => {
                    ackify_telemetry::ledger_metrics().inc_already_signed();
                    return Err(CoreError::AlreadySigned);
                }
                Err(CoreError::ChainConflict) if attempt < MAX_RETRIES => {
                    ackify_telemetry::ledger_metrics().inc_chain_conflict_retry();
                    let backoff_ms = rand::thread_rng().gen_range(BACKOFF_MIN_MS..=BACKOFF_MAX_MS);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    continue;
                }
                Err(CoreError::ChainConflict) => {
                    ackify_telemetry::ledger_metrics().inc_transient_failure();
                    return Err(CoreError::Transient(
                        "chain conflict retries exhausted".into(),
                    ));
                }
                Err(other) => return Err(other),
            }
        }

        // Unreachable: the loop above always returns by the final attempt.
        Err(CoreError::Transient("chain conflict retries exhausted".into()))
    }

    /// Status query for `(doc_id, user)` — spec §4.3 "Status query".
    pub async fn status(&self, doc_id: &str, user_sub: &str) -> Result<SignStatus, CoreError> {
        let existing = self.store.get_by_doc_and_user(doc_id, user_sub).await?;
        Ok(match existing {
            Some(a) => SignStatus {
                is_signed: true,
                signed_at: Some(a.signed_at),
            },
            None => SignStatus {
                is_signed: false,
                signed_at: None,
            },
        })
    }
}

/// Truncates an instant to millisecond precision, matching the canonical
/// payload's RFC-3339 formatting (§4.1) so `signed_at` as stored equals
/// `signed_at` as hashed.
fn truncate_to_millis(instant: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    let millis = instant.timestamp_millis();
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(instant)
}
