// Path: crates/crypto/src/payload.rs
//! The canonical attestation payload (spec §4.1). Byte-deterministic: two
//! implementations must produce identical `payload_hash` for identical
//! inputs, so every field here is formatted exactly once, in exactly one
//! way.

use crate::error::CryptoError;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Formats an instant as RFC-3339, UTC, millisecond precision, trailing
/// `Z` — e.g. `2025-01-01T00:00:00.000Z`. This is the single hardest
/// correctness pitfall in the whole system (SPEC_FULL.md §B.1 / spec §9):
/// any other precision or offset representation produces a different
/// `payload_hash` for logically-identical instants.
pub fn format_signed_at(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Builds the canonical UTF-8 payload bytes:
/// `doc_id|user_sub|user_email|signed_at|nonce_hex|prev_hash`.
pub fn canonical_payload(
    doc_id: &str,
    user_sub: &str,
    user_email: &str,
    signed_at: DateTime<Utc>,
    nonce_hex: &str,
    prev_hash: &str,
) -> Vec<u8> {
    format!(
        "{doc_id}|{user_sub}|{user_email}|{}|{nonce_hex}|{prev_hash}",
        format_signed_at(signed_at)
    )
    .into_bytes()
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> Result<String, CryptoError> {
    Ok(hex::encode(Sha256::digest(bytes)))
}

/// `payload_hash = hex(SHA-256(canonical payload))`.
pub fn payload_hash(payload: &[u8]) -> Result<String, CryptoError> {
    sha256_hex(payload)
}

/// Lowercase hex of 16 cryptographically random bytes, the attestation's
/// `nonce` field.
pub fn random_nonce_hex() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_signed_at_is_millisecond_rfc3339_utc() {
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(678);
        assert_eq!(format_signed_at(t), "2025-01-02T03:04:05.678Z");
    }

    #[test]
    fn payload_hash_is_deterministic() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = canonical_payload("doc", "sub", "e@x.co", t, "aabb", "GENESIS");
        let b = canonical_payload("doc", "sub", "e@x.co", t, "aabb", "GENESIS");
        assert_eq!(payload_hash(&a).unwrap(), payload_hash(&b).unwrap());
    }

    #[test]
    fn payload_hash_changes_with_any_field() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let base = canonical_payload("doc", "sub", "e@x.co", t, "aabb", "GENESIS");
        let changed_doc = canonical_payload("other", "sub", "e@x.co", t, "aabb", "GENESIS");
        assert_ne!(payload_hash(&base).unwrap(), payload_hash(&changed_doc).unwrap());
    }

    #[test]
    fn nonce_is_sixteen_bytes_of_hex() {
        let nonce = random_nonce_hex();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
