// Path: crates/identity/src/aead.rs
//! AEAD key derivation (spec §4.5): one base64-encoded operator secret
//! (`OAUTH_COOKIE_SECRET`) feeds HKDF-SHA-256 with a fixed, purpose-specific
//! context string to derive independent subkeys for the session cookie and
//! for refresh tokens at rest. A compromise of one subkey's ciphertext
//! store does not help an attacker who only has that subkey forge the
//! other.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("invalid secret material: {0}")]
    InvalidSecret(String),
    #[error("encryption failed")]
    EncryptFailed,
    #[error("decryption failed: ciphertext invalid or key mismatch")]
    DecryptFailed,
}

const NONCE_LEN: usize = 12;

/// An AES-256-GCM key derived from the operator secret via HKDF-SHA-256 for
/// one specific purpose (`context`). Never logged, never re-derived per
/// request.
pub struct DerivedKey {
    cipher: Aes256Gcm,
}

impl DerivedKey {
    /// Derives a subkey from the base64-encoded master secret, bound to
    /// `context` (e.g. `b"ackify-session-cookie-v1"` or
    /// `b"ackify-refresh-token-v1"`).
    pub fn derive(secret_b64: &str, context: &[u8]) -> Result<Self, AeadError> {
        let master = Zeroizing::new(
            BASE64
                .decode(secret_b64.trim())
                .map_err(|e| AeadError::InvalidSecret(e.to_string()))?,
        );
        let hk = Hkdf::<Sha256>::new(None, &master);
        let mut okm = Zeroizing::new([0u8; 32]);
        hk.expand(context, okm.as_mut())
            .map_err(|_| AeadError::InvalidSecret("HKDF expand failed".into()))?;
        let cipher = Aes256Gcm::new_from_slice(okm.as_ref())
            .map_err(|_| AeadError::InvalidSecret("invalid derived key length".into()))?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext`, prepending a fresh 96-bit nonce to the
    /// ciphertext. Returns `(ciphertext_with_nonce, nonce)` — the nonce is
    /// also returned separately so callers that store it in its own column
    /// (refresh tokens, per spec §4.5 "Each row carries its own 96-bit
    /// nonce") can do so without re-parsing the blob.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), AeadError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, Payload { msg: plaintext, aad })
            .map_err(|_| AeadError::EncryptFailed)?;
        Ok((ciphertext, nonce_bytes))
    }

    /// Decrypts `ciphertext` using the given `nonce`.
    pub fn open(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, AeadError> {
        let nonce = Nonce::from_slice(nonce);
        let plaintext = self
            .cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| AeadError::DecryptFailed)?;
        Ok(Zeroizing::new(plaintext))
    }
}

/// Purpose-binding context for the session cookie cipher.
pub const COOKIE_CONTEXT: &[u8] = b"ackify-session-cookie-v1";
/// Purpose-binding context for the refresh-token-at-rest cipher.
pub const REFRESH_TOKEN_CONTEXT: &[u8] = b"ackify-refresh-token-v1";

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> String {
        BASE64.encode([7u8; 32])
    }

    #[test]
    fn seal_open_roundtrips() {
        let key = DerivedKey::derive(&secret(), REFRESH_TOKEN_CONTEXT).unwrap();
        let (ciphertext, nonce) = key.seal(b"super-secret-refresh-token", b"user_sub=u1").unwrap();
        assert_ne!(ciphertext, b"super-secret-refresh-token".to_vec());
        let plaintext = key.open(&ciphertext, &nonce, b"user_sub=u1").unwrap();
        assert_eq!(plaintext.as_slice(), b"super-secret-refresh-token");
    }

    #[test]
    fn open_fails_with_wrong_key() {
        let key_a = DerivedKey::derive(&secret(), REFRESH_TOKEN_CONTEXT).unwrap();
        let key_b = DerivedKey::derive(&BASE64.encode([9u8; 32]), REFRESH_TOKEN_CONTEXT).unwrap();
        let (ciphertext, nonce) = key_a.seal(b"payload", b"").unwrap();
        assert!(key_b.open(&ciphertext, &nonce, b"").is_err());
    }

    #[test]
    fn distinct_contexts_derive_distinct_keys() {
        let cookie_key = DerivedKey::derive(&secret(), COOKIE_CONTEXT).unwrap();
        let refresh_key = DerivedKey::derive(&secret(), REFRESH_TOKEN_CONTEXT).unwrap();
        let (ciphertext, nonce) = cookie_key.seal(b"payload", b"").unwrap();
        assert!(refresh_key.open(&ciphertext, &nonce, b"").is_err());
    }
}
