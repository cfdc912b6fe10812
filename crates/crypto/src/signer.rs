// Path: crates/crypto/src/signer.rs
//! Ed25519 key loading/generation and signing (spec §4.1, C1).

use crate::error::CryptoError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// A loaded or generated Ed25519 signing key, process-global and never
/// rewritten after startup (SPEC_FULL.md §9 / spec §9 "Global mutable
/// state").
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Loads a keypair from `ED25519_PRIVATE_KEY` if present: either a
    /// 32-byte seed or a 64-byte expanded key (seed || public key), both
    /// base64-encoded. Generates a fresh keypair otherwise, logging a
    /// clearly-marked warning and emitting the public key on stdout for
    /// operator capture (§4.1).
    pub fn load_or_generate(b64: Option<&str>) -> Result<Self, CryptoError> {
        match b64 {
            Some(b64) => Self::from_base64(b64),
            None => {
                tracing::warn!(
                    "ED25519_PRIVATE_KEY not set; generating an ephemeral signing key. \
                     Attestations signed with this key will not verify after restart."
                );
                let signer = Self::generate()?;
                println!(
                    "generated ephemeral Ed25519 public key: {}",
                    hex::encode(signer.public_key_bytes())
                );
                Ok(signer)
            }
        }
    }

    /// Parses a base64 seed (32 bytes) or expanded key (64 bytes; only the
    /// leading 32-byte seed is meaningful — the trailing bytes are the
    /// public key half of the expanded representation and are recomputed).
    pub fn from_base64(b64: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(BASE64.decode(b64.trim())?);
        let seed: [u8; 32] = match bytes.len() {
            32 => bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKey("seed must be 32 bytes".into()))?,
            64 => bytes
                .get(..32)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| {
                    CryptoError::InvalidKey("expanded key must be 64 bytes".into())
                })?,
            n => {
                return Err(CryptoError::InvalidKey(format!(
                    "expected 32-byte seed or 64-byte expanded key, got {n} bytes"
                )))
            }
        };
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(Self { signing_key })
    }

    /// Generates a fresh Ed25519 keypair from the OS CSPRNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut rng = OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        Ok(Self { signing_key })
    }

    /// Signs `message`, returning an always-64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64], CryptoError> {
        Ok(self.signing_key.sign(message).to_bytes())
    }

    /// Verifies `signature` (64 bytes) over `message` against this key's
    /// public half. Used by the offline chain-integrity verifier (§4.6)
    /// with a public key loaded independently of the signer.
    pub fn verify(
        public_key_bytes: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        let key_bytes: [u8; 32] = public_key_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("public key must be 32 bytes".into()))?;
        let public_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature("signature must be 64 bytes".into()))?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        public_key
            .verify(message, &signature)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }

    /// The 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_sign_verify_roundtrip() {
        let signer = Signer::generate().unwrap();
        let msg = b"doc_1|user_1|a@b.co|2025-01-01T00:00:00.000Z|aa|GENESIS";
        let sig = signer.sign(msg).unwrap();
        assert_eq!(sig.len(), 64);
        Signer::verify(&signer.public_key_bytes(), msg, &sig).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let signer = Signer::generate().unwrap();
        let sig = signer.sign(b"original").unwrap();
        assert!(Signer::verify(&signer.public_key_bytes(), b"tampered", &sig).is_err());
    }

    #[test]
    fn from_base64_32_byte_seed_roundtrips() {
        let seed = [7u8; 32];
        let b64 = BASE64.encode(seed);
        let loaded = Signer::from_base64(&b64).unwrap();
        let reloaded = Signer::from_base64(&b64).unwrap();
        assert_eq!(loaded.public_key_bytes(), reloaded.public_key_bytes());
        let msg = b"hello";
        let sig = loaded.sign(msg).unwrap();
        Signer::verify(&loaded.public_key_bytes(), msg, &sig).unwrap();
    }

    #[test]
    fn from_base64_64_byte_expanded_key_uses_leading_seed() {
        let seed = [9u8; 32];
        let mut expanded = seed.to_vec();
        expanded.extend_from_slice(&[0u8; 32]);
        let b64 = BASE64.encode(&expanded);
        let loaded = Signer::from_base64(&b64).unwrap();
        let from_seed = Signer::from_base64(&BASE64.encode(seed)).unwrap();
        assert_eq!(loaded.public_key_bytes(), from_seed.public_key_bytes());
    }

    #[test]
    fn from_base64_rejects_wrong_length() {
        let b64 = BASE64.encode([0u8; 10]);
        assert!(Signer::from_base64(&b64).is_err());
    }
}
