// Path: crates/crypto/src/error.rs
//! Local error types for the `ackify-crypto` crate.

use thiserror::Error;

/// Errors raised by key loading, signing, and verification.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("signing operation failed: {0}")]
    SignFailed(String),
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
}
