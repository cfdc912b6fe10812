// Path: crates/crypto/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # ackify-crypto
//!
//! C1: Ed25519 key loading/generation and the canonical payload codec
//! (spec §4.1). Built on `ed25519-dalek` and `sha2`, so the core never
//! shells out to OpenSSL.

/// Error types for this crate.
pub mod error;
/// The canonical payload encoding and hashing (§4.1).
pub mod payload;
/// Ed25519 key loading, generation, signing, and verification.
pub mod signer;

pub use error::CryptoError;
pub use payload::{canonical_payload, payload_hash, random_nonce_hex};
pub use signer::Signer;
