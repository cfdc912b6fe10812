// Path: crates/identity/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # ackify-identity
//!
//! The dual-method identity provider (C4, spec §4.4): delegated
//! authorization with PKCE proof-of-possession, and passwordless
//! single-use email login. The session and credential store (C5, spec
//! §4.5): AEAD-encrypted session cookies and refresh tokens, with a
//! background expiry reaper.

/// AEAD key derivation and encrypt/decrypt helpers shared by the session
/// cookie codec and the refresh-token-at-rest cipher (C5, spec §4.5).
pub mod aead;
/// The delegated-authorization (OAuth2/OIDC + PKCE) flow (C4.4.1).
pub mod oauth;
/// Passwordless single-use email login (C4.4.2).
pub mod magiclink;
/// Per-email / per-IP token-bucket rate limiting (C4.4.3).
pub mod ratelimit;
/// Session lifecycle, credential encryption, and the expiry reaper (C5).
pub mod session;

pub use oauth::OAuthProvider;
pub use magiclink::MagicLinkProvider;
pub use ratelimit::TokenBucketLimiter;
pub use session::{PgSessionStore, SessionStore};
