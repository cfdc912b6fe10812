// Path: crates/registry/src/lib.rs
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

//! # ackify-registry
//!
//! Document metadata, the expected-signer registry, and completion
//! statistics (C6, spec §4.6). The registry joins against the ledger on
//! `user_email` but never shares a table with it — see spec §9 "Cyclic
//! dependencies and layered ownership".

/// Document metadata CRUD and soft-delete.
pub mod documents;
/// Expected-signer registry CRUD and completion statistics.
pub mod signers;

pub use documents::{DocumentStore, PgDocumentStore};
pub use signers::{PgSignerRegistry, SignerRegistry};
