// Path: crates/ledger/src/lib.rs
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

//! # ackify-ledger
//!
//! The append-only, hash-chained attestation ledger (C2), the signing
//! engine that orchestrates chain-read/sign/append under contention (C3),
//! and the offline chain-integrity verifier (C4.6 / spec §4.6).

/// The transactional facade over the `attestations` table (C2, spec §4.2).
pub mod store;
/// Orchestrates `create` and the chain-conflict retry loop (C3, spec §4.3).
pub mod engine;
/// Offline, read-only chain-integrity replay (spec §4.6).
pub mod verify;

pub use engine::SigningEngine;
pub use store::{LedgerStore, PgLedgerStore};
pub use verify::verify_chain;
