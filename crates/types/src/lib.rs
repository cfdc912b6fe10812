// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]

//! # ackify-types
//!
//! Foundational crate for the proof-of-read core. Holds the domain structs
//! (`Attestation`, `Document`, `Session`, `EmailJob`, ...), the error
//! taxonomy shared by every component, and the `AppConfig` surface read at
//! startup. Kept free of any I/O dependency so it can sit at the bottom of
//! the dependency graph.

/// A crate-wide `Result` alias defaulting to [`error::CoreError`].
pub type Result<T, E = error::CoreError> = std::result::Result<T, E>;

/// Domain structs: the unit of the ledger and its satellite records.
pub mod domain;
/// The error taxonomy (§7) shared across every component.
pub mod error;
/// The configuration surface (§6), read once at startup.
pub mod config;
