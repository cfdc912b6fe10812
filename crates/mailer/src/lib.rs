// Path: crates/mailer/src/lib.rs
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

//! # ackify-mailer
//!
//! The durable, priority-ordered outbound email work queue (C7, spec
//! §4.7): enqueue, the `FOR UPDATE SKIP LOCKED` dispatcher pool, template
//! resolution, and the daily cleanup worker.

/// Enqueue and claim operations over the `email_queue` table.
pub mod queue;
/// The N-worker dispatcher loop: claim, render, send, retry.
pub mod dispatcher;
/// `(template, locale)` → filesystem path resolution (spec §6).
pub mod templates;
/// The SMTP transport boundary.
pub mod transport;

pub use dispatcher::Dispatcher;
pub use queue::{EmailQueue, PgEmailQueue};
pub use templates::TemplateResolver;
pub use transport::SmtpTransport;
