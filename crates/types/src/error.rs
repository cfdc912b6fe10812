// Path: crates/types/src/error.rs
//! The error taxonomy from spec §7, expressed as a `thiserror` enum with a
//! stable, machine-readable code per variant.

use thiserror::Error;

/// Assigns a stable, machine-readable string code to an error, independent
/// of its `Display` message. The HTTP boundary maps this code to a status
/// and echoes it verbatim in the `{"error": {"code": ...}}` envelope.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;

    /// The HTTP status this error kind maps to.
    fn status(&self) -> u16;
}

/// The single error type threaded through every component. Each variant
/// corresponds 1:1 to a row of spec §7's taxonomy table.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No valid session, or an expired delegated-auth token.
    #[error("unauthorized")]
    Unauthorized,
    /// Missing capability: not admin, not doc owner on a restricted endpoint.
    #[error("forbidden")]
    Forbidden,
    /// Issuer-validated email failed the configured allow-list.
    #[error("domain not allowed")]
    DomainNotAllowed,
    /// Auth-callback state token absent, expired, tampered, or PKCE mismatch.
    #[error("invalid state")]
    InvalidState,
    /// Document or resource does not exist, or is soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),
    /// (doc_id, user_sub) uniqueness (I1) would be violated.
    #[error("already signed")]
    AlreadySigned,
    /// A concurrent append changed the chain tail; recovered internally by
    /// retrying `create` (§4.3 step 9). Never reaches the client as such —
    /// exhausting retries surfaces as `Transient`.
    #[error("chain conflict")]
    ChainConflict,
    /// Malformed request body, missing required field, bad email shape.
    #[error("validation error: {0}")]
    Validation(String),
    /// A token-bucket limiter rejected the request.
    #[error("rate limited")]
    RateLimited,
    /// Database unavailable, timeout exhaustion, SMTP refusal after retries.
    #[error("transient failure: {0}")]
    Transient(String),
    /// Unclassified failure. Full detail goes to structured logs, never to
    /// the client.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::InvalidState => "INVALID_STATE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadySigned => "ALREADY_SIGNED",
            Self::ChainConflict => "CHAIN_CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::Transient(_) => "TRANSIENT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden | Self::DomainNotAllowed => 403,
            Self::InvalidState | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::AlreadySigned => 409,
            Self::ChainConflict => 500,
            Self::RateLimited => 429,
            Self::Transient(_) => 503,
            Self::Internal(_) => 500,
        }
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::Transient(format!("database unavailable: {e}"))
            }
            sqlx::Error::RowNotFound => Self::NotFound("row not found".into()),
            _ => Self::Internal(anyhow::Error::new(e)),
        }
    }
}
