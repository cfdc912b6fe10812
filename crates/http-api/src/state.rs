// Path: crates/http-api/src/state.rs
//! The shared, cloneable application state handed to every handler.

use ackify_identity::{MagicLinkProvider, OAuthProvider, TokenBucketLimiter};
use ackify_ledger::{LedgerStore, SigningEngine};
use ackify_mailer::EmailQueue;
use ackify_registry::{DocumentStore, SignerRegistry};
use ackify_types::config::{AppConfig, RateLimitConfig};
use sqlx::PgPool;
use std::net::IpAddr;
use std::sync::Arc;

/// Every per-surface token bucket wired from `RateLimitConfig` (spec §6's
/// rate-limit table, §4.4.3).
pub struct RateLimiters {
    pub auth_ip: TokenBucketLimiter<IpAddr>,
    pub general_ip: TokenBucketLimiter<IpAddr>,
    pub document_ip: TokenBucketLimiter<IpAddr>,
    pub magiclink_email: TokenBucketLimiter<String>,
    pub magiclink_ip: TokenBucketLimiter<IpAddr>,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            auth_ip: TokenBucketLimiter::new(config.auth_per_minute),
            general_ip: TokenBucketLimiter::new(config.general_per_minute),
            document_ip: TokenBucketLimiter::new(config.document_per_minute),
            magiclink_email: TokenBucketLimiter::new(config.magiclink_per_email),
            magiclink_ip: TokenBucketLimiter::new(config.magiclink_per_ip),
        }
    }
}

#[derive(Clone)]
pub struct AppState(pub Arc<Inner>);

pub struct Inner {
    pub config: AppConfig,
    pub pool: PgPool,
    pub ledger: Arc<dyn LedgerStore>,
    pub signing_engine: SigningEngine,
    pub sessions: Arc<dyn ackify_identity::SessionStore>,
    pub oauth: Option<OAuthProvider>,
    pub magiclink: Option<MagicLinkProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub signers: Arc<dyn SignerRegistry>,
    pub email_queue: Option<Arc<dyn EmailQueue>>,
    pub signer_public_key: [u8; 32],
    pub rate_limiters: RateLimiters,
}

impl AppState {
    pub fn is_admin(&self, email: &str) -> bool {
        let lower = email.to_ascii_lowercase();
        self.0.config.admin_emails.iter().any(|e| e == &lower)
    }
}

impl std::ops::Deref for AppState {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
