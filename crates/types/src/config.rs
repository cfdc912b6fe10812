// Path: crates/types/src/config.rs
//! The configuration surface from spec §6, read once at startup via
//! `AppConfig::from_env` and passed by reference to every component —
//! never re-read per request, matching the teacher's single-`Config`-struct
//! convention.

use crate::error::CoreError;
use std::env;
use std::time::Duration;

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// OAuth/OIDC endpoint set for the delegated-authorization flow (§4.4.1).
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Well-known provider shorthand (`google`, `github`, `gitlab`) or empty
    /// for a fully custom endpoint set.
    pub provider: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
    pub logout_url: Option<String>,
    /// Case-insensitive `@domain` suffix allow-list, or `None` to allow any.
    pub allowed_domain: Option<String>,
}

/// SMTP + template settings driving C7's dispatcher.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    pub starttls: bool,
    pub from_address: String,
    pub from_name: String,
    pub template_dir: String,
    pub default_locale: String,
    /// Ambient `{Organisation}` template variable (§6).
    pub organisation: String,
}

/// Per-surface token-bucket sizes, all "per minute" (§4.4.3, §6).
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub auth_per_minute: u32,
    pub general_per_minute: u32,
    pub document_per_minute: u32,
    pub magiclink_per_email: u32,
    pub magiclink_per_ip: u32,
}

/// The full, validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub db_dsn: String,
    pub oauth: Option<OAuthConfig>,
    pub magiclink_enabled: bool,
    pub mail: Option<MailConfig>,
    pub ed25519_private_key_b64: Option<String>,
    pub cookie_secret_b64: String,
    pub admin_emails: Vec<String>,
    pub rate_limits: RateLimitConfig,
}

impl AppConfig {
    /// Reads and validates every variable in spec §6's table. Fails startup
    /// (rather than lazily at first use) if a required combination is
    /// missing, per §4.4's "if both are off, startup fails".
    pub fn from_env() -> Result<Self, CoreError> {
        let base_url = env_opt("BASE_URL")
            .ok_or_else(|| CoreError::Validation("BASE_URL is required".into()))?;
        let db_dsn = env_opt("DB_DSN")
            .ok_or_else(|| CoreError::Validation("DB_DSN is required".into()))?;

        let oauth_client_id = env_opt("OAUTH_CLIENT_ID");
        let oauth_client_secret = env_opt("OAUTH_CLIENT_SECRET");
        let oauth_configured = oauth_client_id.is_some() && oauth_client_secret.is_some();
        let oauth_enabled = if env_opt("AUTH_OAUTH_ENABLED").is_some() {
            env_bool("AUTH_OAUTH_ENABLED", false)
        } else {
            oauth_configured
        };

        let oauth = if oauth_enabled {
            let provider = env_or("OAUTH_PROVIDER", "");
            let (auth_url, token_url, userinfo_url, default_scopes) =
                well_known_endpoints(&provider);
            Some(OAuthConfig {
                provider,
                client_id: oauth_client_id.ok_or_else(|| {
                    CoreError::Validation("OAUTH_CLIENT_ID required when OAuth is enabled".into())
                })?,
                client_secret: oauth_client_secret.ok_or_else(|| {
                    CoreError::Validation(
                        "OAUTH_CLIENT_SECRET required when OAuth is enabled".into(),
                    )
                })?,
                auth_url: env_opt("OAUTH_AUTH_URL").unwrap_or(auth_url),
                token_url: env_opt("OAUTH_TOKEN_URL").unwrap_or(token_url),
                userinfo_url: env_opt("OAUTH_USERINFO_URL").unwrap_or(userinfo_url),
                scopes: env_opt("OAUTH_SCOPES")
                    .map(|s| s.split(',').map(|x| x.trim().to_string()).collect())
                    .unwrap_or(default_scopes),
                logout_url: env_opt("OAUTH_LOGOUT_URL"),
                allowed_domain: env_opt("OAUTH_ALLOWED_DOMAIN"),
            })
        } else {
            None
        };

        let mail_configured = env_opt("MAIL_HOST").is_some();
        let magiclink_enabled = if env_opt("AUTH_MAGICLINK_ENABLED").is_some() {
            env_bool("AUTH_MAGICLINK_ENABLED", false)
        } else {
            mail_configured
        };

        if oauth.is_none() && !magiclink_enabled {
            return Err(CoreError::Validation(
                "at least one of OAuth or magic-link authentication must be enabled".into(),
            ));
        }

        let mail = if mail_configured {
            Some(MailConfig {
                host: env_or("MAIL_HOST", ""),
                port: env_u32("MAIL_PORT", 587) as u16,
                username: env_opt("MAIL_USERNAME"),
                password: env_opt("MAIL_PASSWORD"),
                tls: env_bool("MAIL_TLS", false),
                starttls: env_bool("MAIL_STARTTLS", true),
                from_address: env_or("MAIL_FROM", "no-reply@localhost"),
                from_name: env_or("MAIL_FROM_NAME", "Proof of Read"),
                template_dir: env_or("MAIL_TEMPLATE_DIR", "templates/mail"),
                default_locale: env_or("MAIL_DEFAULT_LOCALE", "en"),
                organisation: env_or("MAIL_ORGANISATION", "Proof of Read"),
            })
        } else {
            None
        };

        let admin_emails = env_opt("ADMIN_EMAILS")
            .map(|s| {
                s.split(',')
                    .map(|e| e.trim().to_ascii_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cookie_secret_b64 = env_opt("OAUTH_COOKIE_SECRET")
            .ok_or_else(|| CoreError::Validation("OAUTH_COOKIE_SECRET is required".into()))?;

        Ok(Self {
            base_url,
            db_dsn,
            oauth,
            magiclink_enabled,
            mail,
            ed25519_private_key_b64: env_opt("ED25519_PRIVATE_KEY"),
            cookie_secret_b64,
            admin_emails,
            rate_limits: RateLimitConfig {
                auth_per_minute: env_u32("AUTH_RATE_LIMIT", 5),
                general_per_minute: env_u32("GENERAL_RATE_LIMIT", 60),
                document_per_minute: env_u32("DOCUMENT_RATE_LIMIT", 30),
                magiclink_per_email: env_u32("AUTH_MAGICLINK_RATE_LIMIT_EMAIL", 3),
                magiclink_per_ip: env_u32("AUTH_MAGICLINK_RATE_LIMIT_IP", 10),
            },
        })
    }

    /// Whether the configured `BASE_URL` is HTTPS, used to set the session
    /// cookie's `Secure` attribute (§4.5).
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

fn well_known_endpoints(provider: &str) -> (String, String, String, Vec<String>) {
    let scopes = vec!["openid".into(), "email".into(), "profile".into()];
    match provider {
        "google" => (
            "https://accounts.google.com/o/oauth2/v2/auth".into(),
            "https://oauth2.googleapis.com/token".into(),
            "https://openidconnect.googleapis.com/v1/userinfo".into(),
            scopes,
        ),
        "github" => (
            "https://github.com/login/oauth/authorize".into(),
            "https://github.com/login/oauth/access_token".into(),
            "https://api.github.com/user".into(),
            vec!["read:user".into(), "user:email".into()],
        ),
        "gitlab" => (
            "https://gitlab.com/oauth/authorize".into(),
            "https://gitlab.com/oauth/token".into(),
            "https://gitlab.com/oauth/userinfo".into(),
            scopes,
        ),
        _ => (String::new(), String::new(), String::new(), scopes),
    }
}

/// Default deadlines for external calls (§5 "Cancellation & timeouts").
pub struct Deadlines;

impl Deadlines {
    pub const ISSUER_TOKEN_EXCHANGE: Duration = Duration::from_secs(10);
    pub const USERINFO_FETCH: Duration = Duration::from_secs(10);
    pub const SMTP_DISPATCH: Duration = Duration::from_secs(30);
    pub const DATABASE_QUERY: Duration = Duration::from_secs(5);
}
