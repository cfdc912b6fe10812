// Path: crates/identity/src/oauth.rs
//! The delegated-authorization flow (C4.4.1, spec §4.4.1): authorization
//! code + PKCE (S256), a short-lived server-side state cache, userinfo
//! fetch, and the domain allow-list.

use ackify_types::config::OAuthConfig;
use ackify_types::error::CoreError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, Scope, TokenUrl,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// State-token cache TTL (spec §4.4.1 step 1).
const STATE_TTL: ChronoDuration = ChronoDuration::minutes(10);

struct CachedState {
    pkce_verifier: PkceCodeVerifier,
    next: String,
    issued_at: DateTime<Utc>,
}

/// The user profile resolved from the issuer's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamProfile {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
}

/// Returned from [`OAuthProvider::begin`].
pub struct LoginStart {
    pub authorize_url: String,
    pub state_token: String,
}

/// The result of a validated callback, before session issuance.
pub struct CallbackResult {
    pub profile: UpstreamProfile,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub next: String,
}

/// Drives the authorization-code + PKCE flow against one configured issuer.
/// The state-token cache is process-global, keyed state (spec §9 "Global
/// mutable state") — constructed once at startup and shared via `Arc`.
#[derive(Clone)]
pub struct OAuthProvider {
    config: OAuthConfig,
    client: BasicClient,
    http: reqwest::Client,
    state_cache: Arc<DashMap<String, CachedState>>,
}

impl OAuthProvider {
    pub fn new(config: OAuthConfig, redirect_url: String) -> Result<Self, CoreError> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.auth_url.clone())
                .map_err(|e| CoreError::Validation(format!("invalid OAUTH_AUTH_URL: {e}")))?,
            Some(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| CoreError::Validation(format!("invalid OAUTH_TOKEN_URL: {e}")))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(redirect_url)
                .map_err(|e| CoreError::Validation(format!("invalid redirect URL: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .timeout(ackify_types::config::Deadlines::ISSUER_TOKEN_EXCHANGE)
            .build()
            .map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))?;

        Ok(Self {
            config,
            client,
            http,
            state_cache: Arc::new(DashMap::new()),
        })
    }

    /// Step 1 of spec §4.4.1: issues a fresh `state_token` + PKCE verifier
    /// pair and returns the issuer's authorize URL.
    pub fn begin(&self, next: &str) -> LoginStart {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.config.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (authorize_url, csrf_token) = request.set_pkce_challenge(pkce_challenge).url();

        let state_token = csrf_token.secret().clone();
        self.state_cache.insert(
            state_token.clone(),
            CachedState {
                pkce_verifier,
                next: next.to_string(),
                issued_at: Utc::now(),
            },
        );

        LoginStart {
            authorize_url: authorize_url.to_string(),
            state_token,
        }
    }

    /// Step 2 of spec §4.4.1: validates `state`, exchanges `code`, fetches
    /// userinfo, and applies the domain allow-list.
    pub async fn callback(&self, code: &str, state: &str) -> Result<CallbackResult, CoreError> {
        let cached = self
            .state_cache
            .remove(state)
            .map(|(_, v)| v)
            .ok_or(CoreError::InvalidState)?;

        if Utc::now() - cached.issued_at > STATE_TTL {
            return Err(CoreError::InvalidState);
        }

        let token_response = self
            .exchange_code(code, cached.pkce_verifier)
            .await
            .map_err(|e| CoreError::Transient(format!("token exchange failed: {e}")))?;

        let profile = self
            .fetch_userinfo(&token_response.access_token)
            .await
            .map_err(|e| CoreError::Transient(format!("userinfo fetch failed: {e}")))?;

        if let Some(allowed_domain) = &self.config.allowed_domain {
            let suffix = allowed_domain.to_ascii_lowercase();
            let email_lower = profile.email.to_ascii_lowercase();
            if !email_lower.ends_with(&suffix) {
                return Err(CoreError::DomainNotAllowed);
            }
        }

        Ok(CallbackResult {
            profile,
            refresh_token: token_response.refresh_token,
            access_token_expires_at: token_response
                .expires_in_secs
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs as i64)),
            next: sanitize_next(&cached.next),
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<TokenExchangeResult, anyhow::Error> {
        // Exchanged by hand against `self.http` rather than through
        // `oauth2`'s async request executor: this keeps a single HTTP
        // client (and its deadline) shared across the token exchange and
        // the userinfo fetch below.
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("code_verifier", pkce_verifier.secret().as_str()),
        ];
        let response: RawTokenResponse = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(TokenExchangeResult {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in_secs: response.expires_in,
        })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UpstreamProfile, anyhow::Error> {
        let response: UpstreamProfile = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    /// Drops cached state entries older than [`STATE_TTL`], bounding memory
    /// use from abandoned logins. Intended to be called periodically
    /// alongside the session reaper.
    pub fn sweep_expired_state(&self) {
        let now = Utc::now();
        self.state_cache
            .retain(|_, cached| now - cached.issued_at <= STATE_TTL);
    }
}

struct TokenExchangeResult {
    access_token: String,
    refresh_token: Option<String>,
    expires_in_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Coerces `next` to same-host-or-relative, per spec §4.4.1 step 2
/// ("must be same-host or relative; otherwise coerced to `/`").
fn sanitize_next(next: &str) -> String {
    if next.starts_with('/') && !next.starts_with("//") {
        next.to_string()
    } else {
        "/".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_next_allows_relative_paths() {
        assert_eq!(sanitize_next("/documents/abc"), "/documents/abc");
    }

    #[test]
    fn sanitize_next_rejects_protocol_relative_and_absolute_urls() {
        assert_eq!(sanitize_next("//evil.example.com"), "/");
        assert_eq!(sanitize_next("https://evil.example.com"), "/");
    }

    #[test]
    fn sanitize_next_rejects_empty_and_bare_strings() {
        assert_eq!(sanitize_next(""), "/");
        assert_eq!(sanitize_next("relative/path"), "/");
    }
}
