// Path: crates/http-api/src/handlers/auth.rs
//! `/auth/*` (spec §6, §4.4): OAuth delegated authorization, magic-link
//! passwordless login, and logout. The two login methods converge on the
//! same outcome — a server-side [`ackify_identity::SessionStore`] row plus
//! the cookie pair from [`crate::session::login_cookies`].

use crate::session::{login_cookies, logout_cookies};
use crate::state::AppState;
use crate::{error::ApiError, session::SESSION_COOKIE};
use ackify_types::domain::session::Identity;
use ackify_types::error::CoreError;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub redirect: Option<String>,
}

/// `POST /auth/start`.
pub async fn start(
    State(state): State<AppState>,
    Json(body): Json<StartRequest>,
) -> Result<Json<Value>, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| CoreError::Validation("OAuth login is not enabled".into()))?;
    let next = body.redirect.unwrap_or_else(|| "/".to_string());
    let login = oauth.begin(&next);
    Ok(Json(serde_json::json!({ "data": { "authorize_url": login.authorize_url } })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// `GET /auth/callback`.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| CoreError::Validation("OAuth login is not enabled".into()))?;

    let result = oauth.callback(&query.code, &query.state).await?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let session = state
        .sessions
        .put(
            &result.profile.sub,
            &result.profile.email,
            result.profile.name.as_deref(),
            result.refresh_token.as_deref(),
            result.access_token_expires_at,
            user_agent.as_deref(),
            Some(&addr.ip().to_string()),
        )
        .await?;

    let identity = Identity {
        sub: result.profile.sub,
        email: result.profile.email,
        name: result.profile.name,
    };
    let (session_cookie, csrf_cookie) = login_cookies(&state, &session.session_id, &identity)?;

    let jar = CookieJar::new().add(session_cookie).add(csrf_cookie);
    Ok((StatusCode::FOUND, jar, [(axum::http::header::LOCATION, result.next)]).into_response())
}

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
    pub redirect: Option<String>,
}

/// `POST /auth/magic-link/request`. Always answers `202 Accepted` whether or
/// not the limiter admits the request's email/IP pair, so the endpoint
/// cannot be used to enumerate rate-limit state — but a rejected pair
/// enqueues nothing.
pub async fn magic_link_request(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<MagicLinkRequest>,
) -> Result<StatusCode, ApiError> {
    let provider = state
        .magiclink
        .as_ref()
        .ok_or_else(|| CoreError::Validation("magic-link login is not enabled".into()))?;
    let Some(queue) = state.email_queue.as_ref() else {
        return Err(CoreError::Transient("email dispatch is not configured".into()).into());
    };

    let email = body.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(CoreError::Validation("email is not well-formed".into()).into());
    }

    let email_ok = state.rate_limiters.magiclink_email.allow(email.clone());
    let ip_ok = state.rate_limiters.magiclink_ip.allow(addr.ip());
    if !email_ok || !ip_ok {
        return Ok(StatusCode::ACCEPTED);
    }

    let token = provider.request(&email).await?;
    let mut verify_url = format!("{}/auth/magic-link/verify?token={}", state.config.base_url, token);
    if let Some(redirect) = &body.redirect {
        verify_url.push_str("&redirect=");
        verify_url.push_str(&urlencoding_lite(redirect));
    }

    queue
        .enqueue(ackify_types::domain::email::NewEmailJob {
            to_addrs: vec![email.clone()],
            subject: "Your sign-in link".to_string(),
            template: "magic_link".to_string(),
            data: serde_json::json!({ "verify_url": verify_url }),
            reference_type: Some("magic_link".to_string()),
            ..Default::default()
        })
        .await?;

    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct MagicLinkVerifyQuery {
    pub token: String,
    pub redirect: Option<String>,
}

/// `GET /auth/magic-link/verify`.
pub async fn magic_link_verify(
    State(state): State<AppState>,
    Query(query): Query<MagicLinkVerifyQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, ApiError> {
    let provider = state
        .magiclink
        .as_ref()
        .ok_or_else(|| CoreError::Validation("magic-link login is not enabled".into()))?;

    let resolved = provider.consume(&query.token).await?;
    let session = state
        .sessions
        .put(
            &resolved.sub,
            &resolved.email,
            None,
            None,
            None,
            None,
            Some(&addr.ip().to_string()),
        )
        .await?;

    let identity = Identity {
        sub: resolved.sub,
        email: resolved.email,
        name: None,
    };
    let (session_cookie, csrf_cookie) = login_cookies(&state, &session.session_id, &identity)?;
    let jar = CookieJar::new().add(session_cookie).add(csrf_cookie);
    let next = query.redirect.filter(|r| r.starts_with('/') && !r.starts_with("//")).unwrap_or_else(|| "/".to_string());
    Ok((StatusCode::FOUND, jar, [(axum::http::header::LOCATION, next)]).into_response())
}

/// `GET /auth/logout`. Deletes the server-side session row (if any) and
/// clears both cookies regardless, since an absent or already-invalid
/// session is not an error here — logout is idempotent.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some((session_id, _identity)) =
            ackify_identity::session::decode_cookie(&state.config.cookie_secret_b64, cookie.value())
        {
            state.sessions.delete(&session_id).await?;
        }
    }

    let (session_cookie, csrf_cookie) = logout_cookies();
    let jar = CookieJar::new().add(session_cookie).add(csrf_cookie);

    let redirect_url = state
        .config
        .oauth
        .as_ref()
        .and_then(|c| c.logout_url.clone())
        .unwrap_or_else(|| "/".to_string());

    Ok((StatusCode::FOUND, jar, [(axum::http::header::LOCATION, redirect_url)]).into_response())
}

/// Minimal percent-encoding for the one unreserved character class this
/// module needs (a `redirect` path embedded in a query string); not a
/// general-purpose encoder.
fn urlencoding_lite(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
