// Path: crates/http-api/src/session.rs
//! Resolving the current user from a request's session cookie (spec §4.5
//! "Resolving the user from a request"), plus the double-submit CSRF check
//! required on mutating requests (spec §6).

use crate::error::ApiError;
use crate::state::AppState;
use ackify_types::domain::session::Identity;
use ackify_types::error::CoreError;
use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRef, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const SESSION_COOKIE: &str = "ackify_session";
pub const CSRF_COOKIE: &str = "ackify_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The authenticated caller, resolved from the session cookie plus a live
/// server-side session row. Use as an extractor on any handler that
/// requires a session; rejects with `UNAUTHORIZED` when absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// As [`CurrentUser`], but absent cookies/sessions resolve to `None`
/// instead of rejecting (spec §4.5: "the request is anonymous").
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

/// A [`CurrentUser`] whose email is a member of `ADMIN_EMAILS`
/// (SPEC_FULL.md §C "Admin capability surface"). Rejects with `FORBIDDEN`
/// for an authenticated non-admin, `UNAUTHORIZED` for an anonymous caller.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

async fn resolve(parts: &Parts, state: &AppState) -> Option<Identity> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie_value = jar.get(SESSION_COOKIE)?.value().to_string();
    let (session_id, identity) = ackify_identity::session::decode_cookie(&state.config.cookie_secret_b64, &cookie_value)?;
    match state.sessions.get(&session_id).await {
        Ok(Some(_)) => Some(identity),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(MaybeUser(resolve(parts, &app_state).await))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match resolve(parts, &app_state).await {
            Some(identity) => Ok(CurrentUser(identity)),
            None => Err(ApiError::from(CoreError::Unauthorized)),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match resolve(parts, &app_state).await {
            Some(identity) if app_state.is_admin(&identity.email) => Ok(AdminUser(identity)),
            Some(_) => Err(ApiError::from(CoreError::Forbidden)),
            None => Err(ApiError::from(CoreError::Unauthorized)),
        }
    }
}

/// Builds the pair of cookies issued at login: the HTTPOnly, encrypted
/// session cookie and a readable sibling CSRF token cookie for the
/// double-submit check (spec §6 "`X-CSRF-Token` required on mutating
/// requests" — the spec names the header; the paired cookie is the
/// standard double-submit mechanism that makes it meaningful).
pub fn login_cookies(state: &AppState, session_id: &str, identity: &Identity) -> Result<(Cookie<'static>, Cookie<'static>), CoreError> {
    let session_value = ackify_identity::session::encode_cookie(&state.config.cookie_secret_b64, session_id, identity)?;
    let csrf_token = new_csrf_token();

    let secure = state.config.is_https();
    let session_cookie = Cookie::build((SESSION_COOKIE, session_value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(30))
        .build();
    let csrf_cookie = Cookie::build((CSRF_COOKIE, csrf_token))
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(30))
        .build();

    Ok((session_cookie, csrf_cookie))
}

pub fn logout_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let session_cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let csrf_cookie = Cookie::build((CSRF_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    (session_cookie, csrf_cookie)
}

fn new_csrf_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Rejects mutating requests whose `X-CSRF-Token` header doesn't match the
/// readable CSRF cookie (double-submit pattern). GET/HEAD/OPTIONS pass
/// through untouched, as does anything under `/api/v1/auth` — those
/// endpoints are how a session (and its CSRF cookie) comes to exist in the
/// first place, so no double-submit pair can be required of them yet.
pub async fn csrf_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let is_mutating = matches!(
        req.method().as_str(),
        "POST" | "PUT" | "PATCH" | "DELETE"
    );
    let is_auth_endpoint = req.uri().path().starts_with("/api/v1/auth");
    if !is_mutating || is_auth_endpoint {
        return Ok(next.run(req).await);
    }

    let jar = CookieJar::from_headers(req.headers());
    let cookie_value = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());
    let header_value = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match (cookie_value, header_value) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header => Ok(next.run(req).await),
        _ => Err(ApiError::from(CoreError::Validation(
            "missing or mismatched X-CSRF-Token".into(),
        ))),
    }
}
