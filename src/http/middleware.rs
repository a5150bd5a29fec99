//! Request context: the anonymous session cookie, the caller's identity and
//! the admin gate.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;
use crate::services::{Admin, CurrentUser};
use crate::ShopError;

pub const SESSION_COOKIE: &str = "sessionId";
pub const AUTH_COOKIE: &str = "auth_token";
const SESSION_MAX_AGE: i64 = 30 * 24 * 60 * 60;
const SESSION_ID_MAX_LEN: usize = 64;

// ============================================================================
// Cookies
// ============================================================================

/// Value of the named cookie across all `Cookie` headers.
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn set_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn auth_cookie(token: &str, max_age: i64, secure: bool) -> String { set_cookie(AUTH_COOKIE, token, max_age, secure) }
pub fn clear_auth_cookie(secure: bool) -> String { set_cookie(AUTH_COOKIE, "", 0, secure) }

fn append_cookie(response: &mut Response, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

// ============================================================================
// Session
// ============================================================================

#[derive(Clone, Debug)]
pub struct SessionId(pub String);

/// Session ids are short tokens; anything else is replaced with a fresh one.
fn valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= SESSION_ID_MAX_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Ensures every request carries a cart session id, issuing one when absent
/// or malformed.
pub async fn session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let existing = cookie(request.headers(), SESSION_COOKIE).filter(|id| valid_session_id(id));
    let fresh = existing.is_none();
    let id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());
    request.extensions_mut().insert(SessionId(id.clone()));

    let mut response = next.run(request).await;
    if fresh {
        append_cookie(&mut response, &set_cookie(SESSION_COOKIE, &id, SESSION_MAX_AGE, state.secure_cookies));
    }
    response
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| ShopError::Internal("session middleware is not installed".into()).into())
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The verified caller, or `None` for anonymous requests.
#[derive(Clone, Debug, Default)]
pub struct Identity(pub Option<CurrentUser>);

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Resolves the caller from a bearer token or the `auth_token` cookie. An
/// invalid cookie leaves the caller anonymous and is cleared on the response.
pub async fn identify(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let from_cookie = cookie(request.headers(), AUTH_COOKIE).filter(|t| !t.is_empty());
    let token = bearer_token(request.headers()).or_else(|| from_cookie.clone());

    let mut stale_cookie = false;
    let user = match token {
        Some(token) => match state.auth.verify(&token) {
            Ok(user) => Some(user),
            Err(_) => {
                tracing::debug!("discarding invalid credential");
                stale_cookie = from_cookie.as_deref() == Some(token.as_str());
                None
            }
        },
        None => None,
    };
    request.extensions_mut().insert(Identity(user));

    let mut response = next.run(request).await;
    if stale_cookie && !sets_cookie(&response, AUTH_COOKIE) {
        append_cookie(&mut response, &clear_auth_cookie(state.secure_cookies));
    }
    response
}

/// Admin router gate: 401 for anonymous callers, 403 for non-admins.
pub async fn require_admin(mut request: Request, next: Next) -> Response {
    let identity = request.extensions().get::<Identity>().cloned().unwrap_or_default();
    let admin = match identity.0 {
        Some(user) => user.admin(),
        None => Err(ShopError::Unauthorized),
    };
    match admin {
        Ok(admin) => {
            request.extensions_mut().insert(admin);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Signed-in caller; rejects anonymous requests with 401.
pub struct AuthUser(pub CurrentUser);

/// Signed-in caller, if any.
pub struct MaybeUser(pub Option<CurrentUser>);

/// Admin capability, granted by [`require_admin`] or derived from the identity.
pub struct AdminUser(pub Admin);

fn identity(parts: &Parts) -> Option<CurrentUser> {
    parts.extensions.get::<Identity>().and_then(|i| i.0.clone())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity(parts).map(AuthUser).ok_or_else(|| ShopError::Unauthorized.into())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(identity(parts)))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(admin) = parts.extensions.get::<Admin>() {
            return Ok(AdminUser(admin.clone()));
        }
        let user = identity(parts).ok_or(ShopError::Unauthorized)?;
        Ok(AdminUser(user.admin()?))
    }
}
