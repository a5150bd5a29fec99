//! Credential and account actions.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::error::{ok, ApiError, JsonBody, OrSay};
use super::middleware::{auth_cookie, clear_auth_cookie, AuthUser};
use super::AppState;
use crate::services::{AddressForm, LoginForm, ProfileForm, RegisterForm, Session};

fn signed_in(s: &AppState, status: StatusCode, session: Session) -> Response {
    let cookie = auth_cookie(&session.token, s.auth.token_ttl().num_seconds(), s.secure_cookies);
    (status, [(SET_COOKIE, cookie)], ok(json!({ "user": session.user, "expiresAt": session.expires_at }))).into_response()
}

pub async fn register(State(s): State<AppState>, JsonBody(form): JsonBody<RegisterForm>) -> Result<Response, ApiError> {
    let session = s.auth.register(form).await.or_say("Registration failed. Please try again.")?;
    Ok(signed_in(&s, StatusCode::CREATED, session))
}

pub async fn login(State(s): State<AppState>, JsonBody(form): JsonBody<LoginForm>) -> Result<Response, ApiError> {
    let session = s.auth.login(form).await.or_say("Login failed. Please try again.")?;
    Ok(signed_in(&s, StatusCode::OK, session))
}

pub async fn logout(State(s): State<AppState>) -> Response {
    ([(SET_COOKIE, clear_auth_cookie(s.secure_cookies))], Json(json!({ "success": true }))).into_response()
}

pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    ok(json!({ "user": user }))
}

pub async fn orders(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<impl IntoResponse, ApiError> {
    let orders = s.account.orders_for_user(user.id).await.or_say("Failed to load orders")?;
    Ok(ok(json!({ "orders": orders })))
}

pub async fn update_profile(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(form): JsonBody<ProfileForm>,
) -> Result<Response, ApiError> {
    let session = s.account.update_profile(&user, form).await.or_say("Failed to update profile")?;
    Ok(signed_in(&s, StatusCode::OK, session))
}

pub async fn update_address(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(form): JsonBody<AddressForm>,
) -> Result<impl IntoResponse, ApiError> {
    let user = s.account.update_address(&user, form).await.or_say("Failed to update address")?;
    Ok(ok(json!({ "user": user })))
}
