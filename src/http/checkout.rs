use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use super::error::{ok, ApiError, JsonBody, OrSay, Success};
use super::middleware::{MaybeUser, SessionId};
use super::AppState;
use crate::services::{CheckoutForm, CheckoutOutcome, Completion};

/// Cart summary for the checkout page, with whether card payment can be offered.
pub async fn view(State(s): State<AppState>, SessionId(session): SessionId) -> Result<Json<Success<serde_json::Value>>, ApiError> {
    let cart = s.carts.view(&session).await.or_say("Failed to load cart")?;
    Ok(ok(json!({ "cardPaymentsEnabled": s.checkout.card_payments_enabled(), "cart": cart })))
}

pub async fn checkout(
    State(s): State<AppState>,
    SessionId(session): SessionId,
    MaybeUser(user): MaybeUser,
    JsonBody(form): JsonBody<CheckoutForm>,
) -> Result<Json<Success<CheckoutOutcome>>, ApiError> {
    let outcome = s
        .checkout
        .checkout(&session, user.map(|u| u.id), form)
        .await
        .or_say("Failed to create checkout session")?;
    Ok(ok(outcome))
}

pub async fn complete(
    State(s): State<AppState>,
    SessionId(session): SessionId,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Success<Completion>>, ApiError> {
    let completion = s.checkout.complete_order(&session, order_id).await.or_say("Failed to complete order")?;
    Ok(ok(completion))
}

pub async fn confirmation(
    State(s): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Success<serde_json::Value>>, ApiError> {
    let detail = s.checkout.confirmation(order_id, user.as_ref()).await.or_say("Failed to load order")?;
    Ok(ok(json!({ "order": detail })))
}
