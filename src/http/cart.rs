use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::error::{done, ok, ApiError, JsonBody, OrSay, Success};
use super::middleware::SessionId;
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 { 1 }

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

pub async fn view(State(s): State<AppState>, SessionId(session): SessionId) -> Result<Json<Success<serde_json::Value>>, ApiError> {
    let cart = s.carts.view(&session).await.or_say("Failed to load cart")?;
    Ok(ok(json!({ "cart": cart })))
}

pub async fn add_item(
    State(s): State<AppState>,
    SessionId(session): SessionId,
    JsonBody(r): JsonBody<AddItemRequest>,
) -> Result<Json<Success<serde_json::Value>>, ApiError> {
    let item = s.carts.add_item(&session, r.product_id, r.quantity).await.or_say("Failed to add item to cart")?;
    Ok(ok(json!({ "item": item })))
}

pub async fn update_item(
    State(s): State<AppState>,
    SessionId(session): SessionId,
    Path(id): Path<Uuid>,
    JsonBody(r): JsonBody<UpdateItemRequest>,
) -> Result<Json<Success<serde_json::Value>>, ApiError> {
    let item = s.carts.update_item_quantity(&session, id, r.quantity).await.or_say("Failed to update cart item")?;
    Ok(ok(json!({ "item": item })))
}

pub async fn remove_item(
    State(s): State<AppState>,
    SessionId(session): SessionId,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    s.carts.remove_item(&session, id).await.or_say("Failed to remove item from cart")?;
    Ok(done())
}
