//! JSON REST endpoints used by client-side pages.

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::admin::ListParams;
use super::error::{ok, ApiError, JsonBody, OrSay};
use super::middleware::{AdminUser, AuthUser};
use super::AppState;
use crate::services::DirectOrder;
use crate::ShopError;

pub async fn categories(State(s): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = s.catalog.list_categories().await.or_say("Failed to fetch categories")?;
    Ok(Json(categories))
}

pub async fn category(State(s): State<AppState>, Path(slug): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let page = s.catalog.category_page(&slug).await.or_say("Failed to fetch category")?;
    Ok(Json(page))
}

pub async fn featured(State(s): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = s.catalog.featured_products().await.or_say("Failed to fetch featured products")?;
    Ok(Json(products))
}

/// Repeated `product_id` parameters; `Query` cannot collect those into a list.
fn product_ids(query: Option<&str>) -> Result<Vec<Uuid>, ShopError> {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "product_id")
        .map(|(_, value)| Uuid::parse_str(value).map_err(|_| ShopError::validation("Invalid product id")))
        .collect()
}

pub async fn products_by_ids(State(s): State<AppState>, RawQuery(query): RawQuery) -> Result<impl IntoResponse, ApiError> {
    let ids = product_ids(query.as_deref())?;
    let products = s.catalog.products_by_ids(&ids).await.or_say("Failed to fetch products")?;
    Ok(Json(products))
}

pub async fn products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<impl IntoResponse, ApiError> {
    let page = s.catalog.list_products(p.page()).await.or_say("Failed to fetch products")?;
    Ok(Json(page))
}

pub async fn product(State(s): State<AppState>, Path(slug): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let product = s.catalog.product_by_slug(&slug).await.or_say("Failed to fetch product")?;
    Ok(Json(product))
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub order_id: Uuid,
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

/// Callers may only order for themselves unless they are admins.
pub async fn place_order(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(order): JsonBody<DirectOrder>,
) -> Result<impl IntoResponse, ApiError> {
    if order.user_id != user.id {
        user.admin()?;
    }
    let order = s.checkout.place_direct_order(order).await.or_say("Failed to create order")?;
    Ok((StatusCode::CREATED, ok(json!({ "order": order }))))
}

pub async fn orders(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<OrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = q.user_id.unwrap_or(user.id);
    if target != user.id {
        user.admin()?;
    }
    let orders = s.account.orders_for_user(target).await.or_say("Failed to fetch orders")?;
    Ok(Json(orders))
}

pub async fn patch_order(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(patch): JsonBody<OrderPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let order = match (patch.status, patch.payment_status) {
        (Some(status), _) => s.admin.set_order_status(&admin, patch.order_id, &status).await,
        (None, Some(payment_status)) => s.admin.set_payment_status(&admin, patch.order_id, &payment_status).await,
        (None, None) => Err(ShopError::validation("Nothing to update")),
    }
    .or_say("Failed to update order")?;
    Ok(ok(json!({ "order": order })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ids_from_repeated_params() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let query = format!("product_id={a}&other=1&product_id={b}");
        assert_eq!(product_ids(Some(&query)).unwrap(), vec![a, b]);
        assert!(product_ids(None).unwrap().is_empty());
        assert!(product_ids(Some("product_id=nope")).is_err());
    }
}
