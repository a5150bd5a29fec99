//! Back-office handlers. Mounted behind [`super::middleware::require_admin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::error::{done, ok, ApiError, JsonBody, OrSay};
use super::middleware::AdminUser;
use super::AppState;
use crate::domain::{CategoryInput, ProductInput};
use crate::store::Page;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> Page { Page::new(self.page, self.per_page) }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    #[serde(rename = "paymentStatus", alias = "payment_status", alias = "status")]
    pub payment_status: String,
}

// ============================================================================
// Products
// ============================================================================

pub async fn list_products(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(p): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = s.admin.list_products(&admin, p.page()).await.or_say("Failed to load products")?;
    Ok(ok(page))
}

pub async fn get_product(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let product = s.admin.product(&admin, id).await.or_say("Failed to load product")?;
    Ok(ok(json!({ "product": product })))
}

pub async fn create_product(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = s.admin.create_product(&admin, input).await.or_say("Failed to create product")?;
    Ok((StatusCode::CREATED, ok(json!({ "product": product }))))
}

pub async fn update_product(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = s.admin.update_product(&admin, id, input).await.or_say("Failed to update product")?;
    Ok(ok(json!({ "product": product })))
}

pub async fn delete_product(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    s.admin.delete_product(&admin, id).await.or_say("Failed to delete product")?;
    Ok(done())
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(State(s): State<AppState>, AdminUser(admin): AdminUser) -> Result<impl IntoResponse, ApiError> {
    let categories = s.admin.list_categories(&admin).await.or_say("Failed to load categories")?;
    Ok(ok(json!({ "categories": categories })))
}

pub async fn get_category(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let category = s.admin.category(&admin, id).await.or_say("Failed to load category")?;
    Ok(ok(json!({ "category": category })))
}

pub async fn create_category(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = s.admin.create_category(&admin, input).await.or_say("Failed to create category")?;
    Ok((StatusCode::CREATED, ok(json!({ "category": category }))))
}

pub async fn update_category(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = s.admin.update_category(&admin, id, input).await.or_say("Failed to update category")?;
    Ok(ok(json!({ "category": category })))
}

pub async fn delete_category(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    s.admin.delete_category(&admin, id).await.or_say("Failed to delete category")?;
    Ok(done())
}

// ============================================================================
// Orders
// ============================================================================

pub async fn list_orders(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(p): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = s.admin.list_orders(&admin, p.page()).await.or_say("Failed to load orders")?;
    Ok(ok(page))
}

pub async fn get_order(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let order = s.admin.order(&admin, id).await.or_say("Failed to load order")?;
    Ok(ok(json!({ "order": order })))
}

pub async fn set_order_status(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    JsonBody(r): JsonBody<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = s.admin.set_order_status(&admin, id, &r.status).await.or_say("Failed to update order status")?;
    Ok(ok(json!({ "order": order })))
}

pub async fn set_payment_status(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    JsonBody(r): JsonBody<PaymentStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = s
        .admin
        .set_payment_status(&admin, id, &r.payment_status)
        .await
        .or_say("Failed to update payment status")?;
    Ok(ok(json!({ "order": order })))
}
