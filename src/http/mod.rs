//! HTTP surface: axum router, request context middleware and handlers.

pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod middleware;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::events::EventPublisher;
use crate::payment::PaymentGateway;
use crate::services::{AccountService, AdminService, AuthService, CartManager, CatalogService, CheckoutOrchestrator};
use crate::store::Store;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub carts: CartManager,
    pub checkout: CheckoutOrchestrator,
    pub auth: AuthService,
    pub account: AccountService,
    pub admin: AdminService,
    /// Adds the `Secure` attribute to every cookie set.
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        events: EventPublisher,
        auth: AuthService,
        secure_cookies: bool,
    ) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            carts: CartManager::new(store.clone()),
            checkout: CheckoutOrchestrator::new(store.clone(), gateway, events.clone()),
            account: AccountService::new(store.clone(), auth.clone()),
            admin: AdminService::new(store, events),
            auth,
            secure_cookies,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/products", get(admin::list_products).post(admin::create_product))
        .route("/products/:id", get(admin::get_product).put(admin::update_product).delete(admin::delete_product))
        .route("/categories", get(admin::list_categories).post(admin::create_category))
        .route("/categories/:id", get(admin::get_category).put(admin::update_category).delete(admin::delete_category))
        .route("/orders", get(admin::list_orders))
        .route("/orders/:id", get(admin::get_order))
        .route("/orders/:id/status", put(admin::set_order_status))
        .route("/orders/:id/payment-status", put(admin::set_payment_status))
        .route_layer(axum::middleware::from_fn(middleware::require_admin));

    let api_routes = Router::new()
        .route("/categories", get(api::categories))
        .route("/categories/:slug", get(api::category))
        .route("/featured", get(api::featured))
        .route("/product", get(api::products_by_ids))
        .route("/products", get(api::products))
        .route("/products/:slug", get(api::product))
        .route("/order", get(api::orders).post(api::place_order).patch(api::patch_order));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/cart", get(cart::view))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:id", axum::routing::patch(cart::update_item).delete(cart::remove_item))
        .route("/checkout", get(checkout::view).post(checkout::checkout))
        .route("/checkout/:order_id/complete", post(checkout::complete))
        .route("/order-confirmation/:order_id", get(checkout::confirmation))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/account/orders", get(auth::orders))
        .route("/account/profile", put(auth::update_profile))
        .route("/account/address", put(auth::update_address))
        .nest("/admin", admin_routes)
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::session))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::identify))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
