use argon2::{Algorithm, Argon2, Params, Version};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront::domain::events::EventPublisher;
use storefront::domain::{CategoryInput, Product, ProductInput};
use storefront::http::{router, AppState};
use storefront::services::{AuthService, AuthSettings, CurrentUser};
use storefront::store::{CatalogStore, MemoryStore};

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    auth: AuthService,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }

    /// `name=value` pair of a cookie set by this reply.
    fn cookie_pair(&self, name: &str) -> String {
        let cookie = self.set_cookie(name).unwrap();
        cookie.split(';').next().unwrap().to_string()
    }
}

fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::new(1024, 1, 1, None).unwrap());
    let auth = AuthService::new(store.clone(), AuthSettings::new("integration-secret")).with_hasher(hasher);
    let state = AppState::new(store.clone(), None, EventPublisher::disabled(), auth.clone(), false);
    TestApp { app: router(state), store, auth }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, cookies: &[&str], body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        Reply { status, headers, body }
    }

    async fn seed_product(&self, price: rust_decimal::Decimal) -> Product {
        let category = self
            .store
            .insert_category(&CategoryInput { name: "Hats".into(), slug: Some("hats".into()), description: None, image_url: None })
            .await
            .unwrap();
        let input = ProductInput {
            name: "Cap".into(), slug: Some("cap".into()), description: String::new(), price, sale_price: None,
            stock_quantity: 5, category_id: category.id, featured: true, image_url: None,
        };
        self.store.insert_product(&input).await.unwrap()
    }

    /// Registers a user and returns the `auth_token=...` cookie pair.
    async fn register(&self, email: &str) -> (Uuid, String) {
        let reply = self
            .send(Method::POST, "/auth/register", &[], Some(json!({ "name": "Ada", "email": email, "password": "hunter22" })))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let id = reply.body["user"]["id"].as_str().unwrap().parse().unwrap();
        (id, reply.cookie_pair("auth_token"))
    }

    async fn login(&self, email: &str) -> String {
        let reply = self
            .send(Method::POST, "/auth/login", &[], Some(json!({ "email": email, "password": "hunter22" })))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.cookie_pair("auth_token")
    }
}

fn checkout_form(method: &str) -> Value {
    json!({
        "name": "Ada Lovelace", "email": "ada@example.com", "address": "12 Analytical Way",
        "city": "London", "state": "LDN", "postalCode": "N1 9GU", "country": "UK",
        "phone": "0207 123456", "paymentMethod": method,
    })
}

#[tokio::test]
async fn health_check() {
    let app = spawn_app();
    let reply = app.send(Method::GET, "/health", &[], None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "status": "healthy", "service": "storefront" }));
}

#[tokio::test]
async fn cart_then_cash_checkout() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(17.50)).await;

    let first = app.send(Method::GET, "/cart", &[], None).await;
    assert_eq!(first.status, StatusCode::OK);
    let session = first.cookie_pair("sessionId");

    let add = json!({ "productId": cap.id, "quantity": 2 });
    let reply = app.send(Method::POST, "/cart/items", &[&session], Some(add)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert!(reply.set_cookie("sessionId").is_none());

    let cart = app.send(Method::GET, "/cart", &[&session], None).await;
    assert_eq!(cart.body["cart"]["total"], "35.00");

    let reply = app.send(Method::POST, "/checkout", &[&session], Some(checkout_form("cash"))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["paymentMethod"], "cash");
    let order_id = reply.body["orderId"].as_str().unwrap().to_string();

    let done = app.send(Method::POST, &format!("/checkout/{order_id}/complete"), &[&session], None).await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["redirect"], format!("/order-confirmation/{order_id}"));
    let cart = app.send(Method::GET, "/cart", &[&session], None).await;
    assert_eq!(cart.body["cart"]["items"], json!([]));

    let confirmation = app.send(Method::GET, done.body["redirect"].as_str().unwrap(), &[], None).await;
    assert_eq!(confirmation.status, StatusCode::OK);
    assert_eq!(confirmation.body["order"]["id"], order_id.as_str());
    assert_eq!(confirmation.body["order"]["total_amount"], "35.00");
    assert_eq!(confirmation.body["order"]["items"][0]["name"], "Cap");
    assert_eq!(confirmation.body["order"]["items"][0]["slug"], "cap");
    assert_eq!(confirmation.body["order"]["items"][0]["quantity"], 2);

    let missing = app.send(Method::GET, &format!("/order-confirmation/{}", Uuid::now_v7()), &[], None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_order_confirmation_is_private() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(10.00)).await;
    let (_, owner) = app.register("owner@example.com").await;
    let (_, other) = app.register("other@example.com").await;
    let session = "sessionId=owner-session";
    app.send(Method::POST, "/cart/items", &[session, &owner], Some(json!({ "productId": cap.id }))).await;

    let placed = app.send(Method::POST, "/checkout", &[session, &owner], Some(checkout_form("cash"))).await;
    assert_eq!(placed.status, StatusCode::OK);
    let uri = format!("/order-confirmation/{}", placed.body["orderId"].as_str().unwrap());

    assert_eq!(app.send(Method::GET, &uri, &[&owner], None).await.status, StatusCode::OK);
    assert_eq!(app.send(Method::GET, &uri, &[&other], None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.send(Method::GET, &uri, &[], None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn checkout_page_reports_card_availability() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(4.00)).await;
    let session = "sessionId=checkout-page";
    app.send(Method::POST, "/cart/items", &[session], Some(json!({ "productId": cap.id, "quantity": 3 }))).await;

    let page = app.send(Method::GET, "/checkout", &[session], None).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["cardPaymentsEnabled"], false);
    assert_eq!(page.body["cart"]["total"], "12.00");
}

#[tokio::test]
async fn repeat_add_is_capped() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(1.00)).await;
    let session = "sessionId=bulk-buyer";
    let max = app.send(Method::POST, "/cart/items", &[session], Some(json!({ "productId": cap.id, "quantity": 9999 }))).await;
    assert_eq!(max.status, StatusCode::OK);

    let over = app.send(Method::POST, "/cart/items", &[session], Some(json!({ "productId": cap.id, "quantity": 1 }))).await;
    assert_eq!(over.status, StatusCode::BAD_REQUEST);
    assert_eq!(over.body["error"], "Quantity cannot exceed 9999");

    let huge = app.send(Method::POST, "/cart/items", &[session], Some(json!({ "productId": cap.id, "quantity": i32::MAX }))).await;
    assert_eq!(huge.status, StatusCode::BAD_REQUEST);
    let cart = app.send(Method::GET, "/cart", &[session], None).await;
    assert_eq!(cart.body["cart"]["items"][0]["quantity"], 9999);
}

#[tokio::test]
async fn oversized_session_cookie_is_replaced() {
    let app = spawn_app();
    let oversized = format!("sessionId={}", "x".repeat(300));
    let reply = app.send(Method::GET, "/cart", &[&oversized], None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let fresh = reply.cookie_pair("sessionId");
    assert_ne!(fresh, oversized);
    assert!(Uuid::parse_str(fresh.trim_start_matches("sessionId=")).is_ok());
}

#[tokio::test]
async fn checkout_store_failure_uses_fallback_message() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(10.00)).await;
    // Signed credential for an account that was never stored: the order's
    // user reference cannot be satisfied.
    let ghost = CurrentUser { id: Uuid::now_v7(), name: "Ghost".into(), email: "ghost@example.com".into(), is_admin: false };
    let credential = format!("auth_token={}", app.auth.issue(&ghost).unwrap().token);
    let session = "sessionId=ghost-session";
    app.send(Method::POST, "/cart/items", &[session], Some(json!({ "productId": cap.id }))).await;

    let reply = app.send(Method::POST, "/checkout", &[session, &credential], Some(checkout_form("cash"))).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, json!({ "success": false, "error": "Failed to create checkout session" }));
}

#[tokio::test]
async fn card_checkout_without_gateway_falls_back() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(10.00)).await;
    let session = "sessionId=fixed-session";
    app.send(Method::POST, "/cart/items", &[session], Some(json!({ "productId": cap.id }))).await;

    let reply = app.send(Method::POST, "/checkout", &[session], Some(checkout_form("card"))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["paymentMethod"], "cash");
    assert_eq!(reply.body["paymentUnavailable"], true);
    assert_eq!(
        reply.body["message"],
        "Card payment is currently unavailable. Proceeding with cash on delivery."
    );
}

#[tokio::test]
async fn empty_cart_checkout_is_rejected() {
    let app = spawn_app();
    let reply = app.send(Method::POST, "/checkout", &["sessionId=empty"], Some(checkout_form("cash"))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body, json!({ "success": false, "error": "Your cart is empty" }));
}

#[tokio::test]
async fn malformed_body_uses_error_shape() {
    let app = spawn_app();
    let reply = app.send(Method::POST, "/cart/items", &[], Some(json!({ "quantity": 1 }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], false);
    assert!(reply.body["error"].is_string());
}

#[tokio::test]
async fn login_sets_cookie_and_me_resolves_user() {
    let app = spawn_app();
    app.register("ada@example.com").await;

    let wrong = app
        .send(Method::POST, "/auth/login", &[], Some(json!({ "email": "ada@example.com", "password": "nope!!" })))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid email or password");

    let login = app.send(Method::POST, "/auth/login", &[], Some(json!({ "email": "ADA@example.com", "password": "hunter22" }))).await;
    let cookie = login.set_cookie("auth_token").unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));

    let pair = login.cookie_pair("auth_token");
    let me = app.send(Method::GET, "/auth/me", &[&pair], None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "ada@example.com");
    assert_eq!(me.body["user"]["isAdmin"], false);

    let logout = app.send(Method::POST, "/auth/logout", &[&pair], None).await;
    assert!(logout.set_cookie("auth_token").unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn invalid_credential_is_anonymous_and_cleared() {
    let app = spawn_app();
    let reply = app.send(Method::GET, "/auth/me", &["auth_token=not.a.jwt"], None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Authentication required");
    assert!(reply.set_cookie("auth_token").unwrap().starts_with("auth_token=;"));
}

#[tokio::test]
async fn admin_routes_are_gated() {
    let app = spawn_app();
    let anonymous = app.send(Method::GET, "/admin/products", &[], None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let (user_id, customer) = app.register("root@example.com").await;
    let forbidden = app.send(Method::GET, "/admin/products", &[&customer], None).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["error"], "Admin access required");

    assert!(app.store.promote_to_admin(user_id).await);
    let admin = app.login("root@example.com").await;

    let created = app
        .send(Method::POST, "/admin/categories", &[&admin], Some(json!({ "name": "Summer Hats" })))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["category"]["slug"], "summer-hats");
    let category_id = created.body["category"]["id"].as_str().unwrap().to_string();

    let bad = json!({ "name": "Straw Hat", "price": "10.00", "sale_price": "12.00", "category_id": category_id });
    let reply = app.send(Method::POST, "/admin/products", &[&admin], Some(bad)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let good = json!({ "name": "Straw Hat", "price": "10.00", "stock_quantity": 3, "category_id": category_id });
    let reply = app.send(Method::POST, "/admin/products", &[&admin], Some(good)).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let blocked = app.send(Method::DELETE, &format!("/admin/categories/{category_id}"), &[&admin], None).await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);
    assert_eq!(blocked.body["error"], "Cannot delete category with products");

    let listed = app.send(Method::GET, "/admin/products", &[&admin], None).await;
    assert_eq!(listed.body["total"], 1);

    let public = app.send(Method::GET, "/api/categories/summer-hats", &[], None).await;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(public.body["products"][0]["slug"], "straw-hat");
}

#[tokio::test]
async fn orders_api_is_scoped_to_caller() {
    let app = spawn_app();
    let cap = app.seed_product(dec!(10.00)).await;
    let (me, cookie) = app.register("me@example.com").await;
    let (other, _) = app.register("other@example.com").await;

    let order = json!({
        "userId": me, "paymentMethod": "cash", "shippingAddress": "1 Main St", "contactPhone": "555-0100",
        "cartItems": [{ "productId": cap.id, "quantity": 3, "price": "0.01" }],
    });
    let placed = app.send(Method::POST, "/api/order", &[&cookie], Some(order)).await;
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(placed.body["order"]["total_amount"], "30.00");

    let mine = app.send(Method::GET, "/api/order", &[&cookie], None).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    let theirs = app.send(Method::GET, &format!("/api/order?userId={other}"), &[&cookie], None).await;
    assert_eq!(theirs.status, StatusCode::FORBIDDEN);

    let anonymous = app.send(Method::GET, "/api/order", &[], None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
