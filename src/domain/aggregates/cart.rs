//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cart per session, created lazily on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// At most one row per (cart_id, product_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart item joined with the product data needed to price and display it.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    /// Effective product price at the time the cart was read.
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub total: Decimal,
}

impl CartView {
    pub fn new(cart_id: Uuid, items: Vec<CartLine>) -> Self {
        let total = items.iter().map(CartLine::line_total).sum();
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();
        Self { cart_id, items, item_count, total }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}
