//! Persistence seam.
//!
//! Services never touch SQL directly: they receive an `Arc<dyn Store>` built
//! once at startup. [`PgStore`] is the Postgres adapter, [`MemoryStore`] an
//! in-process implementation for tests and local experiments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Cart, CartItem, CartLine, Category, CategoryInput, NewOrder, NewOrderItem, NewUser, Order, OrderLine,
    OrderStatus, PaymentStatus, PostalAddress, Product, ProductInput, ProductListing, User,
};
use crate::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Pagination window, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 { i64::from(self.per_page) }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }
}

impl Default for Page {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn category_by_id(&self, id: Uuid) -> Result<Option<Category>>;
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn insert_category(&self, input: &CategoryInput) -> Result<Category>;
    async fn update_category(&self, id: Uuid, input: &CategoryInput) -> Result<Option<Category>>;
    /// Refused with `Constraint` while products reference the category.
    async fn delete_category(&self, id: Uuid) -> Result<bool>;
    async fn count_products_in_category(&self, id: Uuid) -> Result<i64>;

    async fn list_products(&self, page: Page) -> Result<Vec<ProductListing>>;
    async fn count_products(&self) -> Result<i64>;
    /// Newest featured products first.
    async fn featured_products(&self, limit: i64) -> Result<Vec<ProductListing>>;
    /// Ordered by product name.
    async fn products_in_category(&self, category_id: Uuid) -> Result<Vec<ProductListing>>;
    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>>;
    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductListing>>;
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductListing>>;
    async fn insert_product(&self, input: &ProductInput) -> Result<Product>;
    async fn update_product(&self, id: Uuid, input: &ProductInput) -> Result<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the session's cart, creating it on first access.
    async fn get_or_create_cart(&self, session_id: &str) -> Result<Cart>;
    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>>;
    /// Inserts the item or increments the existing row's quantity, atomically.
    async fn upsert_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem>;
    async fn set_cart_item_quantity(&self, cart_id: Uuid, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>>;
    async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool>;
    async fn clear_cart(&self, cart_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order and all of its items in one transaction.
    async fn insert_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order>;
    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>>;
    /// Items of an order with product name, slug and image.
    async fn order_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>>;
    async fn list_orders(&self, page: Page) -> Result<Vec<Order>>;
    async fn count_orders(&self) -> Result<i64>;
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>>;
    async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<Option<Order>>;
    async fn record_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<Option<Order>>;
    /// Switches a card order to cash on delivery with a pending payment.
    async fn fall_back_to_cash(&self, id: Uuid) -> Result<Option<Order>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `DuplicateUser` when the email is taken.
    async fn insert_user(&self, user: &NewUser) -> Result<User>;
    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> Result<Option<User>>;
    async fn update_address(&self, id: Uuid, address: &PostalAddress) -> Result<Option<User>>;
}

pub trait Store: CatalogStore + CartStore + OrderStore + UserStore {}

impl<T> Store for T where T: CatalogStore + CartStore + OrderStore + UserStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let p = Page::new(Some(0), Some(500));
        assert_eq!((p.page, p.per_page), (1, 100));
        assert_eq!(p.offset(), 0);
        let p = Page::new(Some(3), None);
        assert_eq!((p.limit(), p.offset()), (20, 40));
    }
}
