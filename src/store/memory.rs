//! In-process store with the same constraints as the Postgres schema:
//! unique slugs and emails, one cart per session, one item per
//! (cart, product) and restrictive foreign keys.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartStore, CatalogStore, OrderStore, Page, UserStore};
use crate::domain::{
    Cart, CartItem, CartLine, Category, CategoryInput, NewOrder, NewOrderItem, NewUser, Order, OrderItem, OrderLine,
    OrderStatus, PaymentMethod, PaymentStatus, PostalAddress, Product, ProductInput, ProductListing, User,
};
use crate::{Result, ShopError};

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    users: Vec<User>,
}

impl Tables {
    fn listing(&self, product: &Product) -> Option<ProductListing> {
        let category = self.categories.iter().find(|c| c.id == product.category_id)?;
        Some(ProductListing {
            product: product.clone(),
            category_name: category.name.clone(),
            category_slug: category.slug.clone(),
        })
    }

    fn listings<'a>(&self, products: impl Iterator<Item = &'a Product>) -> Vec<ProductListing> {
        products.filter_map(|p| self.listing(p)).collect()
    }

    fn slug_taken<T>(rows: &[T], slug: &str, except: Option<Uuid>, key: impl Fn(&T) -> (Uuid, &str)) -> bool {
        rows.iter().map(key).any(|(id, s)| s == slug && Some(id) != except)
    }

    fn check_category_exists(&self, id: Uuid) -> Result<()> {
        if self.categories.iter().any(|c| c.id == id) { Ok(()) } else { Err(ShopError::validation("Category does not exist")) }
    }

    fn order_mut(&mut self, id: Uuid) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == id)
    }
}

fn foreign_key(what: &str) -> ShopError {
    ShopError::Store(format!("foreign key violation: unknown {what}"))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Flags a user as administrator; there is no public operation for this.
    pub async fn promote_to_admin(&self, user_id: Uuid) -> bool {
        let mut t = self.tables.write().await;
        match t.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => { user.is_admin = true; true }
            None => false,
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut rows = self.tables.read().await.categories.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn category_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn insert_category(&self, r: &CategoryInput) -> Result<Category> {
        let mut t = self.tables.write().await;
        if Tables::slug_taken(&t.categories, r.slug(), None, |c| (c.id, c.slug.as_str())) {
            return Err(ShopError::Constraint("A category with this slug already exists".into()));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(), name: r.name.clone(), slug: r.slug().to_string(), description: r.description.clone(),
            image_url: r.image_url.clone(), created_at: now, updated_at: now,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, r: &CategoryInput) -> Result<Option<Category>> {
        let mut t = self.tables.write().await;
        if Tables::slug_taken(&t.categories, r.slug(), Some(id), |c| (c.id, c.slug.as_str())) {
            return Err(ShopError::Constraint("A category with this slug already exists".into()));
        }
        Ok(t.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = r.name.clone();
            c.slug = r.slug().to_string();
            c.description = r.description.clone();
            c.image_url = r.image_url.clone();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.products.iter().any(|p| p.category_id == id) {
            return Err(ShopError::Constraint("Cannot delete category with products".into()));
        }
        let before = t.categories.len();
        t.categories.retain(|c| c.id != id);
        Ok(t.categories.len() < before)
    }

    async fn count_products_in_category(&self, id: Uuid) -> Result<i64> {
        Ok(self.tables.read().await.products.iter().filter(|p| p.category_id == id).count() as i64)
    }

    async fn list_products(&self, page: Page) -> Result<Vec<ProductListing>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&Product> = t.products.iter().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(t.listings(rows.into_iter().skip(skip).take(page.per_page as usize)))
    }

    async fn count_products(&self) -> Result<i64> {
        Ok(self.tables.read().await.products.len() as i64)
    }

    async fn featured_products(&self, limit: i64) -> Result<Vec<ProductListing>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&Product> = t.products.iter().filter(|p| p.featured).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(t.listings(rows.into_iter().take(usize::try_from(limit).unwrap_or(0))))
    }

    async fn products_in_category(&self, category_id: Uuid) -> Result<Vec<ProductListing>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&Product> = t.products.iter().filter(|p| p.category_id == category_id).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(t.listings(rows.into_iter()))
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.iter().find(|p| p.id == id).cloned())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductListing>> {
        let t = self.tables.read().await;
        Ok(t.products.iter().find(|p| p.slug == slug).and_then(|p| t.listing(p)))
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductListing>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&Product> = t.products.iter().filter(|p| ids.contains(&p.id)).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(t.listings(rows.into_iter()))
    }

    async fn insert_product(&self, r: &ProductInput) -> Result<Product> {
        let mut t = self.tables.write().await;
        if Tables::slug_taken(&t.products, r.slug(), None, |p| (p.id, p.slug.as_str())) {
            return Err(ShopError::Constraint("A product with this slug already exists".into()));
        }
        t.check_category_exists(r.category_id)?;
        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(), name: r.name.clone(), slug: r.slug().to_string(), description: r.description.clone(),
            price: r.price, sale_price: r.sale_price, stock_quantity: r.stock_quantity, category_id: r.category_id,
            featured: r.featured, image_url: r.image_url.clone(), created_at: now, updated_at: now,
        };
        t.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, r: &ProductInput) -> Result<Option<Product>> {
        let mut t = self.tables.write().await;
        if Tables::slug_taken(&t.products, r.slug(), Some(id), |p| (p.id, p.slug.as_str())) {
            return Err(ShopError::Constraint("A product with this slug already exists".into()));
        }
        t.check_category_exists(r.category_id)?;
        Ok(t.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.name = r.name.clone();
            p.slug = r.slug().to_string();
            p.description = r.description.clone();
            p.price = r.price;
            p.sale_price = r.sale_price;
            p.stock_quantity = r.stock_quantity;
            p.category_id = r.category_id;
            p.featured = r.featured;
            p.image_url = r.image_url.clone();
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.order_items.iter().any(|i| i.product_id == id) {
            return Err(ShopError::Constraint("Cannot delete a product that appears in orders".into()));
        }
        let before = t.products.len();
        t.products.retain(|p| p.id != id);
        t.cart_items.retain(|i| i.product_id != id);
        Ok(t.products.len() < before)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create_cart(&self, session_id: &str) -> Result<Cart> {
        let mut t = self.tables.write().await;
        if let Some(cart) = t.carts.iter().find(|c| c.session_id == session_id) {
            return Ok(cart.clone());
        }
        let now = Utc::now();
        let cart = Cart { id: Uuid::now_v7(), session_id: session_id.to_string(), created_at: now, updated_at: now };
        t.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>> {
        let t = self.tables.read().await;
        Ok(t.cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .filter_map(|i| {
                let p = t.products.iter().find(|p| p.id == i.product_id)?;
                Some(CartLine {
                    id: i.id, product_id: p.id, quantity: i.quantity, name: p.name.clone(), slug: p.slug.clone(),
                    image_url: p.image_url.clone(), unit_price: p.effective_price(),
                })
            })
            .collect())
    }

    async fn upsert_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
        let mut t = self.tables.write().await;
        if !t.carts.iter().any(|c| c.id == cart_id) { return Err(foreign_key("cart")); }
        if !t.products.iter().any(|p| p.id == product_id) { return Err(foreign_key("product")); }
        let now = Utc::now();
        if let Some(item) = t.cart_items.iter_mut().find(|i| i.cart_id == cart_id && i.product_id == product_id) {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| ShopError::validation("Quantity is too large"))?;
            item.updated_at = now;
            return Ok(item.clone());
        }
        let item = CartItem { id: Uuid::now_v7(), cart_id, product_id, quantity, created_at: now, updated_at: now };
        t.cart_items.push(item.clone());
        Ok(item)
    }

    async fn set_cart_item_quantity(&self, cart_id: Uuid, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>> {
        let mut t = self.tables.write().await;
        Ok(t.cart_items.iter_mut().find(|i| i.id == item_id && i.cart_id == cart_id).map(|i| {
            i.quantity = quantity;
            i.updated_at = Utc::now();
            i.clone()
        }))
    }

    async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.cart_items.len();
        t.cart_items.retain(|i| !(i.id == item_id && i.cart_id == cart_id));
        Ok(t.cart_items.len() < before)
    }

    async fn clear_cart(&self, cart_id: Uuid) -> Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.cart_items.len();
        t.cart_items.retain(|i| i.cart_id != cart_id);
        Ok((before - t.cart_items.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, o: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
        let mut t = self.tables.write().await;
        // Validate everything first so a failure leaves no partial rows behind.
        if let Some(user_id) = o.user_id {
            if !t.users.iter().any(|u| u.id == user_id) { return Err(foreign_key("user")); }
        }
        if items.iter().any(|i| !t.products.iter().any(|p| p.id == i.product_id)) {
            return Err(ShopError::validation("Order references an unknown product"));
        }
        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(), user_id: o.user_id, total_amount: o.total_amount, payment_method: o.payment_method,
            payment_status: o.payment_method.initial_payment_status(), payment_intent_id: None,
            contact_name: o.contact_name.clone(), contact_email: o.contact_email.clone(),
            shipping_address: o.shipping_address.clone(), contact_phone: o.contact_phone.clone(),
            status: OrderStatus::Pending, created_at: now, updated_at: now,
        };
        let rows: Vec<OrderItem> = items
            .iter()
            .map(|i| OrderItem { id: Uuid::now_v7(), order_id: order.id, product_id: i.product_id, quantity: i.quantity, price: i.price, created_at: now })
            .collect();
        t.orders.push(order.clone());
        t.order_items.extend(rows);
        Ok(order)
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>> {
        let t = self.tables.read().await;
        Ok(t.order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .filter_map(|i| {
                let p = t.products.iter().find(|p| p.id == i.product_id)?;
                Some(OrderLine {
                    id: i.id, product_id: p.id, quantity: i.quantity, price: i.price, name: p.name.clone(),
                    slug: p.slug.clone(), image_url: p.image_url.clone(),
                })
            })
            .collect())
    }

    async fn list_orders(&self, page: Page) -> Result<Vec<Order>> {
        let t = self.tables.read().await;
        let mut rows = t.orders.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(skip).take(page.per_page as usize).collect())
    }

    async fn count_orders(&self) -> Result<i64> {
        Ok(self.tables.read().await.orders.len() as i64)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Order> = t.orders.iter().filter(|o| o.user_id == Some(user_id)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
        let mut t = self.tables.write().await;
        Ok(t.order_mut(id).map(|o| { o.status = status; o.updated_at = Utc::now(); o.clone() }))
    }

    async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<Option<Order>> {
        let mut t = self.tables.write().await;
        Ok(t.order_mut(id).map(|o| { o.payment_status = status; o.updated_at = Utc::now(); o.clone() }))
    }

    async fn record_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<Option<Order>> {
        let mut t = self.tables.write().await;
        Ok(t.order_mut(id).map(|o| { o.payment_intent_id = Some(intent_id.to_string()); o.updated_at = Utc::now(); o.clone() }))
    }

    async fn fall_back_to_cash(&self, id: Uuid) -> Result<Option<Order>> {
        let mut t = self.tables.write().await;
        Ok(t.order_mut(id).map(|o| {
            o.payment_method = PaymentMethod::Cash;
            o.payment_status = PaymentStatus::Pending;
            o.updated_at = Utc::now();
            o.clone()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, u: &NewUser) -> Result<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|x| x.email == u.email) {
            return Err(ShopError::DuplicateUser);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(), name: u.name.clone(), email: u.email.clone(), password_hash: u.password_hash.clone(),
            is_admin: false, address: None, city: None, state: None, postal_code: None, country: None,
            created_at: now, updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> Result<Option<User>> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|x| x.email == email && x.id != id) {
            return Err(ShopError::DuplicateUser);
        }
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.name = name.to_string();
            u.email = email.to_string();
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn update_address(&self, id: Uuid, a: &PostalAddress) -> Result<Option<User>> {
        let mut t = self.tables.write().await;
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.address = Some(a.address.clone());
            u.city = Some(a.city.clone());
            u.state = Some(a.state.clone());
            u.postal_code = Some(a.postal_code.clone());
            u.country = Some(a.country.clone());
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}
