//! Postgres adapter over a shared `PgPool`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CartStore, CatalogStore, OrderStore, Page, UserStore};
use crate::domain::{
    Cart, CartItem, CartLine, Category, CategoryInput, NewOrder, NewOrderItem, NewUser, Order, OrderLine,
    OrderStatus, PaymentMethod, PaymentStatus, PostalAddress, Product, ProductInput, ProductListing, User,
};
use crate::{Result, ShopError};

const LISTING: &str = "SELECT p.*, c.name AS category_name, c.slug AS category_slug \
                       FROM products p JOIN categories c ON p.category_id = c.id";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn slug_conflict(e: sqlx::Error, what: &str) -> ShopError {
    if is_unique_violation(&e) {
        ShopError::Constraint(format!("A {what} with this slug already exists"))
    } else if is_foreign_key_violation(&e) {
        ShopError::validation("Category does not exist")
    } else {
        e.into()
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name").fetch_all(&self.pool).await?)
    }

    async fn category_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1").bind(slug).fetch_optional(&self.pool).await?)
    }

    async fn insert_category(&self, r: &CategoryInput) -> Result<Category> {
        sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, slug, description, image_url, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING *")
            .bind(Uuid::now_v7()).bind(&r.name).bind(r.slug()).bind(&r.description).bind(&r.image_url)
            .fetch_one(&self.pool).await.map_err(|e| slug_conflict(e, "category"))
    }

    async fn update_category(&self, id: Uuid, r: &CategoryInput) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>("UPDATE categories SET name = $2, slug = $3, description = $4, image_url = $5, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(&r.name).bind(r.slug()).bind(&r.description).bind(&r.image_url)
            .fetch_optional(&self.pool).await.map_err(|e| slug_conflict(e, "category"))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await.map_err(|e| {
            if is_foreign_key_violation(&e) { ShopError::Constraint("Cannot delete category with products".into()) } else { e.into() }
        })?;
        Ok(done.rows_affected() > 0)
    }

    async fn count_products_in_category(&self, id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1").bind(id).fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    async fn list_products(&self, page: Page) -> Result<Vec<ProductListing>> {
        Ok(sqlx::query_as::<_, ProductListing>(&format!("{LISTING} ORDER BY p.created_at DESC LIMIT $1 OFFSET $2"))
            .bind(page.limit()).bind(page.offset()).fetch_all(&self.pool).await?)
    }

    async fn count_products(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    async fn featured_products(&self, limit: i64) -> Result<Vec<ProductListing>> {
        Ok(sqlx::query_as::<_, ProductListing>(&format!("{LISTING} WHERE p.featured = TRUE ORDER BY p.created_at DESC LIMIT $1"))
            .bind(limit).fetch_all(&self.pool).await?)
    }

    async fn products_in_category(&self, category_id: Uuid) -> Result<Vec<ProductListing>> {
        Ok(sqlx::query_as::<_, ProductListing>(&format!("{LISTING} WHERE p.category_id = $1 ORDER BY p.name"))
            .bind(category_id).fetch_all(&self.pool).await?)
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductListing>> {
        Ok(sqlx::query_as::<_, ProductListing>(&format!("{LISTING} WHERE p.slug = $1")).bind(slug).fetch_optional(&self.pool).await?)
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductListing>> {
        Ok(sqlx::query_as::<_, ProductListing>(&format!("{LISTING} WHERE p.id = ANY($1) ORDER BY p.name"))
            .bind(ids).fetch_all(&self.pool).await?)
    }

    async fn insert_product(&self, r: &ProductInput) -> Result<Product> {
        sqlx::query_as::<_, Product>("INSERT INTO products (id, name, slug, description, price, sale_price, stock_quantity, category_id, featured, image_url, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW()) RETURNING *")
            .bind(Uuid::now_v7()).bind(&r.name).bind(r.slug()).bind(&r.description).bind(r.price).bind(r.sale_price)
            .bind(r.stock_quantity).bind(r.category_id).bind(r.featured).bind(&r.image_url)
            .fetch_one(&self.pool).await.map_err(|e| slug_conflict(e, "product"))
    }

    async fn update_product(&self, id: Uuid, r: &ProductInput) -> Result<Option<Product>> {
        sqlx::query_as::<_, Product>("UPDATE products SET name = $2, slug = $3, description = $4, price = $5, sale_price = $6, stock_quantity = $7, category_id = $8, featured = $9, image_url = $10, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(&r.name).bind(r.slug()).bind(&r.description).bind(r.price).bind(r.sale_price)
            .bind(r.stock_quantity).bind(r.category_id).bind(r.featured).bind(&r.image_url)
            .fetch_optional(&self.pool).await.map_err(|e| slug_conflict(e, "product"))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await.map_err(|e| {
            if is_foreign_key_violation(&e) { ShopError::Constraint("Cannot delete a product that appears in orders".into()) } else { e.into() }
        })?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_or_create_cart(&self, session_id: &str) -> Result<Cart> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        Ok(sqlx::query_as::<_, Cart>("INSERT INTO cart (id, session_id, created_at, updated_at) VALUES ($1, $2, NOW(), NOW()) ON CONFLICT (session_id) DO UPDATE SET session_id = EXCLUDED.session_id RETURNING *")
            .bind(Uuid::now_v7()).bind(session_id).fetch_one(&self.pool).await?)
    }

    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>> {
        Ok(sqlx::query_as::<_, CartLine>("SELECT ci.id, ci.product_id, ci.quantity, p.name, p.slug, p.image_url, COALESCE(p.sale_price, p.price) AS unit_price FROM cart_items ci JOIN products p ON ci.product_id = p.id WHERE ci.cart_id = $1 ORDER BY ci.created_at")
            .bind(cart_id).fetch_all(&self.pool).await?)
    }

    async fn upsert_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
        Ok(sqlx::query_as::<_, CartItem>("INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at, updated_at) VALUES ($1, $2, $3, $4, NOW(), NOW()) ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() RETURNING *")
            .bind(Uuid::now_v7()).bind(cart_id).bind(product_id).bind(quantity)
            .fetch_one(&self.pool).await?)
    }

    async fn set_cart_item_quantity(&self, cart_id: Uuid, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>> {
        Ok(sqlx::query_as::<_, CartItem>("UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE id = $2 AND cart_id = $1 RETURNING *")
            .bind(cart_id).bind(item_id).bind(quantity).fetch_optional(&self.pool).await?)
    }

    async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1").bind(cart_id).bind(item_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn clear_cart(&self, cart_id: Uuid) -> Result<u64> {
        let done = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, o: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let order = sqlx::query_as::<_, Order>("INSERT INTO orders (id, user_id, total_amount, payment_method, payment_status, contact_name, contact_email, shipping_address, contact_phone, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW()) RETURNING *")
            .bind(Uuid::now_v7()).bind(o.user_id).bind(o.total_amount).bind(o.payment_method.as_str())
            .bind(o.payment_method.initial_payment_status().as_str()).bind(&o.contact_name).bind(&o.contact_email)
            .bind(&o.shipping_address).bind(&o.contact_phone).bind(OrderStatus::Pending.as_str())
            .fetch_one(&mut *tx).await?;
        for item in items {
            sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price, created_at) VALUES ($1, $2, $3, $4, $5, NOW())")
                .bind(Uuid::now_v7()).bind(order.id).bind(item.product_id).bind(item.quantity).bind(item.price)
                .execute(&mut *tx).await.map_err(|e| {
                    if is_foreign_key_violation(&e) { ShopError::validation("Order references an unknown product") } else { e.into() }
                })?;
        }
        tx.commit().await?;
        Ok(order)
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn order_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>> {
        Ok(sqlx::query_as::<_, OrderLine>("SELECT oi.id, oi.product_id, oi.quantity, oi.price, p.name, p.slug, p.image_url FROM order_items oi JOIN products p ON oi.product_id = p.id WHERE oi.order_id = $1 ORDER BY oi.created_at, oi.id")
            .bind(order_id).fetch_all(&self.pool).await?)
    }

    async fn list_orders(&self, page: Page) -> Result<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(page.limit()).bind(page.offset()).fetch_all(&self.pool).await?)
    }

    async fn count_orders(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC").bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(status.as_str()).fetch_optional(&self.pool).await?)
    }

    async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(status.as_str()).fetch_optional(&self.pool).await?)
    }

    async fn record_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("UPDATE orders SET payment_intent_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(intent_id).fetch_optional(&self.pool).await?)
    }

    async fn fall_back_to_cash(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("UPDATE orders SET payment_method = $2, payment_status = $3, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(PaymentMethod::Cash.as_str()).bind(PaymentStatus::Pending.as_str())
            .fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(&self.pool).await?)
    }

    async fn insert_user(&self, u: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>("INSERT INTO users (id, name, email, password_hash, is_admin, created_at, updated_at) VALUES ($1, $2, $3, $4, FALSE, NOW(), NOW()) RETURNING *")
            .bind(Uuid::now_v7()).bind(&u.name).bind(&u.email).bind(&u.password_hash)
            .fetch_one(&self.pool).await
            .map_err(|e| if is_unique_violation(&e) { ShopError::DuplicateUser } else { e.into() })
    }

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("UPDATE users SET name = $2, email = $3, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(name).bind(email)
            .fetch_optional(&self.pool).await
            .map_err(|e| if is_unique_violation(&e) { ShopError::DuplicateUser } else { e.into() })
    }

    async fn update_address(&self, id: Uuid, a: &PostalAddress) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("UPDATE users SET address = $2, city = $3, state = $4, postal_code = $5, country = $6, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(&a.address).bind(&a.city).bind(&a.state).bind(&a.postal_code).bind(&a.country)
            .fetch_optional(&self.pool).await?)
    }
}
