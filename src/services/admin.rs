//! Back-office catalog and order management.
//!
//! Every operation takes an [`Admin`], which can only be obtained from a
//! verified credential with the admin flag set.

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::events::{CatalogEvent, DomainEvent, EventPublisher, OrderEvent};
use crate::domain::{
    Category, CategoryInput, Order, OrderDetail, OrderStatus, PaymentStatus, Product, ProductInput, ProductListing,
};
use crate::services::auth::Admin;
use crate::store::{Page, Paginated, Store};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
    events: EventPublisher,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self { Self { store, events } }

    // ============================================================================
    // Products
    // ============================================================================

    pub async fn list_products(&self, _admin: &Admin, page: Page) -> Result<Paginated<ProductListing>> {
        let data = self.store.list_products(page).await?;
        let total = self.store.count_products().await?;
        Ok(Paginated { data, total, page: page.page })
    }

    pub async fn product(&self, _admin: &Admin, id: Uuid) -> Result<Product> {
        self.store.product_by_id(id).await?.ok_or(ShopError::NotFound("Product"))
    }

    #[instrument(skip_all, fields(admin = %admin.user().id))]
    pub async fn create_product(&self, admin: &Admin, input: ProductInput) -> Result<Product> {
        let input = input.normalize()?;
        self.require_category(input.category_id).await?;
        let product = self.store.insert_product(&input).await?;
        info!(product_id = %product.id, slug = %product.slug, "product created");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::ProductCreated { product_id: product.id })).await;
        Ok(product)
    }

    #[instrument(skip(self, admin, input), fields(admin = %admin.user().id))]
    pub async fn update_product(&self, admin: &Admin, id: Uuid, input: ProductInput) -> Result<Product> {
        let input = input.normalize()?;
        self.require_category(input.category_id).await?;
        let product = self.store.update_product(id, &input).await?.ok_or(ShopError::NotFound("Product"))?;
        self.events.publish(DomainEvent::Catalog(CatalogEvent::ProductUpdated { product_id: id })).await;
        Ok(product)
    }

    #[instrument(skip(self, admin), fields(admin = %admin.user().id))]
    pub async fn delete_product(&self, admin: &Admin, id: Uuid) -> Result<()> {
        if !self.store.delete_product(id).await? {
            return Err(ShopError::NotFound("Product"));
        }
        info!(product_id = %id, "product deleted");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::ProductDeleted { product_id: id })).await;
        Ok(())
    }

    async fn require_category(&self, id: Uuid) -> Result<()> {
        match self.store.category_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(ShopError::validation("Category does not exist")),
        }
    }

    // ============================================================================
    // Categories
    // ============================================================================

    pub async fn list_categories(&self, _admin: &Admin) -> Result<Vec<Category>> {
        self.store.list_categories().await
    }

    pub async fn category(&self, _admin: &Admin, id: Uuid) -> Result<Category> {
        self.store.category_by_id(id).await?.ok_or(ShopError::NotFound("Category"))
    }

    #[instrument(skip_all, fields(admin = %admin.user().id))]
    pub async fn create_category(&self, admin: &Admin, input: CategoryInput) -> Result<Category> {
        let input = input.normalize()?;
        let category = self.store.insert_category(&input).await?;
        info!(category_id = %category.id, slug = %category.slug, "category created");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::CategoryCreated { category_id: category.id })).await;
        Ok(category)
    }

    #[instrument(skip(self, admin, input), fields(admin = %admin.user().id))]
    pub async fn update_category(&self, admin: &Admin, id: Uuid, input: CategoryInput) -> Result<Category> {
        let input = input.normalize()?;
        let category = self.store.update_category(id, &input).await?.ok_or(ShopError::NotFound("Category"))?;
        self.events.publish(DomainEvent::Catalog(CatalogEvent::CategoryUpdated { category_id: id })).await;
        Ok(category)
    }

    /// Refused while any product still belongs to the category.
    #[instrument(skip(self, admin), fields(admin = %admin.user().id))]
    pub async fn delete_category(&self, admin: &Admin, id: Uuid) -> Result<()> {
        if self.store.count_products_in_category(id).await? > 0 {
            return Err(ShopError::Constraint("Cannot delete category with products".into()));
        }
        if !self.store.delete_category(id).await? {
            return Err(ShopError::NotFound("Category"));
        }
        info!(category_id = %id, "category deleted");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::CategoryDeleted { category_id: id })).await;
        Ok(())
    }

    // ============================================================================
    // Orders
    // ============================================================================

    pub async fn list_orders(&self, _admin: &Admin, page: Page) -> Result<Paginated<Order>> {
        let data = self.store.list_orders(page).await?;
        let total = self.store.count_orders().await?;
        Ok(Paginated { data, total, page: page.page })
    }

    pub async fn order(&self, _admin: &Admin, id: Uuid) -> Result<OrderDetail> {
        let order = self.store.order_by_id(id).await?.ok_or(ShopError::NotFound("Order"))?;
        let items = self.store.order_lines(id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Accepts any status name; transitions are not restricted.
    #[instrument(skip(self, admin), fields(admin = %admin.user().id))]
    pub async fn set_order_status(&self, admin: &Admin, id: Uuid, status: &str) -> Result<Order> {
        let status: OrderStatus = status.parse().map_err(|_| ShopError::validation("Invalid order status"))?;
        let order = self.store.set_order_status(id, status).await?.ok_or(ShopError::NotFound("Order"))?;
        info!(order_id = %id, %status, "order status changed");
        self.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, status })).await;
        Ok(order)
    }

    #[instrument(skip(self, admin), fields(admin = %admin.user().id))]
    pub async fn set_payment_status(&self, admin: &Admin, id: Uuid, status: &str) -> Result<Order> {
        let status: PaymentStatus = status.parse().map_err(|_| ShopError::validation("Invalid payment status"))?;
        let order = self.store.set_payment_status(id, status).await?.ok_or(ShopError::NotFound("Order"))?;
        info!(order_id = %id, payment_status = %status, "payment status changed");
        self.events
            .publish(DomainEvent::Order(OrderEvent::PaymentStatusChanged { order_id: id, payment_status: status }))
            .await;
        Ok(order)
    }
}
