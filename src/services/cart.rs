//! Session cart management.

use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{Cart, CartItem, CartView};
use crate::store::Store;
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct CartManager {
    store: Arc<dyn Store>,
}

/// Largest quantity a single cart or order line may hold.
pub const MAX_QUANTITY: i32 = 9999;

pub(crate) fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(ShopError::validation("Quantity must be at least 1"));
    }
    if quantity > MAX_QUANTITY {
        return Err(ShopError::validation(format!("Quantity cannot exceed {MAX_QUANTITY}")));
    }
    Ok(())
}

impl CartManager {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// The session's cart, created on first use.
    pub async fn get_or_create_cart(&self, session_id: &str) -> Result<Cart> {
        self.store.get_or_create_cart(session_id).await
    }

    pub async fn view(&self, session_id: &str) -> Result<CartView> {
        let cart = self.get_or_create_cart(session_id).await?;
        let lines = self.store.cart_lines(cart.id).await?;
        Ok(CartView::new(cart.id, lines))
    }

    /// Adds `quantity` of a product, merging into the existing row for that product.
    #[instrument(skip(self))]
    pub async fn add_item(&self, session_id: &str, product_id: Uuid, quantity: i32) -> Result<CartItem> {
        check_quantity(quantity)?;
        let cart = self.get_or_create_cart(session_id).await?;
        let held = self
            .store
            .cart_lines(cart.id)
            .await?
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity);
        check_quantity(held.saturating_add(quantity))?;
        let item = self.store.upsert_cart_item(cart.id, product_id, quantity).await?;
        debug!(item_id = %item.id, quantity = item.quantity, "cart item saved");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn update_item_quantity(&self, session_id: &str, item_id: Uuid, quantity: i32) -> Result<CartItem> {
        check_quantity(quantity)?;
        let cart = self.get_or_create_cart(session_id).await?;
        self.store
            .set_cart_item_quantity(cart.id, item_id, quantity)
            .await?
            .ok_or(ShopError::NotFound("Cart item"))
    }

    /// Removing an item that is not in the cart is not an error.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, session_id: &str, item_id: Uuid) -> Result<()> {
        let cart = self.get_or_create_cart(session_id).await?;
        if !self.store.delete_cart_item(cart.id, item_id).await? {
            debug!("cart item already absent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_repeat_add_merges_quantities() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let cap = fixtures::product(&store, &hats, "cap", dec!(10.00), None).await;
        let carts = CartManager::new(store.clone());

        carts.add_item("s1", cap.id, 2).await.unwrap();
        carts.add_item("s1", cap.id, 3).await.unwrap();

        let view = carts.view("s1").await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.total, dec!(50.00));
    }

    #[tokio::test]
    async fn test_sale_price_is_effective_price() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let beret = fixtures::product(&store, &hats, "beret", dec!(20.00), Some(dec!(15.00))).await;
        let carts = CartManager::new(store.clone());
        carts.add_item("s1", beret.id, 1).await.unwrap();
        assert_eq!(carts.view("s1").await.unwrap().items[0].unit_price, dec!(15.00));
    }

    #[tokio::test]
    async fn test_carts_are_per_session() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let cap = fixtures::product(&store, &hats, "cap", dec!(10.00), None).await;
        let carts = CartManager::new(store.clone());
        let item = carts.add_item("s1", cap.id, 1).await.unwrap();

        assert!(carts.view("s2").await.unwrap().is_empty());
        assert!(matches!(carts.update_item_quantity("s2", item.id, 4).await, Err(ShopError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_overwrites_quantity() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let cap = fixtures::product(&store, &hats, "cap", dec!(10.00), None).await;
        let carts = CartManager::new(store.clone());
        let item = carts.add_item("s1", cap.id, 3).await.unwrap();

        let updated = carts.update_item_quantity("s1", item.id, 1).await.unwrap();
        assert_eq!(updated.quantity, 1);
        assert!(matches!(carts.update_item_quantity("s1", item.id, 0).await, Err(ShopError::Validation(_))));
        assert!(matches!(carts.update_item_quantity("s1", Uuid::now_v7(), 2).await, Err(ShopError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let cap = fixtures::product(&store, &hats, "cap", dec!(10.00), None).await;
        let beret = fixtures::product(&store, &hats, "beret", dec!(12.00), None).await;
        let carts = CartManager::new(store.clone());
        let item = carts.add_item("s1", cap.id, 1).await.unwrap();
        carts.add_item("s1", beret.id, 1).await.unwrap();

        carts.remove_item("s1", item.id).await.unwrap();
        carts.remove_item("s1", item.id).await.unwrap();
        carts.remove_item("s1", Uuid::now_v7()).await.unwrap();

        let view = carts.view("s1").await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, beret.id);
    }

    #[tokio::test]
    async fn test_quantity_is_capped_across_repeat_adds() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let cap = fixtures::product(&store, &hats, "cap", dec!(10.00), None).await;
        let carts = CartManager::new(store.clone());

        assert!(matches!(carts.add_item("s1", cap.id, i32::MAX).await, Err(ShopError::Validation(_))));
        carts.add_item("s1", cap.id, MAX_QUANTITY).await.unwrap();
        match carts.add_item("s1", cap.id, 1).await {
            Err(ShopError::Validation(msg)) => assert_eq!(msg, "Quantity cannot exceed 9999"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(carts.view("s1").await.unwrap().items[0].quantity, MAX_QUANTITY);

        let item_id = carts.view("s1").await.unwrap().items[0].id;
        assert!(matches!(carts.update_item_quantity("s1", item_id, MAX_QUANTITY + 1).await, Err(ShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_product_is_store_error() {
        let carts = CartManager::new(fixtures::store());
        assert!(matches!(carts.add_item("s1", Uuid::now_v7(), 1).await, Err(ShopError::Store(_))));
    }
}
