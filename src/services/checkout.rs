//! Checkout: turns the session cart into a persisted order and, for card
//! payments, a payment intent.
//!
//! The order and its items are written in one transaction. When card payment
//! is chosen but the gateway is missing or fails, the order is switched to
//! cash on delivery and the checkout still succeeds with an explanatory
//! message.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{DomainEvent, EventPublisher, OrderEvent};
use crate::domain::value_objects::{line_total, Money};
use crate::domain::{CartLine, NewOrder, NewOrderItem, Order, OrderDetail, PaymentMethod, PaymentStatus};
use crate::payment::{GatewayError, IntentStatus, PaymentGateway};
use crate::services::{cart::check_quantity, CurrentUser};
use crate::store::Store;
use crate::{Result, ShopError};

pub const CURRENCY: &str = "usd";

const CARD_UNAVAILABLE: &str = "Card payment is currently unavailable. Proceeding with cash on delivery.";
const CARD_FAILED: &str = "There was an error processing your card payment. Proceeding with cash on delivery.";

/// Width of the `contact_phone` column.
const MAX_PHONE_LEN: usize = 20;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(length(min = 2, max = 255, message = "Name must be 2 to 255 characters"))]
    pub name: String,
    #[validate(email(message = "Valid email is required"), length(max = 255, message = "Email is too long"))]
    pub email: String,
    #[validate(length(min = 5, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 2, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 2, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 3, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 2, message = "Country is required"))]
    pub country: String,
    #[validate(length(min = 5, max = 20, message = "Phone number must be 5 to 20 characters"))]
    pub phone: String,
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    pub fn shipping_address(&self) -> String {
        format!("{}, {}, {} {}, {}", self.address, self.city, self.state, self.postal_code, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub order_id: Uuid,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Set when card payment was requested but the order fell back to cash.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub payment_unavailable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
    pub cleared_items: u64,
    pub redirect: String,
}

/// Order placed through the JSON API with an explicit item list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrder {
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub contact_phone: String,
    #[serde(alias = "cartItems")]
    pub items: Vec<DirectOrderItem>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct CheckoutOrchestrator {
    store: Arc<dyn Store>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    events: EventPublisher,
}

impl CheckoutOrchestrator {
    pub fn new(store: Arc<dyn Store>, gateway: Option<Arc<dyn PaymentGateway>>, events: EventPublisher) -> Self {
        Self { store, gateway, events }
    }

    pub fn card_payments_enabled(&self) -> bool { self.gateway.is_some() }

    #[instrument(skip(self, form), fields(payment_method = %form.payment_method))]
    pub async fn checkout(&self, session_id: &str, user_id: Option<Uuid>, form: CheckoutForm) -> Result<CheckoutOutcome> {
        let cart = self.store.get_or_create_cart(session_id).await?;
        let lines = self.store.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        form.validate()?;

        let total = line_total(lines.iter().map(|l| (l.unit_price, l.quantity)));
        let new_order = NewOrder {
            user_id,
            total_amount: total,
            payment_method: form.payment_method,
            contact_name: form.name.trim().to_string(),
            contact_email: form.email.trim().to_string(),
            shipping_address: form.shipping_address(),
            contact_phone: form.phone.trim().to_string(),
        };
        let order = self.store.insert_order(&new_order, &snapshot(&lines)).await?;
        info!(order_id = %order.id, %total, items = lines.len(), "order placed");
        self.publish_placed(&order).await;

        match order.payment_method {
            PaymentMethod::Cash => Ok(CheckoutOutcome {
                order_id: order.id,
                payment_method: PaymentMethod::Cash,
                client_secret: None,
                payment_unavailable: false,
                message: None,
            }),
            PaymentMethod::Card => self.start_card_payment(&order).await,
        }
    }

    async fn start_card_payment(&self, order: &Order) -> Result<CheckoutOutcome> {
        let intent = match &self.gateway {
            Some(gateway) => gateway.create_intent(&Money::new(order.total_amount, CURRENCY)).await,
            None => Err(GatewayError::NotConfigured),
        };
        match intent {
            Ok(intent) => {
                self.store.record_payment_intent(order.id, &intent.id).await?;
                Ok(CheckoutOutcome {
                    order_id: order.id,
                    payment_method: PaymentMethod::Card,
                    client_secret: intent.client_secret,
                    payment_unavailable: false,
                    message: None,
                })
            }
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "card payment unavailable, falling back to cash");
                self.store.fall_back_to_cash(order.id).await?.ok_or(ShopError::NotFound("Order"))?;
                self.events
                    .publish(DomainEvent::Order(OrderEvent::PaymentFellBack { order_id: order.id, reason: e.to_string() }))
                    .await;
                let message = match e {
                    GatewayError::NotConfigured => CARD_UNAVAILABLE,
                    _ => CARD_FAILED,
                };
                Ok(CheckoutOutcome {
                    order_id: order.id,
                    payment_method: PaymentMethod::Cash,
                    client_secret: None,
                    payment_unavailable: true,
                    message: Some(message.to_string()),
                })
            }
        }
    }

    /// Reconciles the payment state of a card order, then empties the
    /// session's cart. The whole cart is cleared, not only the ordered items.
    #[instrument(skip(self))]
    pub async fn complete_order(&self, session_id: &str, order_id: Uuid) -> Result<Completion> {
        let order = self.store.order_by_id(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        let payment_status = self.reconcile_payment(&order).await?;

        let cart = self.store.get_or_create_cart(session_id).await?;
        let cleared_items = self.store.clear_cart(cart.id).await?;
        info!(%order_id, cleared_items, "order completed");
        Ok(Completion {
            order_id,
            payment_status,
            cleared_items,
            redirect: format!("/order-confirmation/{order_id}"),
        })
    }

    async fn reconcile_payment(&self, order: &Order) -> Result<PaymentStatus> {
        let (Some(gateway), Some(intent_id)) = (&self.gateway, &order.payment_intent_id) else {
            return Ok(order.payment_status);
        };
        if order.payment_status.is_settled() {
            return Ok(order.payment_status);
        }
        let intent = match gateway.retrieve_intent(intent_id).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "could not retrieve payment intent");
                return Ok(order.payment_status);
            }
        };
        let status = match intent.status {
            IntentStatus::Succeeded => PaymentStatus::Paid,
            IntentStatus::Canceled | IntentStatus::RequiresPaymentMethod => PaymentStatus::Failed,
            _ => return Ok(order.payment_status),
        };
        self.store.set_payment_status(order.id, status).await?;
        self.events
            .publish(DomainEvent::Order(OrderEvent::PaymentStatusChanged { order_id: order.id, payment_status: status }))
            .await;
        Ok(status)
    }

    /// Places an order from an explicit item list. Prices are taken from the
    /// catalog at call time, never from the caller.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn place_direct_order(&self, request: DirectOrder) -> Result<Order> {
        if request.items.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        if request.shipping_address.trim().is_empty() || request.contact_phone.trim().is_empty() {
            return Err(ShopError::validation("Missing required fields"));
        }
        if request.contact_phone.trim().chars().count() > MAX_PHONE_LEN {
            return Err(ShopError::validation("Phone number is too long"));
        }
        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            check_quantity(item.quantity)?;
            let product = self
                .store
                .product_by_id(item.product_id)
                .await?
                .ok_or_else(|| ShopError::validation("Order references an unknown product"))?;
            items.push(NewOrderItem { product_id: product.id, quantity: item.quantity, price: product.effective_price() });
        }
        let user = self.store.user_by_id(request.user_id).await?.ok_or(ShopError::NotFound("User"))?;
        let total = line_total(items.iter().map(|i| (i.price, i.quantity)));
        let new_order = NewOrder {
            user_id: Some(user.id),
            total_amount: total,
            payment_method: request.payment_method,
            contact_name: user.name,
            contact_email: user.email,
            shipping_address: request.shipping_address.trim().to_string(),
            contact_phone: request.contact_phone.trim().to_string(),
        };
        let order = self.store.insert_order(&new_order, &items).await?;
        info!(order_id = %order.id, %total, "order placed via api");
        self.publish_placed(&order).await;
        Ok(order)
    }

    /// Order and its items for the confirmation page. Guest orders are
    /// readable by id; an account's order only by its owner or an admin.
    pub async fn confirmation(&self, order_id: Uuid, viewer: Option<&CurrentUser>) -> Result<OrderDetail> {
        let order = self.store.order_by_id(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        if let Some(owner) = order.user_id {
            if !viewer.is_some_and(|v| v.id == owner || v.is_admin) {
                return Err(ShopError::NotFound("Order"));
            }
        }
        let items = self.store.order_lines(order_id).await?;
        Ok(OrderDetail { order, items })
    }

    async fn publish_placed(&self, order: &Order) {
        self.events
            .publish(DomainEvent::Order(OrderEvent::Placed {
                order_id: order.id,
                user_id: order.user_id,
                total: order.total_amount,
                payment_method: order.payment_method,
            }))
            .await;
    }
}

/// Copies each line's current effective price into an order item.
fn snapshot(lines: &[CartLine]) -> Vec<NewOrderItem> {
    lines
        .iter()
        .map(|l| NewOrderItem { product_id: l.product_id, quantity: l.quantity, price: l.unit_price })
        .collect()
}
