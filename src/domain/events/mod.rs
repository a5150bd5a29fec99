//! Domain events and their best-effort publisher.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Catalog(CatalogEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Option<Uuid>, total: Decimal, payment_method: PaymentMethod },
    PaymentFellBack { order_id: Uuid, reason: String },
    StatusChanged { order_id: Uuid, status: OrderStatus },
    PaymentStatusChanged { order_id: Uuid, payment_status: PaymentStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    ProductCreated { product_id: Uuid },
    ProductUpdated { product_id: Uuid },
    ProductDeleted { product_id: Uuid },
    CategoryCreated { category_id: Uuid },
    CategoryUpdated { category_id: Uuid },
    CategoryDeleted { category_id: Uuid },
}

impl DomainEvent {
    /// NATS subject, e.g. `storefront.order.placed`.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::PaymentFellBack { .. } => "payment_fell_back",
                OrderEvent::StatusChanged { .. } => "status_changed",
                OrderEvent::PaymentStatusChanged { .. } => "payment_status_changed",
            }),
            Self::Catalog(e) => match e {
                CatalogEvent::ProductCreated { .. } => ("product", "created"),
                CatalogEvent::ProductUpdated { .. } => ("product", "updated"),
                CatalogEvent::ProductDeleted { .. } => ("product", "deleted"),
                CatalogEvent::CategoryCreated { .. } => ("category", "created"),
                CatalogEvent::CategoryUpdated { .. } => ("category", "updated"),
                CatalogEvent::CategoryDeleted { .. } => ("category", "deleted"),
            },
        };
        format!("storefront.{aggregate}.{name}")
    }
}

/// Publishes domain events to NATS when a client is configured. Failures are
/// logged and swallowed; an event never fails the action that raised it.
#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }
    pub fn disabled() -> Self { Self::default() }
    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.nats else {
            tracing::debug!(subject = %event.subject(), "event publishing disabled");
            return;
        };
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "failed to encode domain event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "failed to publish domain event");
        }
    }
}
