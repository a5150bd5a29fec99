//! Payment gateway seam. Card checkout talks to a [`PaymentGateway`]; the
//! production implementation is [`stripe::StripeGateway`].

pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Money;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No gateway credentials are configured for this process.
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected payment gateway response: {0}")]
    Decode(String),
}

/// Client-confirmable handle returned when an intent is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an intent for `amount`, converted to minor currency units.
    async fn create_intent(&self, amount: &Money) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}
