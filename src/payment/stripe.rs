//! Stripe payment intents over the REST API.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::{GatewayError, PaymentGateway, PaymentIntent};
use crate::domain::value_objects::Money;

#[derive(Clone)]
pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway").field("api_base", &self.api_base).finish_non_exhaustive()
    }
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent, GatewayError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Stripe API error: {}", body);
            return Err(GatewayError::Rejected(format!("{status}: {body}")));
        }
        response.json::<PaymentIntent>().await.map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, amount), fields(amount = %amount))]
    async fn create_intent(&self, amount: &Money) -> Result<PaymentIntent, GatewayError> {
        let minor = amount
            .minor_units()
            .ok_or_else(|| GatewayError::Rejected(format!("amount {amount} out of range")))?;
        let params = [
            ("amount", minor.to_string()),
            ("currency", amount.currency().to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let intent = Self::read_intent(response).await?;
        info!(intent_id = %intent.id, "payment intent created");
        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::read_intent(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::IntentStatus;

    #[test]
    fn test_intent_decoding() {
        let body = r#"{"id":"pi_123","object":"payment_intent","amount":3500,"currency":"usd",
            "client_secret":"pi_123_secret_abc","status":"requires_payment_method","livemode":false}"#;
        let intent: PaymentIntent = serde_json::from_str(body).unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.amount, 3500);
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let body = r#"{"id":"pi_1","amount":1,"currency":"usd","client_secret":null,"status":"brand_new_state"}"#;
        let intent: PaymentIntent = serde_json::from_str(body).unwrap();
        assert_eq!(intent.status, IntentStatus::Unknown);
    }

    #[test]
    fn test_debug_hides_secret() {
        let gateway = StripeGateway::new("sk_test_secret", "https://api.stripe.com/");
        let shown = format!("{gateway:?}");
        assert!(!shown.contains("sk_test_secret"));
        assert!(shown.contains("https://api.stripe.com"));
    }
}
