//! Signed-in customer's own data: order history, profile and address book.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{Order, PostalAddress, User};
use crate::services::auth::{AuthService, CurrentUser, Session};
use crate::store::Store;
use crate::{Result, ShopError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(length(min = 2, max = 255, message = "Name must be 2 to 255 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"), length(max = 255, message = "Email is too long"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressForm {
    #[validate(length(min = 5, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 2, max = 100, message = "City must be 2 to 100 characters"))]
    pub city: String,
    #[validate(length(min = 2, max = 100, message = "State must be 2 to 100 characters"))]
    pub state: String,
    #[validate(length(min = 3, max = 20, message = "Postal code must be 3 to 20 characters"))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 100, message = "Country must be 2 to 100 characters"))]
    pub country: String,
}

impl From<AddressForm> for PostalAddress {
    fn from(f: AddressForm) -> Self {
        Self {
            address: f.address.trim().to_string(),
            city: f.city.trim().to_string(),
            state: f.state.trim().to_string(),
            postal_code: f.postal_code.trim().to_string(),
            country: f.country.trim().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    auth: AuthService,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, auth: AuthService) -> Self { Self { store, auth } }

    /// Newest first.
    pub async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.store.orders_for_user(user_id).await
    }

    /// Changes name and email, then issues a fresh credential carrying them.
    #[instrument(skip(self, form), fields(user_id = %user.id))]
    pub async fn update_profile(&self, user: &CurrentUser, form: ProfileForm) -> Result<Session> {
        form.validate()?;
        let email = form.email.trim().to_lowercase();
        if let Some(existing) = self.store.user_by_email(&email).await? {
            if existing.id != user.id {
                return Err(ShopError::DuplicateUser);
            }
        }
        let updated = self
            .store
            .update_profile(user.id, form.name.trim(), &email)
            .await?
            .ok_or(ShopError::NotFound("User"))?;
        info!("profile updated");
        self.auth.issue(&CurrentUser::from(&updated))
    }

    #[instrument(skip(self, form), fields(user_id = %user.id))]
    pub async fn update_address(&self, user: &CurrentUser, form: AddressForm) -> Result<User> {
        form.validate()?;
        self.store
            .update_address(user.id, &PostalAddress::from(form))
            .await?
            .ok_or(ShopError::NotFound("User"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::tests::service;
    use crate::services::{fixtures, RegisterForm};

    async fn signed_up(auth: &AuthService, email: &str) -> Session {
        auth.register(RegisterForm { name: "Grace".into(), email: email.into(), password: "hunter22".into() })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_profile_update_reissues_credential() {
        let store = fixtures::store();
        let auth = service(store.clone());
        let account = AccountService::new(store.clone(), auth.clone());
        let session = signed_up(&auth, "grace@example.com").await;

        let form = ProfileForm { name: "Grace Hopper".into(), email: "Hopper@Example.com".into() };
        let renewed = account.update_profile(&session.user, form).await.unwrap();
        assert_eq!(renewed.user.email, "hopper@example.com");
        let verified = auth.verify(&renewed.token).unwrap();
        assert_eq!(verified.name, "Grace Hopper");
        assert_eq!(verified.id, session.user.id);
    }

    #[tokio::test]
    async fn test_profile_email_must_be_free() {
        let store = fixtures::store();
        let auth = service(store.clone());
        let account = AccountService::new(store.clone(), auth.clone());
        signed_up(&auth, "taken@example.com").await;
        let me = signed_up(&auth, "me@example.com").await;

        let form = ProfileForm { name: "Me Myself".into(), email: "taken@example.com".into() };
        assert!(matches!(account.update_profile(&me.user, form).await, Err(ShopError::DuplicateUser)));
    }

    #[tokio::test]
    async fn test_address_update() {
        let store = fixtures::store();
        let auth = service(store.clone());
        let account = AccountService::new(store.clone(), auth.clone());
        let me = signed_up(&auth, "me@example.com").await;

        let form = AddressForm {
            address: " 1 Infinite Loop ".into(), city: "Cupertino".into(), state: "CA".into(),
            postal_code: "95014".into(), country: "US".into(),
        };
        let user = account.update_address(&me.user, form).await.unwrap();
        assert_eq!(user.address.as_deref(), Some("1 Infinite Loop"));
        assert_eq!(user.postal_code.as_deref(), Some("95014"));
        assert!(account.orders_for_user(me.user.id).await.unwrap().is_empty());

        let oversized = AddressForm {
            address: "1 Infinite Loop".into(), city: "Cupertino".into(), state: "CA".into(),
            postal_code: "9".repeat(21), country: "US".into(),
        };
        match account.update_address(&me.user, oversized).await {
            Err(ShopError::Validation(msg)) => assert_eq!(msg, "Postal code must be 3 to 20 characters"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
