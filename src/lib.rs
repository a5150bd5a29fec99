//! Storefront
//!
//! Session-cart storefront with checkout and an admin back-office.
//!
//! ## Features
//! - Category and product browsing
//! - Session cart with merge-by-product semantics
//! - Checkout with card (payment intent) or cash on delivery
//! - Password login with a signed, time-limited credential
//! - Admin management of products, categories and order statuses

pub mod config;
pub mod domain;
pub mod http;
pub mod payment;
pub mod services;
pub mod store;

use thiserror::Error;
use validator::ValidationErrors;

pub use payment::GatewayError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    /// Malformed input, shown to the user verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    DuplicateUser,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Your cart is empty")]
    EmptyCart,

    /// Referential integrity refusal, e.g. deleting a category that still has products.
    #[error("{0}")]
    Constraint(String),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Errors whose message is safe and useful to show to the caller as-is.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Internal(_) | Self::Gateway(_))
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<ValidationErrors> for ShopError {
    /// Keeps the message of the first failing field, ordered by field name.
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors.field_errors();
        let mut names: Vec<_> = fields.keys().copied().collect();
        names.sort_unstable();
        let message = names
            .into_iter()
            .flat_map(|name| fields[name].iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid input".to_string());
        Self::Validation(message)
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
