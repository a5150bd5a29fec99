//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::Slug;
use crate::ShopError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub category_id: Uuid,
    pub featured: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a customer pays: the sale price when one is set.
    pub fn effective_price(&self) -> Decimal { self.sale_price.unwrap_or(self.price) }
}

/// Product joined with its category, as shown on listing pages.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub category_slug: String,
}

/// Admin form for creating or replacing a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
    pub category_id: Uuid,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    #[validate(length(max = 512, message = "Image URL is too long"))]
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Validates the form and returns it with a normalised slug.
    pub fn normalize(mut self) -> Result<Self, ShopError> {
        self.validate()?;
        if self.price <= Decimal::ZERO {
            return Err(ShopError::validation("Price must be greater than zero"));
        }
        if let Some(sale) = self.sale_price {
            if sale <= Decimal::ZERO {
                return Err(ShopError::validation("Sale price must be greater than zero"));
            }
            if sale >= self.price {
                return Err(ShopError::validation("Sale price must be lower than the regular price"));
            }
        }
        let slug = match self.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Slug::new(raw),
            None => Slug::from_name(&self.name),
        }
        .map_err(|e| ShopError::validation(e.to_string()))?;
        self.slug = Some(slug.into_inner());
        self.image_url = self.image_url.filter(|u| !u.trim().is_empty());
        Ok(self)
    }

    pub fn slug(&self) -> &str { self.slug.as_deref().unwrap_or_default() }
}
