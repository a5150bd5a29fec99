//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::Slug;
use crate::ShopError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin form for creating or replacing a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    /// Derived from `name` when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 512, message = "Image URL is too long"))]
    pub image_url: Option<String>,
}

impl CategoryInput {
    /// Validates the form and returns it with a normalised slug.
    pub fn normalize(mut self) -> Result<Self, ShopError> {
        self.validate()?;
        let slug = match self.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Slug::new(raw),
            None => Slug::from_name(&self.name),
        }
        .map_err(|e| ShopError::validation(e.to_string()))?;
        self.slug = Some(slug.into_inner());
        self.description = self.description.filter(|d| !d.trim().is_empty());
        self.image_url = self.image_url.filter(|u| !u.trim().is_empty());
        Ok(self)
    }

    pub fn slug(&self) -> &str { self.slug.as_deref().unwrap_or_default() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_derived_from_name() {
        let input = CategoryInput { name: "Kitchen Tools".into(), slug: None, description: Some("  ".into()), image_url: None };
        let input = input.normalize().unwrap();
        assert_eq!(input.slug(), "kitchen-tools");
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_invalid_slug_rejected() {
        let input = CategoryInput { name: "Tools".into(), slug: Some("tools & more".into()), description: None, image_url: None };
        assert!(matches!(input.normalize(), Err(ShopError::Validation(_))));
    }

    #[test]
    fn test_name_required() {
        let input = CategoryInput { name: String::new(), slug: Some("x".into()), description: None, image_url: None };
        match input.normalize() {
            Err(ShopError::Validation(msg)) => assert_eq!(msg, "Name is required"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
