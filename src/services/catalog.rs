//! Read-only catalog queries for the public storefront.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Category, ProductListing};
use crate::store::{Page, Paginated, Store};
use crate::{Result, ShopError};

pub const FEATURED_LIMIT: i64 = 8;

#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub products: Vec<ProductListing>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.store.list_categories().await
    }

    /// A category with its products, ordered by name.
    pub async fn category_page(&self, slug: &str) -> Result<CategoryPage> {
        let category = self.store.category_by_slug(slug).await?.ok_or(ShopError::NotFound("Category"))?;
        let products = self.store.products_in_category(category.id).await?;
        Ok(CategoryPage { category, products })
    }

    pub async fn featured_products(&self) -> Result<Vec<ProductListing>> {
        self.store.featured_products(FEATURED_LIMIT).await
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<ProductListing> {
        self.store.product_by_slug(slug).await?.ok_or(ShopError::NotFound("Product"))
    }

    /// Unknown ids are skipped rather than reported.
    pub async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductListing>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.products_by_ids(ids).await
    }

    pub async fn list_products(&self, page: Page) -> Result<Paginated<ProductListing>> {
        let data = self.store.list_products(page).await?;
        let total = self.store.count_products().await?;
        Ok(Paginated { data, total, page: page.page })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductInput;
    use crate::services::fixtures;
    use crate::store::CatalogStore;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_category_page_lists_products_by_name() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let shoes = fixtures::category(&store, "shoes").await;
        fixtures::product(&store, &hats, "fedora", dec!(30.00), None).await;
        fixtures::product(&store, &hats, "beret", dec!(12.00), None).await;
        fixtures::product(&store, &shoes, "loafer", dec!(80.00), None).await;
        let catalog = CatalogService::new(store.clone());

        let page = catalog.category_page("hats").await.unwrap();
        assert_eq!(page.category.id, hats.id);
        let names: Vec<_> = page.products.iter().map(|p| p.product.name.as_str()).collect();
        assert_eq!(names, ["beret", "fedora"]);
        assert_eq!(page.products[0].category_slug, "hats");

        assert!(matches!(catalog.category_page("gloves").await, Err(ShopError::NotFound("Category"))));
    }

    #[tokio::test]
    async fn test_featured_only() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        fixtures::product(&store, &hats, "plain", dec!(5.00), None).await;
        let input = ProductInput {
            name: "Star".into(), slug: None, description: String::new(), price: dec!(9.00), sale_price: None,
            stock_quantity: 1, category_id: hats.id, featured: true, image_url: None,
        };
        store.insert_product(&input.normalize().unwrap()).await.unwrap();
        let catalog = CatalogService::new(store.clone());

        let featured = catalog.featured_products().await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].product.slug, "star");
        assert_eq!(catalog.product_by_slug("star").await.unwrap().category_name, "HATS");
    }

    #[tokio::test]
    async fn test_products_by_ids_skips_unknown() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        let cap = fixtures::product(&store, &hats, "cap", dec!(10.00), None).await;
        let catalog = CatalogService::new(store.clone());

        let found = catalog.products_by_ids(&[cap.id, Uuid::now_v7()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(catalog.products_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_products_paginates() {
        let store = fixtures::store();
        let hats = fixtures::category(&store, "hats").await;
        for i in 0..3 {
            fixtures::product(&store, &hats, &format!("hat-{i}"), dec!(10.00), None).await;
        }
        let catalog = CatalogService::new(store.clone());

        let page = catalog.list_products(Page::new(Some(2), Some(2))).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.data.len(), 1);
    }
}
