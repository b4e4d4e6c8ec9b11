use std::sync::Arc;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{CreateProduct, Product, UpdateProduct};
use crate::repository::ProductRepository;

/// Service layer for Product business logic.
///
/// A thin orchestration layer over the repository: every read maps
/// one-to-one, writes validate their payload first, and `update_product`
/// owns the merge of incoming fields onto the stored record.
#[derive(Clone)]
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a new product; the id is assigned by storage
    pub async fn create_product(&self, input: CreateProduct) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        self.repository.insert(input).await
    }

    /// All products
    pub async fn get_all_products(&self) -> ProductResult<Vec<Product>> {
        self.repository.find_all().await
    }

    /// Get a product by id
    pub async fn get_product(&self, id: i64) -> ProductResult<Product> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Products whose name contains the fragment (case-insensitive)
    pub async fn get_products_by_name(&self, fragment: &str) -> ProductResult<Vec<Product>> {
        self.repository.find_by_name_containing(fragment).await
    }

    /// Products priced at or below the given maximum
    pub async fn get_products_by_max_price(&self, max_price: f64) -> ProductResult<Vec<Product>> {
        self.repository.find_by_price_at_most(max_price).await
    }

    /// Products with stock strictly above the given minimum
    pub async fn get_products_in_stock(&self, min_stock: i32) -> ProductResult<Vec<Product>> {
        self.repository.find_by_stock_above(min_stock).await
    }

    /// Replace a product's mutable fields, leaving the id untouched.
    ///
    /// Returns NotFound if the product vanished; callers check existence
    /// first, so hitting that path means a concurrent delete won the race.
    pub async fn update_product(&self, id: i64, input: UpdateProduct) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        let mut existing = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        existing.apply_update(input);
        self.repository.update(existing).await
    }

    /// Delete a product. Absence is a silent no-op at this layer; the HTTP
    /// layer checks existence before calling.
    pub async fn delete_product(&self, id: i64) -> ProductResult<()> {
        let deleted = self.repository.delete_by_id(id).await?;

        if !deleted {
            tracing::debug!(product_id = id, "Delete was a no-op, product already gone");
        }

        Ok(())
    }

    /// Check whether a product with the given id exists
    pub async fn exists(&self, id: i64) -> ProductResult<bool> {
        self.repository.exists_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockProductRepository;
    use mockall::predicate::eq;

    fn widget_input() -> CreateProduct {
        CreateProduct {
            name: "Widget".to_string(),
            description: Some("A widget".to_string()),
            price: 9.99,
            stock: 5,
        }
    }

    fn stored_widget(id: i64) -> Product {
        Product::new(id, widget_input())
    }

    #[tokio::test]
    async fn test_create_product_rejects_empty_name_without_touching_storage() {
        // No expectations set: any repository call would panic the mock
        let mock_repo = MockProductRepository::new();
        let service = ProductService::new(mock_repo);

        let result = service
            .create_product(CreateProduct {
                name: String::new(),
                description: None,
                price: 1.0,
                stock: 1,
            })
            .await;

        assert!(matches!(result, Err(ProductError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_product_inserts_valid_input() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_insert()
            .returning(|input| Ok(Product::new(1, input)));

        let service = ProductService::new(mock_repo);
        let created = service.create_product(widget_input()).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.name, "Widget");
    }

    #[tokio::test]
    async fn test_get_product_maps_absence_to_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find_by_id()
            .with(eq(42))
            .returning(|_| Ok(None));

        let service = ProductService::new(mock_repo);
        let result = service.get_product(42).await;

        assert!(matches!(result, Err(ProductError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_update_product_overwrites_fields_and_keeps_id() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find_by_id()
            .with(eq(1))
            .returning(|id| Ok(Some(stored_widget(id))));
        mock_repo.expect_update().returning(|product| Ok(product));

        let service = ProductService::new(mock_repo);
        let updated = service
            .update_product(
                1,
                UpdateProduct {
                    name: "Widget2".to_string(),
                    description: None,
                    price: 12.0,
                    stock: 3,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, 1);
        assert_eq!(updated.name, "Widget2");
        assert_eq!(updated.description, None);
        assert_eq!(updated.price, 12.0);
        assert_eq!(updated.stock, 3);
    }

    #[tokio::test]
    async fn test_update_product_missing_is_not_found() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_find_by_id()
            .with(eq(7))
            .returning(|_| Ok(None));

        let service = ProductService::new(mock_repo);
        let result = service
            .update_product(
                7,
                UpdateProduct {
                    name: "Whatever".to_string(),
                    description: None,
                    price: 1.0,
                    stock: 0,
                },
            )
            .await;

        assert!(matches!(result, Err(ProductError::NotFound(7))));
    }

    #[tokio::test]
    async fn test_delete_product_is_silent_when_absent() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_delete_by_id()
            .with(eq(9))
            .returning(|_| Ok(false));

        let service = ProductService::new(mock_repo);
        assert!(service.delete_product(9).await.is_ok());
    }
}
