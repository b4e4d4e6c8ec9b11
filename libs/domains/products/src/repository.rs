use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

#[cfg(test)]
use mockall::automock;

use crate::error::{ProductError, ProductResult};
use crate::models::{CreateProduct, Product};

/// Repository trait for Product persistence.
///
/// The source of truth for the fixed query set: inserts and updates are
/// split statically (an id-less record can only be inserted, a persisted one
/// only updated), the rest are the typed lookups the service exposes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a new product; the id is assigned by storage
    async fn insert(&self, input: CreateProduct) -> ProductResult<Product>;

    /// Persist changes to an existing product, matched by id
    async fn update(&self, product: Product) -> ProductResult<Product>;

    /// All products, no defined ordering
    async fn find_all(&self) -> ProductResult<Vec<Product>>;

    /// Single product by id, absent if no matching row
    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>>;

    /// Case-insensitive substring match on the name
    async fn find_by_name_containing(&self, fragment: &str) -> ProductResult<Vec<Product>>;

    /// Products with price at most `max_price` (inclusive)
    async fn find_by_price_at_most(&self, max_price: f64) -> ProductResult<Vec<Product>>;

    /// Products with stock strictly greater than `min_stock`
    async fn find_by_stock_above(&self, min_stock: i32) -> ProductResult<Vec<Product>>;

    /// Hard delete; Ok(false) when no row matched
    async fn delete_by_id(&self, id: i64) -> ProductResult<bool>;

    async fn exists_by_id(&self, id: i64) -> ProductResult<bool>;
}

/// In-memory implementation of ProductRepository (for development/testing)
#[derive(Debug, Clone)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<HashMap<i64, Product>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, input: CreateProduct) -> ProductResult<Product> {
        let mut products = self.products.write().await;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let product = Product::new(id, input);
        products.insert(id, product.clone());

        tracing::info!(product_id = id, "Created product");
        Ok(product)
    }

    async fn update(&self, product: Product) -> ProductResult<Product> {
        let mut products = self.products.write().await;

        match products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                tracing::info!(product_id = product.id, "Updated product");
                Ok(product)
            }
            None => Err(ProductError::NotFound(product.id)),
        }
    }

    async fn find_all(&self) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn find_by_name_containing(&self, fragment: &str) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        let fragment = fragment.to_lowercase();

        Ok(products
            .values()
            .filter(|p| p.name.to_lowercase().contains(&fragment))
            .cloned()
            .collect())
    }

    async fn find_by_price_at_most(&self, max_price: f64) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.price <= max_price)
            .cloned()
            .collect())
    }

    async fn find_by_stock_above(&self, min_stock: i32) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.stock > min_stock)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: i64) -> ProductResult<bool> {
        let mut products = self.products.write().await;

        if products.remove(&id).is_some() {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn exists_by_id(&self, id: i64) -> ProductResult<bool> {
        let products = self.products.read().await;
        Ok(products.contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(name: &str, price: f64, stock: i32) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            description: None,
            price,
            stock,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryProductRepository::new();

        let first = repo.insert(widget("Widget", 9.99, 5)).await.unwrap();
        let second = repo.insert(widget("Gadget", 19.99, 2)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let repo = InMemoryProductRepository::new();

        let created = repo.insert(widget("Widget", 9.99, 5)).await.unwrap();

        let fetched = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));

        let missing = repo.find_by_id(999).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_stored_product() {
        let repo = InMemoryProductRepository::new();

        let mut product = repo.insert(widget("Widget", 9.99, 5)).await.unwrap();
        product.name = "Widget2".to_string();
        product.price = 12.0;

        let updated = repo.update(product.clone()).await.unwrap();
        assert_eq!(updated.name, "Widget2");

        let fetched = repo.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(fetched.price, 12.0);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let repo = InMemoryProductRepository::new();

        let ghost = Product::new(42, widget("Ghost", 1.0, 0));
        let result = repo.update(ghost).await;

        assert!(matches!(result, Err(ProductError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_find_by_name_containing_is_case_insensitive() {
        let repo = InMemoryProductRepository::new();
        repo.insert(widget("Blue Widget", 9.99, 5)).await.unwrap();
        repo.insert(widget("Red WIDGET", 8.99, 3)).await.unwrap();
        repo.insert(widget("Gadget", 19.99, 2)).await.unwrap();

        let found = repo.find_by_name_containing("widget").await.unwrap();
        assert_eq!(found.len(), 2);

        let found = repo.find_by_name_containing("WiDg").await.unwrap();
        assert_eq!(found.len(), 2);

        let found = repo.find_by_name_containing("nothing").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_price_at_most_is_inclusive() {
        let repo = InMemoryProductRepository::new();
        repo.insert(widget("Cheap", 5.0, 1)).await.unwrap();
        repo.insert(widget("Exact", 10.0, 1)).await.unwrap();
        repo.insert(widget("Pricey", 15.0, 1)).await.unwrap();

        let found = repo.find_by_price_at_most(10.0).await.unwrap();
        let mut names: Vec<_> = found.into_iter().map(|p| p.name).collect();
        names.sort();
        assert_eq!(names, vec!["Cheap", "Exact"]);
    }

    #[tokio::test]
    async fn test_find_by_stock_above_is_strict() {
        let repo = InMemoryProductRepository::new();
        repo.insert(widget("Empty", 1.0, 0)).await.unwrap();
        repo.insert(widget("Low", 1.0, 3)).await.unwrap();
        repo.insert(widget("High", 1.0, 10)).await.unwrap();

        let found = repo.find_by_stock_above(0).await.unwrap();
        assert_eq!(found.len(), 2, "stock must be strictly greater");

        let found = repo.find_by_stock_above(3).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "High");
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(widget("Widget", 9.99, 5)).await.unwrap();

        assert!(repo.exists_by_id(created.id).await.unwrap());
        assert!(repo.delete_by_id(created.id).await.unwrap());
        assert!(!repo.exists_by_id(created.id).await.unwrap());

        // Deleting again reports that nothing matched
        assert!(!repo.delete_by_id(created.id).await.unwrap());
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
    }
}
