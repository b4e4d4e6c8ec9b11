//! Integration tests for the Products domain
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - Database queries work correctly
//! - The ILIKE name search behaves as documented
//! - Inserted ids are database-assigned and stable across updates

use domain_products::*;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};

fn widget(name: String, price: f64, stock: i32) -> CreateProduct {
    CreateProduct {
        name,
        description: Some("Integration test product".to_string()),
        price,
        stock,
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
async fn test_insert_and_find_by_id() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("insert_and_find");

    let input = widget(
        builder.name("product", "main"),
        builder.price(),
        builder.stock(),
    );

    let created = repo.insert(input.clone()).await.unwrap();

    assert!(created.id >= 1, "id must be assigned by the database");
    assert_eq!(created.name, input.name);
    assert_eq!(created.price, input.price);
    assert_eq!(created.stock, input.stock);

    let retrieved = repo.find_by_id(created.id).await.unwrap();
    let retrieved = assert_some(retrieved, "product should exist");

    assert_eq!(retrieved.id, created.id);
    assert_eq!(retrieved.name, created.name);
}

#[tokio::test]
async fn test_find_by_id_missing_is_none() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    let missing = repo.find_by_id(999_999).await.unwrap();
    assert!(missing.is_none());
    assert!(!repo.exists_by_id(999_999).await.unwrap());
}

#[tokio::test]
async fn test_find_all_returns_every_row() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("find_all");

    for i in 0..3 {
        let input = widget(builder.name("product", &format!("p{}", i)), 1.0, 1);
        repo.insert(input).await.unwrap();
    }

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_name_search_is_case_insensitive_substring() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    repo.insert(widget("Blue Widget".to_string(), 9.99, 5))
        .await
        .unwrap();
    repo.insert(widget("Red WIDGET".to_string(), 8.99, 3))
        .await
        .unwrap();
    repo.insert(widget("Gadget".to_string(), 19.99, 2))
        .await
        .unwrap();

    let found = repo.find_by_name_containing("widget").await.unwrap();
    assert_eq!(found.len(), 2);

    let found = repo.find_by_name_containing("WiDg").await.unwrap();
    assert_eq!(found.len(), 2);

    let found = repo.find_by_name_containing("nothing").await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_price_filter_is_inclusive() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    repo.insert(widget("Cheap".to_string(), 5.0, 1))
        .await
        .unwrap();
    repo.insert(widget("Exact".to_string(), 10.0, 1))
        .await
        .unwrap();
    repo.insert(widget("Pricey".to_string(), 15.0, 1))
        .await
        .unwrap();

    let found = repo.find_by_price_at_most(10.0).await.unwrap();
    let mut names: Vec<_> = found.into_iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["Cheap", "Exact"]);
}

#[tokio::test]
async fn test_stock_filter_is_strictly_greater() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    repo.insert(widget("Empty".to_string(), 1.0, 0))
        .await
        .unwrap();
    repo.insert(widget("Low".to_string(), 1.0, 3)).await.unwrap();
    repo.insert(widget("High".to_string(), 1.0, 10))
        .await
        .unwrap();

    let found = repo.find_by_stock_above(0).await.unwrap();
    assert_eq!(found.len(), 2);

    let found = repo.find_by_stock_above(3).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "High");
}

#[tokio::test]
async fn test_update_persists_replaced_fields() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("update_persists");

    let mut product = repo
        .insert(widget(builder.name("product", "orig"), 9.99, 5))
        .await
        .unwrap();

    product.apply_update(UpdateProduct {
        name: builder.name("product", "renamed"),
        description: None,
        price: 12.0,
        stock: 3,
    });
    let updated = repo.update(product.clone()).await.unwrap();

    assert_eq!(updated.id, product.id);
    assert_eq!(updated.name, builder.name("product", "renamed"));
    assert_eq!(updated.description, None);

    let fetched = assert_some(
        repo.find_by_id(product.id).await.unwrap(),
        "updated product should exist",
    );
    assert_eq!(fetched.price, 12.0);
    assert_eq!(fetched.stock, 3);
}

#[tokio::test]
async fn test_delete_then_lookups_report_absence() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("delete_reports");

    let created = repo
        .insert(widget(builder.name("product", "doomed"), 1.0, 1))
        .await
        .unwrap();

    assert!(repo.exists_by_id(created.id).await.unwrap());
    assert!(repo.delete_by_id(created.id).await.unwrap());

    assert!(!repo.exists_by_id(created.id).await.unwrap());
    assert!(repo.find_by_id(created.id).await.unwrap().is_none());

    // Deleting an already-deleted row reports that nothing matched
    assert!(!repo.delete_by_id(created.id).await.unwrap());
}

// ============================================================================
// Service-over-Postgres Tests
// ============================================================================

#[tokio::test]
async fn test_full_crud_lifecycle_through_service() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let service = ProductService::new(repo);

    // Create
    let created = service
        .create_product(CreateProduct {
            name: "Widget".to_string(),
            description: None,
            price: 9.99,
            stock: 5,
        })
        .await
        .unwrap();

    // Read back
    let fetched = service.get_product(created.id).await.unwrap();
    assert_eq!(fetched.name, "Widget");

    // Replace
    let updated = service
        .update_product(
            created.id,
            UpdateProduct {
                name: "Widget2".to_string(),
                description: None,
                price: 12.0,
                stock: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Widget2");

    // Delete
    service.delete_product(created.id).await.unwrap();
    assert!(!service.exists(created.id).await.unwrap());

    let result = service.get_product(created.id).await;
    assert!(matches!(result, Err(ProductError::NotFound(_))));
}
