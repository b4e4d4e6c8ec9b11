use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::entity;
use crate::error::ProductResult;
use crate::models::{CreateProduct, Product};
use crate::repository::ProductRepository;

/// PostgreSQL implementation of ProductRepository
#[derive(Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    /// Create a new PostgreSQL product repository
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn insert(&self, input: CreateProduct) -> ProductResult<Product> {
        let model: entity::ActiveModel = input.into();
        let model = model.insert(&self.db).await?;

        tracing::info!(product_id = model.id, "Created product");
        Ok(model.into())
    }

    async fn update(&self, product: Product) -> ProductResult<Product> {
        let id = product.id;
        let model: entity::ActiveModel = product.into();
        let model = model.update(&self.db).await?;

        tracing::info!(product_id = id, "Updated product");
        Ok(model.into())
    }

    async fn find_all(&self) -> ProductResult<Vec<Product>> {
        let models = entity::Entity::find().all(&self.db).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let model = entity::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_name_containing(&self, fragment: &str) -> ProductResult<Vec<Product>> {
        // ILIKE: containment matching is fixed to case-insensitive
        let pattern = format!("%{}%", fragment);
        let models = entity::Entity::find()
            .filter(Expr::col(entity::Column::Name).ilike(pattern))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_price_at_most(&self, max_price: f64) -> ProductResult<Vec<Product>> {
        let models = entity::Entity::find()
            .filter(entity::Column::Price.lte(max_price))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_stock_above(&self, min_stock: i32) -> ProductResult<Vec<Product>> {
        let models = entity::Entity::find()
            .filter(entity::Column::Stock.gt(min_stock))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn delete_by_id(&self, id: i64) -> ProductResult<bool> {
        let result = entity::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn exists_by_id(&self, id: i64) -> ProductResult<bool> {
        let count = entity::Entity::find_by_id(id).count(&self.db).await?;
        Ok(count > 0)
    }
}
