use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Product entity - one row of the products table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Unique identifier, assigned by the database on insert
    pub id: i64,
    /// Product name
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Unit price
    pub price: f64,
    /// Units currently on hand
    pub stock: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
}

/// DTO for replacing a product's mutable fields.
///
/// This is a full replacement, not a patch: every mutable field is taken from
/// the payload, and an absent `description` clears the stored one.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
}

impl Product {
    /// Build a product from a storage-assigned id and a CreateProduct DTO
    pub fn new(id: i64, input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the mutable fields from an UpdateProduct DTO, leaving `id`
    /// and `created_at` untouched
    pub fn apply_update(&mut self, update: UpdateProduct) {
        self.name = update.name;
        self.description = update.description;
        self.price = update.price;
        self.stock = update.stock;
        self.updated_at = Utc::now();
    }
}
