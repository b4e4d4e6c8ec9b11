//! HTTP handlers for the Products API

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    IdPath, ValidatedJson,
    errors::responses::{
        BadRequestIdResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi};

use crate::error::{ProductError, ProductResult};
use crate::models::{CreateProduct, Product, UpdateProduct};
use crate::repository::ProductRepository;
use crate::service::ProductService;

/// OpenAPI documentation for the Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        search_products,
        products_by_max_price,
        products_in_stock,
    ),
    components(
        schemas(Product, CreateProduct, UpdateProduct),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestIdResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Product management endpoints")
    )
)]
pub struct ApiDoc;

/// Create the products router with all HTTP endpoints
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/price", get(products_by_max_price))
        .route("/instock", get(products_in_stock))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(shared_service)
}

/// List all products
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    responses(
        (status = 200, description = "List of products", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.get_all_products().await?;
    Ok(Json(products))
}

/// Create a new product
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> ProductResult<impl IntoResponse> {
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Replace a product's mutable fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> ProductResult<Json<Product>> {
    // Existence is checked up front; the lookup inside update_product covers
    // a concurrent delete between this check and the write.
    if !service.exists(id).await? {
        return Err(ProductError::NotFound(id));
    }

    let product = service.update_product(id, input).await?;
    Ok(Json(product))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
) -> ProductResult<impl IntoResponse> {
    if !service.exists(id).await? {
        return Err(ProductError::NotFound(id));
    }

    service.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Name search query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Name fragment to match (case-insensitive)
    pub name: String,
}

/// Search products by name fragment
#[utoipa::path(
    get,
    path = "/search",
    tag = "Products",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching products", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<SearchQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.get_products_by_name(&query.name).await?;
    Ok(Json(products))
}

/// Price ceiling query parameters
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MaxPriceQuery {
    /// Inclusive price ceiling
    pub max_price: f64,
}

/// List products priced at or below a maximum
#[utoipa::path(
    get,
    path = "/price",
    tag = "Products",
    params(MaxPriceQuery),
    responses(
        (status = 200, description = "Products within the price ceiling", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn products_by_max_price<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<MaxPriceQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.get_products_by_max_price(query.max_price).await?;
    Ok(Json(products))
}

/// Stock floor query parameters
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MinStockQuery {
    /// Exclusive stock floor (defaults to 0, i.e. anything in stock)
    #[serde(default)]
    pub min_stock: i32,
}

/// List products with stock strictly above a minimum
#[utoipa::path(
    get,
    path = "/instock",
    tag = "Products",
    params(MinStockQuery),
    responses(
        (status = 200, description = "Products in stock", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn products_in_stock<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<MinStockQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.get_products_in_stock(query.min_stock).await?;
    Ok(Json(products))
}
