use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Products API",
        version = "0.1.0",
        description = "CRUD API for the product catalog"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/products", api = domain_products::handlers::ApiDoc)
    )
)]
pub struct ApiDoc;
