use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{
        products::{CreateProductRequest, PriceSuggestionResponse, ProductList, UpdateProductRequest},
        vendors::{CreateVendorProfileRequest, UpdateVendorProfileRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Product, VendorProfile},
    response::ApiResponse,
    routes::{
        params::{LowStockQuery, SearchQuery},
        sales_windows, vendor_orders,
    },
    services::{product_service, vendor_service},
    state::AppState,
};

/// Everything under `/api/vendor`, scoped to the calling vendor.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).post(create_profile).put(update_profile),
        )
        .route("/products", get(list_products).post(create_product))
        .route("/products/low-stock", get(low_stock))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/price-suggestion", get(price_suggestion))
        .route("/pulse", get(vendor_orders::pulse))
        .nest("/sales-windows", sales_windows::router())
        .nest("/orders", vendor_orders::router())
}

#[utoipa::path(
    post,
    path = "/api/vendor/profile",
    request_body = CreateVendorProfileRequest,
    responses(
        (status = 201, description = "Vendor profile created", body = ApiResponse<VendorProfile>),
        (status = 403, description = "Not a vendor"),
        (status = 409, description = "Profile already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateVendorProfileRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<VendorProfile>>)> {
    let resp = vendor_service::create_profile(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/vendor/profile",
    responses(
        (status = 200, description = "Own vendor profile", body = ApiResponse<VendorProfile>),
        (status = 400, description = "Vendor profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VendorProfile>>> {
    let resp = vendor_service::get_own_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vendor/profile",
    request_body = UpdateVendorProfileRequest,
    responses(
        (status = 200, description = "Vendor profile updated", body = ApiResponse<VendorProfile>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateVendorProfileRequest>,
) -> AppResult<Json<ApiResponse<VendorProfile>>> {
    let resp = vendor_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/products",
    params(SearchQuery),
    responses(
        (status = 200, description = "Own products", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_vendor_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/products/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Own products running low, lowest stock first", body = ApiResponse<ProductList>),
        (status = 400, description = "Negative threshold or no vendor profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::vendor_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/vendor/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Own product", body = ApiResponse<Product>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_vendor_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vendor/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/vendor/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/products/{id}/price-suggestion",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Suggested price from the product's history", body = ApiResponse<PriceSuggestionResponse>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn price_suggestion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PriceSuggestionResponse>>> {
    let resp = product_service::suggest_price(&state, &user, id).await?;
    Ok(Json(resp))
}
