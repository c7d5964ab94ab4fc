use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{sales_windows::FulfillmentPicker, vendors::VendorList},
    error::AppResult,
    models::VendorProfile,
    response::ApiResponse,
    routes::params::SearchQuery,
    services::{sales_window_service, vendor_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors))
        .route("/{id}", get(get_vendor))
        .route("/{id}/sales-windows", get(vendor_sales_windows))
}

#[utoipa::path(
    get,
    path = "/api/vendors",
    params(SearchQuery),
    responses(
        (status = 200, description = "List vendors", body = ApiResponse<VendorList>)
    ),
    tag = "Vendors"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<VendorList>>> {
    let resp = vendor_service::list_vendors(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor profile ID")
    ),
    responses(
        (status = 200, description = "Vendor storefront profile", body = ApiResponse<VendorProfile>),
        (status = 404, description = "Vendor not found")
    ),
    tag = "Vendors"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<VendorProfile>>> {
    let resp = vendor_service::get_vendor(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendors/{id}/sales-windows",
    params(
        ("id" = Uuid, Path, description = "Vendor profile ID")
    ),
    responses(
        (status = 200, description = "Upcoming sales windows grouped by fulfillment date", body = ApiResponse<FulfillmentPicker>),
        (status = 404, description = "Vendor not found")
    ),
    tag = "Vendors"
)]
pub async fn vendor_sales_windows(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FulfillmentPicker>>> {
    let resp = sales_window_service::fulfillment_picker(&state, id).await?;
    Ok(Json(resp))
}
