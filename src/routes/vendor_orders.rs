use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    domain::pulse::PulseSummary,
    dto::orders::{FulfillmentUpdateRequest, OrderList, OrderWithItems, VendorOrderStats},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{OrderListQuery, PulseQuery},
    services::{fulfillment_service, pulse_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/stats", get(order_stats))
        .route("/{id}", get(get_order))
        .route("/{id}/fulfillment", patch(update_fulfillment))
}

#[utoipa::path(
    get,
    path = "/api/vendor/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders placed with the vendor", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = fulfillment_service::list_vendor_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/orders/stats",
    responses(
        (status = 200, description = "Order counts and revenue", body = ApiResponse<VendorOrderStats>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor Orders"
)]
pub async fn order_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VendorOrderStats>>> {
    let resp = fulfillment_service::vendor_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = fulfillment_service::get_vendor_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/vendor/orders/{id}/fulfillment",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = FulfillmentUpdateRequest,
    responses(
        (status = 200, description = "Fulfillment updated", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Order is not paid"),
        (status = 409, description = "Order can no longer change")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor Orders"
)]
pub async fn update_fulfillment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FulfillmentUpdateRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = fulfillment_service::update_fulfillment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/pulse",
    params(PulseQuery),
    responses(
        (status = 200, description = "Sales summary for the period", body = ApiResponse<PulseSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor Orders"
)]
pub async fn pulse(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PulseQuery>,
) -> AppResult<Json<ApiResponse<PulseSummary>>> {
    let resp = pulse_service::vendor_pulse(&state, &user, query).await?;
    Ok(Json(resp))
}
