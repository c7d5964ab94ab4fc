use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    domain::sales_window::SalesWindowStatus,
    dto::sales_windows::{
        BulkWindowProductsRequest, CreateSalesWindowRequest, GenerateSlotsRequest,
        SalesWindowDetail, SalesWindowList, SlotList, UpdateSalesWindowRequest,
        WindowProductList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::SalesWindowQuery,
    services::sales_window_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_windows).post(create_window))
        .route("/{id}", get(get_window).put(update_window))
        .route("/{id}/open", post(open_window))
        .route("/{id}/close", post(close_window))
        .route("/{id}/cancel", post(cancel_window))
        .route("/{id}/fulfill", post(fulfill_window))
        .route("/{id}/duplicate", post(duplicate_window))
        .route("/{id}/products/bulk", post(bulk_products))
        .route("/{id}/slots", post(generate_slots))
}

type DetailResponse = AppResult<Json<ApiResponse<SalesWindowDetail>>>;

#[utoipa::path(
    get,
    path = "/api/vendor/sales-windows",
    params(SalesWindowQuery),
    responses(
        (status = 200, description = "Own sales windows", body = ApiResponse<SalesWindowList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn list_windows(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SalesWindowQuery>,
) -> AppResult<Json<ApiResponse<SalesWindowList>>> {
    let resp = sales_window_service::list_windows(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows",
    request_body = CreateSalesWindowRequest,
    responses(
        (status = 201, description = "Sales window created", body = ApiResponse<SalesWindowDetail>),
        (status = 400, description = "Invalid sales window")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn create_window(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSalesWindowRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SalesWindowDetail>>)> {
    let resp = sales_window_service::create_window(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/vendor/sales-windows/{id}",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    responses(
        (status = 200, description = "Sales window with products, slots and metrics", body = ApiResponse<SalesWindowDetail>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn get_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> DetailResponse {
    let resp = sales_window_service::get_window(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vendor/sales-windows/{id}",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    request_body = UpdateSalesWindowRequest,
    responses(
        (status = 200, description = "Sales window updated", body = ApiResponse<SalesWindowDetail>),
        (status = 400, description = "Invalid sales window"),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn update_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSalesWindowRequest>,
) -> DetailResponse {
    let resp = sales_window_service::update_window(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/open",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    responses(
        (status = 200, description = "Sales window opened", body = ApiResponse<SalesWindowDetail>),
        (status = 400, description = "Item allowance used up"),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn open_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> DetailResponse {
    let resp =
        sales_window_service::transition_window(&state, &user, id, SalesWindowStatus::Open).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/close",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    responses(
        (status = 200, description = "Sales window closed", body = ApiResponse<SalesWindowDetail>),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn close_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> DetailResponse {
    let resp =
        sales_window_service::transition_window(&state, &user, id, SalesWindowStatus::Closed)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/cancel",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    responses(
        (status = 200, description = "Sales window cancelled", body = ApiResponse<SalesWindowDetail>),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn cancel_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> DetailResponse {
    let resp =
        sales_window_service::transition_window(&state, &user, id, SalesWindowStatus::Cancelled)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/fulfill",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    responses(
        (status = 200, description = "Sales window fulfilled", body = ApiResponse<SalesWindowDetail>),
        (status = 409, description = "Invalid status transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn fulfill_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> DetailResponse {
    let resp =
        sales_window_service::transition_window(&state, &user, id, SalesWindowStatus::Fulfilled)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/duplicate",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    responses(
        (status = 201, description = "Draft copy of the sales window", body = ApiResponse<SalesWindowDetail>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn duplicate_window(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<SalesWindowDetail>>)> {
    let resp = sales_window_service::duplicate_window(&state, &user, id).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/products/bulk",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    request_body = BulkWindowProductsRequest,
    responses(
        (status = 200, description = "Products offered in the window", body = ApiResponse<WindowProductList>),
        (status = 400, description = "Invalid product list")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn bulk_products(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkWindowProductsRequest>,
) -> AppResult<Json<ApiResponse<WindowProductList>>> {
    let resp = sales_window_service::set_window_products(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/sales-windows/{id}/slots",
    params(("id" = Uuid, Path, description = "Sales window ID")),
    request_body = GenerateSlotsRequest,
    responses(
        (status = 200, description = "Generated pickup slots", body = ApiResponse<SlotList>),
        (status = 400, description = "Invalid slot parameters"),
        (status = 409, description = "Existing slots hold reservations")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales Windows"
)]
pub async fn generate_slots(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateSlotsRequest>,
) -> AppResult<Json<ApiResponse<SlotList>>> {
    let resp = sales_window_service::generate_slots(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
