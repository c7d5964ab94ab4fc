use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AuditLogList, ImpersonateRequest, ImpersonationResponse, UserActionRequest,
            UserActionResult, UserList,
        },
        orders::{OrderList, OrderWithItems},
        products::ProductList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{AuditLogQuery, LowStockQuery, OrderListQuery, UserListQuery},
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/actions", post(user_action))
        .route("/users/{id}/impersonate", post(impersonate))
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/audit-logs", get(list_audit_logs))
        .route("/inventory/low-stock", get(list_low_stock))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/actions",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserActionRequest,
    responses(
        (status = 200, description = "Action applied", body = ApiResponse<UserActionResult>),
        (status = 403, description = "Target is an admin"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn user_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserActionRequest>,
) -> AppResult<Json<ApiResponse<UserActionResult>>> {
    let resp = admin_service::apply_user_action(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/impersonate",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = ImpersonateRequest,
    responses(
        (status = 200, description = "Short-lived token for the target user", body = ApiResponse<ImpersonationResponse>),
        (status = 400, description = "Missing reason or inactive target"),
        (status = 403, description = "Target is an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn impersonate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ImpersonateRequest>,
) -> AppResult<Json<ApiResponse<ImpersonationResponse>>> {
    let resp = admin_service::impersonate(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit trail, newest first", body = ApiResponse<AuditLogList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<ApiResponse<AuditLogList>>> {
    let resp = admin_service::list_audit_logs(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Products running low across vendors", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = admin_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}
