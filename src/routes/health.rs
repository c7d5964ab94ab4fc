use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    status: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthData>>) {
    let database_up = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let (code, status, database) = if database_up {
        (StatusCode::OK, "ok", "up")
    } else {
        tracing::warn!("health check could not reach the database");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };
    let data = HealthData {
        status: status.to_string(),
        database: database.to_string(),
    };

    (
        code,
        Json(ApiResponse::success("Health check", data, Some(Meta::empty()))),
    )
}
