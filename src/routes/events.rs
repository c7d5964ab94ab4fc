use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::events::{
        ApplicationList, ApplyToEventRequest, CreateEventRequest, EventList,
        ReviewApplicationRequest, UpdateEventRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Event, EventApplication},
    response::ApiResponse,
    routes::params::SearchQuery,
    services::event_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/mine", get(my_events))
        .route("/{id}", get(get_event).put(update_event))
        .route("/{id}/publish", post(publish_event))
        .route("/{id}/cancel", post(cancel_event))
        .route(
            "/{id}/applications",
            get(list_applications).post(apply_to_event),
        )
        .route(
            "/{id}/applications/{application_id}",
            patch(review_application),
        )
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(SearchQuery),
    responses(
        (status = 200, description = "Published upcoming events", body = ApiResponse<EventList>)
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<EventList>>> {
    let resp = event_service::list_public_events(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = String, Path, description = "Event ID or slug")),
    responses(
        (status = 200, description = "Published event", body = ApiResponse<Event>),
        (status = 404, description = "Not Found")
    ),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::get_public_event(&state, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Draft event created", body = ApiResponse<Event>),
        (status = 403, description = "Not a coordinator")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Event>>)> {
    let resp = event_service::create_event(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/events/mine",
    params(SearchQuery),
    responses(
        (status = 200, description = "Events created by the coordinator", body = ApiResponse<EventList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn my_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<EventList>>> {
    let resp = event_service::my_events(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = ApiResponse<Event>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::update_event(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/publish",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event published", body = ApiResponse<Event>),
        (status = 409, description = "Event is not a draft")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn publish_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::publish_event(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/cancel",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event cancelled", body = ApiResponse<Event>),
        (status = 409, description = "Event already cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::cancel_event(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/applications",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Vendor applications", body = ApiResponse<ApplicationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ApplicationList>>> {
    let resp = event_service::list_applications(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/applications",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = ApplyToEventRequest,
    responses(
        (status = 201, description = "Application submitted", body = ApiResponse<EventApplication>),
        (status = 409, description = "Already applied")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn apply_to_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplyToEventRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<EventApplication>>)> {
    let resp = event_service::apply_to_event(&state, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/events/{id}/applications/{application_id}",
    params(
        ("id" = Uuid, Path, description = "Event ID"),
        ("application_id" = Uuid, Path, description = "Application ID")
    ),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Application reviewed", body = ApiResponse<EventApplication>),
        (status = 409, description = "Event is full")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn review_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, application_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReviewApplicationRequest>,
) -> AppResult<Json<ApiResponse<EventApplication>>> {
    let resp =
        event_service::review_application(&state, &user, id, application_id, payload).await?;
    Ok(Json(resp))
}
