use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        events::{self, ApplicationStatus, EventStatus},
        roles::Role,
        slug,
    },
    dto::events::{
        ApplicationList, ApplyToEventRequest, CreateEventRequest, EventList,
        ReviewApplicationRequest, UpdateEventRequest,
    },
    entity::{
        event_applications::{
            ActiveModel as ApplicationActive, Column as ApplicationCol,
            Entity as EventApplications,
        },
        events::{ActiveModel as EventActive, Column as EventCol, Entity as Events, Model as EventModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{Event, EventApplication},
    response::{ApiResponse, Meta},
    routes::params::SearchQuery,
    services::vendor_service::require_vendor,
    state::AppState,
};

fn categories_json(categories: Vec<String>) -> serde_json::Value {
    let cleaned: Vec<String> = categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    serde_json::json!(cleaned)
}

async fn unique_slug(state: &AppState, title: &str) -> AppResult<String> {
    let base = slug::slugify(title);
    let mut n = 1;
    loop {
        let candidate = slug::candidate(&base, n);
        let taken = Events::find()
            .filter(EventCol::Slug.eq(candidate.as_str()))
            .count(&state.orm)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        n += 1;
    }
}

async fn find_own_event(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<EventModel> {
    ensure_role(user, Role::Coordinator)?;
    Events::find_by_id(id)
        .filter(EventCol::CoordinatorId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn create_event(
    state: &AppState,
    user: &AuthUser,
    payload: CreateEventRequest,
) -> AppResult<ApiResponse<Event>> {
    ensure_role(user, Role::Coordinator)?;
    events::validate_event(
        &payload.title,
        &payload.description,
        &payload.venue,
        payload.start_at,
        payload.end_at,
        payload.max_vendors,
    )?;

    let title = payload.title.trim().to_string();
    let event = EventActive {
        id: Set(Uuid::new_v4()),
        coordinator_id: Set(user.user_id),
        slug: Set(unique_slug(state, &title).await?),
        title: Set(title),
        description: Set(payload.description.trim().to_string()),
        venue: Set(payload.venue.trim().to_string()),
        start_at: Set(payload.start_at.into()),
        end_at: Set(payload.end_at.into()),
        max_vendors: Set(payload.max_vendors),
        categories: Set(categories_json(payload.categories.unwrap_or_default())),
        rules: Set(payload.rules),
        status: Set(EventStatus::Draft.as_str().to_string()),
        published_at: Set(None),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "event_create",
        "events",
        serde_json::json!({ "event_id": event.id }),
    )
    .await;

    Ok(ApiResponse::ok("Event created", event.into()))
}

pub async fn my_events(
    state: &AppState,
    user: &AuthUser,
    query: SearchQuery,
) -> AppResult<ApiResponse<EventList>> {
    ensure_role(user, Role::Coordinator)?;
    let (page, limit, offset) = query.pagination().normalize();
    let finder = Events::find()
        .filter(EventCol::CoordinatorId.eq(user.user_id))
        .order_by_desc(EventCol::StartAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Event::from)
        .collect();
    Ok(ApiResponse::success(
        "Events",
        EventList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateEventRequest,
) -> AppResult<ApiResponse<Event>> {
    let existing = find_own_event(state, user, id).await?;
    if existing.status.parse::<EventStatus>()? == EventStatus::Cancelled {
        return Err(AppError::Conflict("Cancelled events cannot be edited".into()));
    }

    let title = payload.title.unwrap_or_else(|| existing.title.clone());
    let description = payload
        .description
        .unwrap_or_else(|| existing.description.clone());
    let venue = payload.venue.unwrap_or_else(|| existing.venue.clone());
    let start_at = payload
        .start_at
        .unwrap_or_else(|| existing.start_at.with_timezone(&Utc));
    let end_at = payload
        .end_at
        .unwrap_or_else(|| existing.end_at.with_timezone(&Utc));
    let max_vendors = payload.max_vendors.or(existing.max_vendors);
    events::validate_event(&title, &description, &venue, start_at, end_at, max_vendors)?;

    let mut active: EventActive = existing.into();
    active.title = Set(title.trim().to_string());
    active.description = Set(description.trim().to_string());
    active.venue = Set(venue.trim().to_string());
    active.start_at = Set(start_at.into());
    active.end_at = Set(end_at.into());
    active.max_vendors = Set(max_vendors);
    if let Some(categories) = payload.categories {
        active.categories = Set(categories_json(categories));
    }
    if let Some(rules) = payload.rules {
        active.rules = Set(Some(rules));
    }
    active.updated_at = Set(Utc::now().into());
    let event = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Event updated", event.into()))
}

async fn set_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    to: EventStatus,
) -> AppResult<ApiResponse<Event>> {
    let existing = find_own_event(state, user, id).await?;
    let from = existing.status.parse::<EventStatus>()?;
    let allowed = matches!(
        (from, to),
        (EventStatus::Draft, EventStatus::Published)
            | (EventStatus::Draft, EventStatus::Cancelled)
            | (EventStatus::Published, EventStatus::Cancelled)
    );
    if !allowed {
        return Err(AppError::Conflict(format!(
            "Event cannot move from {from} to {to}"
        )));
    }

    let now = Utc::now();
    let mut active: EventActive = existing.into();
    active.status = Set(to.as_str().to_string());
    if to == EventStatus::Published {
        active.published_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    let event = active.update(&state.orm).await?;

    tracing::info!(event_id = %id, %from, %to, "event status changed");
    audit::record(
        state,
        Some(user.user_id),
        "event_status",
        "events",
        serde_json::json!({ "event_id": id, "from": from, "to": to }),
    )
    .await;

    Ok(ApiResponse::ok(format!("Event {to}"), event.into()))
}

pub async fn publish_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Event>> {
    set_status(state, user, id, EventStatus::Published).await
}

pub async fn cancel_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Event>> {
    set_status(state, user, id, EventStatus::Cancelled).await
}

pub async fn list_applications(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ApplicationList>> {
    let event = find_own_event(state, user, id).await?;
    let items = EventApplications::find()
        .filter(ApplicationCol::EventId.eq(event.id))
        .order_by_asc(ApplicationCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(EventApplication::from)
        .collect();
    Ok(ApiResponse::ok("Applications", ApplicationList { items }))
}

pub async fn review_application(
    state: &AppState,
    user: &AuthUser,
    event_id: Uuid,
    application_id: Uuid,
    payload: ReviewApplicationRequest,
) -> AppResult<ApiResponse<EventApplication>> {
    ensure_role(user, Role::Coordinator)?;
    if payload.status == ApplicationStatus::Pending {
        return Err(AppError::BadRequest(
            "status must be approved or rejected".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    let event = Events::find_by_id(event_id)
        .filter(EventCol::CoordinatorId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let application = EventApplications::find_by_id(application_id)
        .filter(ApplicationCol::EventId.eq(event.id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = application.status.parse::<ApplicationStatus>()?;
    if payload.status == ApplicationStatus::Approved && current != ApplicationStatus::Approved {
        if let Some(max) = event.max_vendors {
            let approved = EventApplications::find()
                .filter(ApplicationCol::EventId.eq(event.id))
                .filter(ApplicationCol::Status.eq(ApplicationStatus::Approved.as_str()))
                .count(&txn)
                .await?;
            if approved >= max as u64 {
                return Err(AppError::Conflict("Event has reached max_vendors".into()));
            }
        }
    }

    let mut active: ApplicationActive = application.into();
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let application = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "event_application_review",
        "event_applications",
        serde_json::json!({ "application_id": application_id, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::ok("Application reviewed", application.into()))
}

pub async fn list_public_events(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<EventList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all()
        .add(EventCol::Status.eq(EventStatus::Published.as_str()))
        .add(EventCol::EndAt.gt(Utc::now()));
    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col(EventCol::Title).ilike(pattern.clone()))
                .add(Expr::col(EventCol::Venue).ilike(pattern)),
        );
    }

    let finder = Events::find()
        .filter(condition)
        .order_by_asc(EventCol::StartAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Event::from)
        .collect();

    Ok(ApiResponse::success(
        "Events",
        EventList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Looks a published event up by id, falling back to its slug.
pub async fn get_public_event(state: &AppState, key: &str) -> AppResult<ApiResponse<Event>> {
    let by_key = match Uuid::parse_str(key) {
        Ok(id) => EventCol::Id.eq(id),
        Err(_) => EventCol::Slug.eq(key),
    };
    let event = Events::find()
        .filter(by_key)
        .filter(EventCol::Status.eq(EventStatus::Published.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok("Event", event.into()))
}

pub async fn apply_to_event(
    state: &AppState,
    user: &AuthUser,
    event_id: Uuid,
    payload: ApplyToEventRequest,
) -> AppResult<ApiResponse<EventApplication>> {
    let vendor = require_vendor(&state.orm, user).await?;
    if payload.business_name.trim().is_empty() || payload.category.trim().is_empty() {
        return Err(AppError::BadRequest(
            "business_name and category are required".into(),
        ));
    }

    let event = Events::find_by_id(event_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if event.status.parse::<EventStatus>()? != EventStatus::Published {
        return Err(AppError::BadRequest("Event is not accepting applications".into()));
    }

    let existing = EventApplications::find()
        .filter(ApplicationCol::EventId.eq(event.id))
        .filter(ApplicationCol::VendorId.eq(vendor.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Already applied to this event".into()));
    }

    let application = ApplicationActive {
        id: Set(Uuid::new_v4()),
        event_id: Set(event.id),
        vendor_id: Set(vendor.id),
        business_name: Set(payload.business_name.trim().to_string()),
        category: Set(payload.category.trim().to_string()),
        message: Set(payload.message),
        status: Set(ApplicationStatus::Pending.as_str().to_string()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "event_apply",
        "event_applications",
        serde_json::json!({ "event_id": event.id, "application_id": application.id }),
    )
    .await;

    Ok(ApiResponse::ok("Application submitted", application.into()))
}
