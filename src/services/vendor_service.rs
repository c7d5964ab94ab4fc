use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{roles::Role, slug},
    dto::vendors::{CreateVendorProfileRequest, UpdateVendorProfileRequest, VendorList},
    entity::vendor_profiles::{
        ActiveModel as VendorActive, Column as VendorCol, Entity as VendorProfiles,
        Model as VendorModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::VendorProfile,
    response::{ApiResponse, Meta},
    routes::params::SearchQuery,
    state::AppState,
};

/// The calling vendor's profile; vendors must create one before selling.
pub async fn require_vendor<C: ConnectionTrait>(conn: &C, user: &AuthUser) -> AppResult<VendorModel> {
    ensure_role(user, Role::Vendor)?;
    VendorProfiles::find()
        .filter(VendorCol::UserId.eq(user.user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Vendor profile not found".into()))
}

async fn unique_slug(state: &AppState, store_name: &str, exclude: Option<Uuid>) -> AppResult<String> {
    let base = slug::slugify(store_name);
    let mut n = 1;
    loop {
        let candidate = slug::candidate(&base, n);
        let mut finder = VendorProfiles::find().filter(VendorCol::Slug.eq(candidate.as_str()));
        if let Some(id) = exclude {
            finder = finder.filter(VendorCol::Id.ne(id));
        }
        if finder.one(&state.orm).await?.is_none() {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn validate_store_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 120 {
        return Err(AppError::BadRequest(
            "store_name must be between 1 and 120 characters".into(),
        ));
    }
    Ok(name.to_string())
}

pub async fn create_profile(
    state: &AppState,
    user: &AuthUser,
    payload: CreateVendorProfileRequest,
) -> AppResult<ApiResponse<VendorProfile>> {
    ensure_role(user, Role::Vendor)?;
    let existing = VendorProfiles::find()
        .filter(VendorCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Vendor profile already exists".into()));
    }

    let store_name = validate_store_name(&payload.store_name)?;
    let slug = unique_slug(state, &store_name, None).await?;
    let profile = VendorActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        store_name: Set(store_name),
        slug: Set(slug),
        bio: Set(payload.bio),
        city: Set(payload.city),
        stripe_account_id: Set(payload.stripe_account_id.filter(|s| !s.trim().is_empty())),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "vendor_profile_create",
        "vendor_profiles",
        serde_json::json!({ "vendor_id": profile.id }),
    )
    .await;

    Ok(ApiResponse::ok("Vendor profile created", profile.into()))
}

pub async fn get_own_profile(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<VendorProfile>> {
    let profile = require_vendor(&state.orm, user).await?;
    Ok(ApiResponse::ok("Vendor profile", profile.into()))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateVendorProfileRequest,
) -> AppResult<ApiResponse<VendorProfile>> {
    let profile = require_vendor(&state.orm, user).await?;
    let profile_id = profile.id;
    let mut active: VendorActive = profile.into();

    if let Some(name) = payload.store_name {
        let name = validate_store_name(&name)?;
        active.slug = Set(unique_slug(state, &name, Some(profile_id)).await?);
        active.store_name = Set(name);
    }
    if let Some(bio) = payload.bio {
        active.bio = Set(Some(bio));
    }
    if let Some(city) = payload.city {
        active.city = Set(Some(city));
    }
    if let Some(account) = payload.stripe_account_id {
        active.stripe_account_id = Set(Some(account).filter(|s| !s.trim().is_empty()));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Vendor profile updated", updated.into()))
}

pub async fn list_vendors(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<VendorList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col(VendorCol::StoreName).ilike(pattern.clone()))
                .add(Expr::col(VendorCol::City).ilike(pattern)),
        );
    }

    let finder = VendorProfiles::find()
        .filter(condition)
        .order_by_asc(VendorCol::StoreName);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(VendorProfile::from)
        .collect();

    Ok(ApiResponse::success(
        "Vendors",
        VendorList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_vendor(state: &AppState, id: Uuid) -> AppResult<ApiResponse<VendorProfile>> {
    let profile = VendorProfiles::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok("Vendor", profile.into()))
}
