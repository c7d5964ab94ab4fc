use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::roles::{Role, UserStatus},
    dto::{
        admin::{
            AuditLogList, ImpersonateRequest, ImpersonationResponse, UserAction,
            UserActionRequest, UserActionResult, UserList,
        },
        orders::{OrderList, OrderWithItems},
        products::ProductList,
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{Column as OrderCol, Entity as Orders},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AuditLog, Order, User},
    response::{ApiResponse, Meta},
    routes::params::{AuditLogQuery, LowStockQuery, OrderListQuery, SortOrder, UserListQuery},
    services::{auth_service::issue_token, order_service::with_items, product_service},
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role.as_str()));
    }
    if let Some(status) = query.status {
        condition = condition.add(UserCol::Status.eq(status.as_str()));
    }
    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::Email).ilike(pattern.clone()))
                .add(Expr::col(UserCol::DisplayName).ilike(pattern)),
        );
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn apply_user_action(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UserActionRequest,
) -> AppResult<ApiResponse<UserActionResult>> {
    ensure_admin(user)?;
    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let target_role = target.role.parse::<Role>()?;
    let now = Utc::now();

    let mut active: UserActive = target.clone().into();
    match payload.action {
        UserAction::Suspend => {
            if target.id == user.user_id {
                return Err(AppError::BadRequest("Admins cannot suspend themselves".into()));
            }
            if target_role == Role::Admin {
                return Err(AppError::Forbidden);
            }
            active.status = Set(UserStatus::Suspended.as_str().to_string());
            active.token_version = Set(target.token_version + 1);
        }
        UserAction::Reinstate => {
            active.status = Set(UserStatus::Active.as_str().to_string());
        }
        UserAction::VerifyEmail => {
            active.email_verified = Set(true);
            active.email_verified_at = Set(Some(now.into()));
        }
        UserAction::ForceLogout => {
            active.token_version = Set(target.token_version + 1);
        }
    }
    active.updated_at = Set(now.into());
    let updated = active.update(&state.orm).await?;

    tracing::info!(
        admin_id = %user.user_id,
        target_id = %id,
        action = payload.action.audit_action(),
        "admin user action"
    );
    audit::record(
        state,
        Some(user.user_id),
        payload.action.audit_action(),
        "users",
        serde_json::json!({ "target_user_id": id, "reason": payload.reason }),
    )
    .await;

    Ok(ApiResponse::ok(
        "User updated",
        UserActionResult {
            action: payload.action,
            user: updated.into(),
        },
    ))
}

pub async fn impersonate(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ImpersonateRequest,
) -> AppResult<ApiResponse<ImpersonationResponse>> {
    ensure_admin(user)?;
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("A reason is required to impersonate".into()));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if target.role.parse::<Role>()? == Role::Admin {
        return Err(AppError::Forbidden);
    }
    if target.status.parse::<UserStatus>()? != UserStatus::Active {
        return Err(AppError::BadRequest("Only active users can be impersonated".into()));
    }

    let (token, expires_at) = issue_token(
        &state.config.jwt_secret,
        &target,
        Some(user.user_id),
        Duration::minutes(state.config.impersonation_ttl_minutes),
    )?;

    tracing::info!(admin_id = %user.user_id, target_id = %id, "impersonation started");
    audit::record(
        state,
        Some(user.user_id),
        "admin.impersonate",
        "users",
        serde_json::json!({ "target_user_id": id, "reason": reason }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Impersonation token issued",
        ImpersonationResponse {
            token: format!("Bearer {}", token),
            expires_at,
            user: target.into(),
        },
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(window_id) = query.sales_window_id {
        condition = condition.add(OrderCol::SalesWindowId.eq(window_id));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Order found",
        with_items(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(action) = query.action.as_ref().filter(|a| !a.is_empty()) {
        condition = condition.add(AuditCol::Action.eq(action.as_str()));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(AuditCol::UserId.eq(user_id));
    }

    let finder = AuditLogs::find()
        .filter(condition)
        .order_by_desc(AuditCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(AuditLog::from)
        .collect();

    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Low stock across every vendor.
pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    product_service::low_stock(state, None, query).await
}
