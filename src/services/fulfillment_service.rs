use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::checkout::{self, FulfillmentStatus, OrderStatus, PaymentStatus},
    dto::orders::{FulfillmentUpdateRequest, OrderList, OrderWithItems, VendorOrderStats},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        order_service::{release_order, with_items},
        vendor_service::require_vendor,
    },
    state::AppState,
};

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_orders: i64,
    pending_orders: i64,
    in_progress_orders: i64,
    completed_orders: i64,
    total_revenue: i64,
}

pub async fn list_vendor_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::VendorId.eq(vendor.id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(window_id) = query.sales_window_id {
        condition = condition.add(OrderCol::SalesWindowId.eq(window_id));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Vendor orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_vendor_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let order = Orders::find_by_id(id)
        .filter(OrderCol::VendorId.eq(vendor.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok("Order", with_items(&state.orm, order).await?))
}

pub async fn update_fulfillment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: FulfillmentUpdateRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .filter(OrderCol::VendorId.eq(vendor.id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = order.status.parse::<OrderStatus>()?;
    let payment = order.payment_status.parse::<PaymentStatus>()?;
    let next_status = checkout::order_status_after_fulfillment(current, payment, payload.status)?;

    if payload.status == FulfillmentStatus::Cancelled {
        release_order(&txn, &order).await?;
    }

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.fulfillment_status = Set(payload.status.as_str().to_string());
    active.status = Set(next_status.as_str().to_string());
    if let Some(notes) = payload.notes.filter(|n| !n.trim().is_empty()) {
        active.fulfillment_notes = Set(Some(notes));
    }
    match next_status {
        OrderStatus::Fulfilled => active.fulfilled_at = Set(Some(now.into())),
        OrderStatus::Cancelled => active.cancelled_at = Set(Some(now.into())),
        _ => {}
    }
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;
    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %id,
        fulfillment = %payload.status,
        status = %next_status,
        "fulfillment updated"
    );
    audit::record(
        state,
        Some(user.user_id),
        "order_fulfillment",
        "orders",
        serde_json::json!({ "order_id": id, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::ok("Fulfillment updated", data))
}

pub async fn vendor_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<VendorOrderStats>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let revenue_statuses: Vec<String> = OrderStatus::REVENUE
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

    let row = sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT
            COUNT(*)::BIGINT AS total_orders,
            COUNT(*) FILTER (WHERE fulfillment_status = 'pending' AND status <> 'cancelled')::BIGINT AS pending_orders,
            COUNT(*) FILTER (WHERE fulfillment_status IN ('in_progress', 'ready'))::BIGINT AS in_progress_orders,
            COUNT(*) FILTER (WHERE fulfillment_status = 'completed')::BIGINT AS completed_orders,
            COALESCE(SUM(subtotal) FILTER (WHERE status = ANY($2)), 0)::BIGINT AS total_revenue
        FROM orders
        WHERE vendor_id = $1
        "#,
    )
    .bind(vendor.id)
    .bind(&revenue_statuses)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::ok(
        "Vendor order stats",
        VendorOrderStats {
            total_orders: row.total_orders,
            pending_orders: row.pending_orders,
            in_progress_orders: row.in_progress_orders,
            completed_orders: row.completed_orders,
            total_revenue: row.total_revenue,
        },
    ))
}
