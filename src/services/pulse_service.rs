use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::{
        checkout::OrderStatus,
        pulse::{self, PulseItem, PulseOrder, PulseSummary},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::PulseQuery,
    services::vendor_service::require_vendor,
    state::AppState,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    subtotal: i64,
    commission_amount: i64,
    vendor_payout: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    price: i64,
}

fn revenue_statuses() -> Vec<String> {
    OrderStatus::REVENUE
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

async fn gross_between(
    state: &AppState,
    vendor_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<i64> {
    let gross: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(subtotal), 0)::BIGINT
        FROM orders
        WHERE vendor_id = $1 AND status = ANY($2) AND created_at >= $3 AND created_at < $4
        "#,
    )
    .bind(vendor_id)
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;
    Ok(gross)
}

pub async fn vendor_pulse(
    state: &AppState,
    user: &AuthUser,
    query: PulseQuery,
) -> AppResult<ApiResponse<PulseSummary>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let period = query.period.unwrap_or_default();
    let (previous_start, from, to) = period.bounds(Utc::now());

    let orders: Vec<PulseOrder> = sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT subtotal, commission_amount, vendor_payout
        FROM orders
        WHERE vendor_id = $1 AND status = ANY($2) AND created_at >= $3 AND created_at < $4
        "#,
    )
    .bind(vendor.id)
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| PulseOrder {
        subtotal: row.subtotal,
        commission: row.commission_amount,
        vendor_payout: row.vendor_payout,
    })
    .collect();

    let items: Vec<PulseItem> = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT oi.product_id, oi.product_name, oi.quantity, oi.price
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.vendor_id = $1 AND o.status = ANY($2) AND o.created_at >= $3 AND o.created_at < $4
        "#,
    )
    .bind(vendor.id)
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| PulseItem {
        product_id: row.product_id,
        product_name: row.product_name,
        quantity: row.quantity,
        price: row.price,
    })
    .collect();

    let previous_gross = gross_between(state, vendor.id, previous_start, from).await?;
    let summary = pulse::summarize(period, from, to, &orders, &items, previous_gross);

    tracing::debug!(vendor_id = %vendor.id, orders = summary.orders, "pulse computed");
    Ok(ApiResponse::ok("Vendor pulse", summary))
}
