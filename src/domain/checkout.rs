use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

text_enum! {
    OrderStatus {
        Pending => "pending",
        Paid => "paid",
        Ready => "ready",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
    }
}

text_enum! {
    PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Failed => "failed",
    }
}

text_enum! {
    FulfillmentStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Ready => "ready",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    /// Orders that count towards vendor revenue.
    pub const REVENUE: [OrderStatus; 3] = [OrderStatus::Paid, OrderStatus::Ready, OrderStatus::Fulfilled];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub delivery_fee: i64,
    pub total: i64,
    pub commission: i64,
    pub vendor_payout: i64,
}

impl OrderTotals {
    /// `lines` are `(unit_price, quantity)` pairs in cents.
    pub fn compute(lines: &[(i64, i32)], tax_rate_bps: i64, commission_rate_bps: i64, delivery_fee: i64) -> Self {
        let subtotal: i64 = lines.iter().map(|(price, qty)| price * i64::from(*qty)).sum();
        let tax = apply_bps(subtotal, tax_rate_bps);
        let total = subtotal + tax + delivery_fee;
        let commission = apply_bps(total, commission_rate_bps);
        Self {
            subtotal,
            tax,
            delivery_fee,
            total,
            commission,
            vendor_payout: total - commission,
        }
    }
}

/// `amount * bps / 10_000`, rounded half up.
pub fn apply_bps(amount: i64, bps: i64) -> i64 {
    let scaled = i128::from(amount) * i128::from(bps);
    ((scaled + 5_000) / 10_000) as i64
}

pub fn build_order_number(order_id: Uuid, at: DateTime<Utc>) -> String {
    let date = at.format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    format!("CA-{}-{}", date, &suffix[..8])
}

/// Order status that follows from a vendor fulfillment update, or the reason it is refused.
pub fn order_status_after_fulfillment(
    order: OrderStatus,
    payment: PaymentStatus,
    next: FulfillmentStatus,
) -> Result<OrderStatus, AppError> {
    match order {
        OrderStatus::Cancelled => {
            return Err(AppError::Conflict("Order is cancelled".into()));
        }
        OrderStatus::Fulfilled => {
            return Err(AppError::Conflict("Order is already fulfilled".into()));
        }
        _ => {}
    }
    match next {
        FulfillmentStatus::Pending | FulfillmentStatus::InProgress => Ok(order),
        FulfillmentStatus::Ready => Ok(OrderStatus::Ready),
        FulfillmentStatus::Completed => {
            if payment != PaymentStatus::Paid {
                return Err(AppError::BadRequest(
                    "Order must be paid before it can be completed".into(),
                ));
            }
            Ok(OrderStatus::Fulfilled)
        }
        FulfillmentStatus::Cancelled => {
            if payment == PaymentStatus::Paid {
                return Err(AppError::Conflict("Paid orders cannot be cancelled".into()));
            }
            Ok(OrderStatus::Cancelled)
        }
    }
}
