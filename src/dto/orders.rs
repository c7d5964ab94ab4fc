use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::checkout::FulfillmentStatus,
    models::{Order, OrderItem},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub sales_window_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub items: Vec<CheckoutItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub order_number: String,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FulfillmentUpdateRequest {
    pub status: FulfillmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct VendorOrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub in_progress_orders: i64,
    pub completed_orders: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub handled: bool,
}
