use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::sales_window::{DeliveryFeeMode, SalesWindowStatus, SalesWindowType},
    models::{SalesWindow, SalesWindowMetrics, SalesWindowProduct, SalesWindowSlot},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSalesWindowRequest {
    pub window_type: SalesWindowType,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<SalesWindowStatus>,
    pub location_name: Option<String>,
    pub address_text: Option<String>,
    pub epicenter_address: Option<String>,
    pub radius_miles: Option<f64>,
    pub delivery_fee_mode: Option<DeliveryFeeMode>,
    pub delivery_fee_cents: Option<i64>,
    pub free_over_cents: Option<i64>,
    pub preorder_open_at: Option<DateTime<Utc>>,
    pub preorder_close_at: Option<DateTime<Utc>>,
    pub fulfill_start_at: Option<DateTime<Utc>>,
    pub fulfill_end_at: Option<DateTime<Utc>>,
    pub is_always_on: Option<bool>,
    pub capacity_total: Option<i32>,
    pub max_items_total: Option<i32>,
    pub auto_close_when_full: Option<bool>,
    pub pickup_instructions: Option<String>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSalesWindowRequest {
    pub window_type: Option<SalesWindowType>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<SalesWindowStatus>,
    pub location_name: Option<String>,
    pub address_text: Option<String>,
    pub epicenter_address: Option<String>,
    pub radius_miles: Option<f64>,
    pub delivery_fee_mode: Option<DeliveryFeeMode>,
    pub delivery_fee_cents: Option<i64>,
    pub free_over_cents: Option<i64>,
    pub preorder_open_at: Option<DateTime<Utc>>,
    pub preorder_close_at: Option<DateTime<Utc>>,
    pub fulfill_start_at: Option<DateTime<Utc>>,
    pub fulfill_end_at: Option<DateTime<Utc>>,
    pub is_always_on: Option<bool>,
    pub capacity_total: Option<i32>,
    pub max_items_total: Option<i32>,
    pub auto_close_when_full: Option<bool>,
    pub pickup_instructions: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WindowProductInput {
    pub product_id: Uuid,
    pub price_override: Option<i64>,
    pub qty_limit_per_customer: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkWindowProductsRequest {
    pub products: Vec<WindowProductInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateSlotsRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub slot_length_min: i64,
    pub slot_capacity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesWindowDetail {
    pub window: SalesWindow,
    pub products: Vec<SalesWindowProduct>,
    pub slots: Vec<SalesWindowSlot>,
    pub metrics: SalesWindowMetrics,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SalesWindowList {
    #[schema(value_type = Vec<SalesWindow>)]
    pub items: Vec<SalesWindow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WindowProductList {
    pub items: Vec<SalesWindowProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotList {
    pub items: Vec<SalesWindowSlot>,
}

/// A slot as shoppers see it: how many orders it can still take.
#[derive(Debug, Serialize, ToSchema)]
pub struct StorefrontSlot {
    pub id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub available: i32,
}

impl From<SalesWindowSlot> for StorefrontSlot {
    fn from(slot: SalesWindowSlot) -> Self {
        Self {
            id: slot.id,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            available: (slot.capacity - slot.reserved).max(0),
        }
    }
}

/// Public view of a window. Sales metrics stay with the vendor.
#[derive(Debug, Serialize, ToSchema)]
pub struct StorefrontWindow {
    pub window: SalesWindow,
    pub products: Vec<SalesWindowProduct>,
    pub slots: Vec<StorefrontSlot>,
}

impl From<SalesWindowDetail> for StorefrontWindow {
    fn from(detail: SalesWindowDetail) -> Self {
        Self {
            window: detail.window,
            products: detail.products,
            slots: detail.slots.into_iter().map(StorefrontSlot::from).collect(),
        }
    }
}

/// Windows sharing a fulfillment date on the storefront picker.
#[derive(Debug, Serialize, ToSchema)]
pub struct FulfillmentGroup {
    pub date: String,
    pub windows: Vec<StorefrontWindow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FulfillmentPicker {
    pub vendor_id: Uuid,
    pub groups: Vec<FulfillmentGroup>,
}
