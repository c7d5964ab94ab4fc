use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    audit_logs, event_applications, events, order_items, orders, products, sales_window_metrics,
    sales_window_products, sales_window_slots, sales_windows, users, vendor_profiles,
};

fn utc(dt: DateTimeWithTimeZone) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

fn utc_opt(dt: Option<DateTimeWithTimeZone>) -> Option<DateTime<Utc>> {
    dt.map(utc)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub display_name: Option<String>,
    pub status: String,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            display_name: model.display_name,
            status: model.status,
            email_verified: model.email_verified,
            last_login_at: utc_opt(model.last_login_at),
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_name: String,
    pub slug: String,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub payments_connected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<vendor_profiles::Model> for VendorProfile {
    fn from(model: vendor_profiles::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            store_name: model.store_name,
            slug: model.slug,
            bio: model.bio,
            city: model.city,
            payments_connected: model.stripe_account_id.is_some(),
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub unit_cost: Option<i64>,
    pub target_margin: f64,
    pub stock: i32,
    pub is_available: bool,
    pub last_ai_suggestion: Option<i64>,
    pub ai_suggestion_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            vendor_id: model.vendor_id,
            name: model.name,
            description: model.description,
            price: model.price,
            unit_cost: model.unit_cost,
            target_margin: model.target_margin,
            stock: model.stock,
            is_available: model.is_available,
            last_ai_suggestion: model.last_ai_suggestion,
            ai_suggestion_note: model.ai_suggestion_note,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesWindow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub window_type: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub location_name: Option<String>,
    pub address_text: Option<String>,
    pub epicenter_address: Option<String>,
    pub radius_miles: Option<f64>,
    pub delivery_fee_mode: String,
    pub delivery_fee_cents: Option<i64>,
    pub free_over_cents: Option<i64>,
    pub preorder_open_at: Option<DateTime<Utc>>,
    pub preorder_close_at: Option<DateTime<Utc>>,
    pub fulfill_start_at: Option<DateTime<Utc>>,
    pub fulfill_end_at: Option<DateTime<Utc>>,
    pub is_always_on: bool,
    pub capacity_total: Option<i32>,
    pub max_items_total: Option<i32>,
    pub auto_close_when_full: bool,
    pub pickup_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<sales_windows::Model> for SalesWindow {
    fn from(model: sales_windows::Model) -> Self {
        Self {
            id: model.id,
            vendor_id: model.vendor_id,
            window_type: model.window_type,
            name: model.name,
            description: model.description,
            status: model.status,
            location_name: model.location_name,
            address_text: model.address_text,
            epicenter_address: model.epicenter_address,
            radius_miles: model.radius_miles,
            delivery_fee_mode: model.delivery_fee_mode,
            delivery_fee_cents: model.delivery_fee_cents,
            free_over_cents: model.free_over_cents,
            preorder_open_at: utc_opt(model.preorder_open_at),
            preorder_close_at: utc_opt(model.preorder_close_at),
            fulfill_start_at: utc_opt(model.fulfill_start_at),
            fulfill_end_at: utc_opt(model.fulfill_end_at),
            is_always_on: model.is_always_on,
            capacity_total: model.capacity_total,
            max_items_total: model.max_items_total,
            auto_close_when_full: model.auto_close_when_full,
            pickup_instructions: model.pickup_instructions,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesWindowProduct {
    pub id: Uuid,
    pub product_id: Uuid,
    pub price_override: Option<i64>,
    pub qty_limit_per_customer: Option<i32>,
    pub active: bool,
}

impl From<sales_window_products::Model> for SalesWindowProduct {
    fn from(model: sales_window_products::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            price_override: model.price_override,
            qty_limit_per_customer: model.qty_limit_per_customer,
            active: model.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesWindowSlot {
    pub id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
    pub reserved: i32,
}

impl From<sales_window_slots::Model> for SalesWindowSlot {
    fn from(model: sales_window_slots::Model) -> Self {
        Self {
            id: model.id,
            starts_at: utc(model.starts_at),
            ends_at: utc(model.ends_at),
            capacity: model.capacity,
            reserved: model.reserved,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SalesWindowMetrics {
    pub orders_count: i32,
    pub items_count: i32,
    pub revenue: i64,
}

impl From<sales_window_metrics::Model> for SalesWindowMetrics {
    fn from(model: sales_window_metrics::Model) -> Self {
        Self {
            orders_count: model.orders_count,
            items_count: model.items_count,
            revenue: model.revenue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vendor_id: Uuid,
    pub sales_window_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub subtotal: i64,
    pub tax: i64,
    pub delivery_fee: i64,
    pub total_amount: i64,
    pub commission_amount: i64,
    pub vendor_payout: i64,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub fulfillment_notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            vendor_id: model.vendor_id,
            sales_window_id: model.sales_window_id,
            slot_id: model.slot_id,
            order_number: model.order_number,
            status: model.status,
            payment_status: model.payment_status,
            fulfillment_status: model.fulfillment_status,
            subtotal: model.subtotal,
            tax: model.tax,
            delivery_fee: model.delivery_fee,
            total_amount: model.total_amount,
            commission_amount: model.commission_amount,
            vendor_payout: model.vendor_payout,
            payment_reference: model.payment_reference,
            notes: model.notes,
            fulfillment_notes: model.fulfillment_notes,
            paid_at: utc_opt(model.paid_at),
            fulfilled_at: utc_opt(model.fulfilled_at),
            cancelled_at: utc_opt(model.cancelled_at),
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            quantity: model.quantity,
            price: model.price,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub coordinator_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub venue: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_vendors: Option<i32>,
    pub categories: Vec<String>,
    pub rules: Option<String>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<events::Model> for Event {
    fn from(model: events::Model) -> Self {
        let categories = serde_json::from_value(model.categories).unwrap_or_default();
        Self {
            id: model.id,
            coordinator_id: model.coordinator_id,
            title: model.title,
            slug: model.slug,
            description: model.description,
            venue: model.venue,
            start_at: utc(model.start_at),
            end_at: utc(model.end_at),
            max_vendors: model.max_vendors,
            categories,
            rules: model.rules,
            status: model.status,
            published_at: utc_opt(model.published_at),
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventApplication {
    pub id: Uuid,
    pub event_id: Uuid,
    pub vendor_id: Uuid,
    pub business_name: String,
    pub category: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<event_applications::Model> for EventApplication {
    fn from(model: event_applications::Model) -> Self {
        Self {
            id: model.id,
            event_id: model.event_id,
            vendor_id: model.vendor_id,
            business_name: model.business_name,
            category: model.category,
            message: model.message,
            status: model.status,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<audit_logs::Model> for AuditLog {
    fn from(model: audit_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: utc(model.created_at),
        }
    }
}
