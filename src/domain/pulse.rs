//! Vendor Pulse: period summaries of sales.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PulsePeriod {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl PulsePeriod {
    pub fn length(&self) -> Duration {
        match self {
            PulsePeriod::Daily => Duration::days(1),
            PulsePeriod::Weekly => Duration::days(7),
            PulsePeriod::Monthly => Duration::days(30),
        }
    }

    /// `(previous_start, current_start, end)` for a period ending at `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
        let current_start = now - self.length();
        (current_start - self.length(), current_start, now)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PulseOrder {
    pub subtotal: i64,
    pub commission: i64,
    pub vendor_payout: i64,
}

#[derive(Debug, Clone)]
pub struct PulseItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PulseSummary {
    pub period: PulsePeriod,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub orders: i64,
    pub items_sold: i64,
    pub gross: i64,
    pub commission: i64,
    pub net_payout: i64,
    pub average_order_value: i64,
    pub previous_gross: i64,
    pub gross_change_pct: Option<f64>,
    pub top_products: Vec<TopProduct>,
}

pub fn summarize(
    period: PulsePeriod,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    orders: &[PulseOrder],
    items: &[PulseItem],
    previous_gross: i64,
) -> PulseSummary {
    let count = orders.len() as i64;
    let gross: i64 = orders.iter().map(|o| o.subtotal).sum();
    let commission: i64 = orders.iter().map(|o| o.commission).sum();
    let net_payout: i64 = orders.iter().map(|o| o.vendor_payout).sum();
    let items_sold: i64 = items.iter().map(|i| i64::from(i.quantity)).sum();
    let average_order_value = if count > 0 { gross / count } else { 0 };
    let gross_change_pct = if previous_gross > 0 {
        let change = (gross - previous_gross) as f64 / previous_gross as f64 * 100.0;
        Some((change * 10.0).round() / 10.0)
    } else {
        None
    };

    PulseSummary {
        period,
        from,
        to,
        orders: count,
        items_sold,
        gross,
        commission,
        net_payout,
        average_order_value,
        previous_gross,
        gross_change_pct,
        top_products: top_products(items, TOP_PRODUCTS),
    }
}

fn top_products(items: &[PulseItem], limit: usize) -> Vec<TopProduct> {
    let mut by_product: HashMap<Uuid, TopProduct> = HashMap::new();
    for item in items {
        let entry = by_product.entry(item.product_id).or_insert_with(|| TopProduct {
            product_id: item.product_id,
            name: item.product_name.clone(),
            quantity: 0,
            revenue: 0,
        });
        entry.quantity += i64::from(item.quantity);
        entry.revenue += item.price * i64::from(item.quantity);
    }
    let mut ranked: Vec<TopProduct> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}
