//! Scheduling rules for sales windows: field invariants, the status
//! lifecycle, pickup slot generation and the fulfillment-date grouping used
//! by the storefront picker.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;

pub const MAX_SLOTS: usize = 500;
pub const ALWAYS_ON_KEY: &str = "always-on";
pub const UNSCHEDULED_KEY: &str = "unscheduled";

text_enum! {
    SalesWindowType {
        ParkPickup => "park_pickup",
        Delivery => "delivery",
        Consignment => "consignment",
        Wholesale => "wholesale",
        Market => "market",
        PorchPickup => "porch_pickup",
        KioskPickup => "kiosk_pickup",
        ServiceGreenfield => "service_greenfield",
    }
}

text_enum! {
    SalesWindowStatus {
        Draft => "draft",
        Scheduled => "scheduled",
        Open => "open",
        Closed => "closed",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
    }
}

text_enum! {
    DeliveryFeeMode {
        None => "none",
        Flat => "flat",
        FreeOver => "free_over",
    }
}

impl SalesWindowStatus {
    pub fn can_transition(&self, to: SalesWindowStatus) -> bool {
        use SalesWindowStatus::*;
        matches!(
            (self, to),
            (Draft, Scheduled)
                | (Draft, Open)
                | (Draft, Cancelled)
                | (Scheduled, Open)
                | (Scheduled, Cancelled)
                | (Open, Closed)
                | (Open, Cancelled)
                | (Closed, Open)
                | (Closed, Fulfilled)
                | (Closed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SalesWindowStatus::Fulfilled | SalesWindowStatus::Cancelled)
    }

    /// Statuses a customer can see on a vendor's storefront.
    pub fn is_listed(&self) -> bool {
        matches!(self, SalesWindowStatus::Scheduled | SalesWindowStatus::Open)
    }
}

pub fn ensure_transition(from: SalesWindowStatus, to: SalesWindowStatus) -> Result<(), AppError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Sales window cannot move from {from} to {to}"
        )))
    }
}

/// The fields of a sales window that carry invariants, after any update has been merged.
#[derive(Debug, Clone)]
pub struct WindowDraft {
    pub window_type: SalesWindowType,
    pub name: String,
    pub epicenter_address: Option<String>,
    pub radius_miles: Option<f64>,
    pub delivery_fee_mode: DeliveryFeeMode,
    pub delivery_fee_cents: Option<i64>,
    pub free_over_cents: Option<i64>,
    pub preorder_open_at: Option<DateTime<Utc>>,
    pub preorder_close_at: Option<DateTime<Utc>>,
    pub fulfill_start_at: Option<DateTime<Utc>>,
    pub fulfill_end_at: Option<DateTime<Utc>>,
    pub capacity_total: Option<i32>,
    pub max_items_total: Option<i32>,
}

impl WindowDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > 255 {
            return Err(bad("name must be between 1 and 255 characters"));
        }
        if let (Some(open), Some(close)) = (self.preorder_open_at, self.preorder_close_at) {
            if close <= open {
                return Err(bad("preorder_close_at must be after preorder_open_at"));
            }
        }
        if let (Some(start), Some(end)) = (self.fulfill_start_at, self.fulfill_end_at) {
            if end <= start {
                return Err(bad("fulfill_end_at must be after fulfill_start_at"));
            }
        }
        if self.radius_miles.is_some_and(|r| !(r > 0.0)) {
            return Err(bad("radius_miles must be positive"));
        }
        if self.capacity_total.is_some_and(|c| c <= 0) {
            return Err(bad("capacity_total must be positive"));
        }
        if self.max_items_total.is_some_and(|m| m <= 0) {
            return Err(bad("max_items_total must be positive"));
        }
        if self.delivery_fee_cents.is_some_and(|f| f < 0) {
            return Err(bad("delivery_fee_cents cannot be negative"));
        }
        if self.free_over_cents.is_some_and(|f| f < 0) {
            return Err(bad("free_over_cents cannot be negative"));
        }
        if self.window_type == SalesWindowType::Delivery
            && self
                .epicenter_address
                .as_deref()
                .is_none_or(|a| a.trim().is_empty())
        {
            return Err(bad("delivery windows require an epicenter_address"));
        }
        match self.delivery_fee_mode {
            DeliveryFeeMode::None => {}
            DeliveryFeeMode::Flat => {
                if self.delivery_fee_cents.is_none() {
                    return Err(bad("flat delivery fee requires delivery_fee_cents"));
                }
            }
            DeliveryFeeMode::FreeOver => {
                if self.delivery_fee_cents.is_none() || self.free_over_cents.is_none() {
                    return Err(bad(
                        "free_over delivery fee requires delivery_fee_cents and free_over_cents",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn bad(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

/// Delivery fee owed for an order with the given subtotal.
pub fn delivery_fee(
    mode: DeliveryFeeMode,
    fee_cents: Option<i64>,
    free_over_cents: Option<i64>,
    subtotal: i64,
) -> i64 {
    match mode {
        DeliveryFeeMode::None => 0,
        DeliveryFeeMode::Flat => fee_cents.unwrap_or(0),
        DeliveryFeeMode::FreeOver => match free_over_cents {
            Some(threshold) if subtotal >= threshold => 0,
            _ => fee_cents.unwrap_or(0),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPlan {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
}

/// Back-to-back slots covering `[start, end)`; the final slot is cut short at `end`.
pub fn generate_slots(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slot_length_min: i64,
    capacity: i32,
) -> Result<Vec<SlotPlan>, AppError> {
    if slot_length_min <= 0 {
        return Err(bad("slot_length_min must be positive"));
    }
    if capacity <= 0 {
        return Err(bad("slot_capacity must be positive"));
    }
    if end <= start {
        return Err(bad("end_time must be after start_time"));
    }
    let step = Duration::try_minutes(slot_length_min)
        .ok_or_else(|| bad("slot_length_min is too large"))?;

    // Any sub-second remainder still produces a trailing slot.
    let span = end - start;
    let span_secs = span.num_seconds() + i64::from(span.subsec_nanos() > 0);
    let count = (span_secs - 1) / step.num_seconds() + 1;
    if count > MAX_SLOTS as i64 {
        return Err(bad("too many slots; use a longer slot_length_min"));
    }

    let mut slots = Vec::with_capacity(count as usize);
    let mut cursor = start;
    while cursor < end {
        let next = cursor
            .checked_add_signed(step)
            .map_or(end, |next| next.min(end));
        slots.push(SlotPlan {
            starts_at: cursor,
            ends_at: next,
            capacity,
        });
        cursor = next;
    }
    Ok(slots)
}

/// Grouping key for the fulfillment picker.
pub fn fulfillment_date_key(fulfill_start_at: Option<DateTime<Utc>>, is_always_on: bool) -> String {
    match fulfill_start_at {
        Some(start) => start.format("%Y-%m-%d").to_string(),
        None if is_always_on => ALWAYS_ON_KEY.to_string(),
        None => UNSCHEDULED_KEY.to_string(),
    }
}

/// Groups windows by fulfillment date. Dated groups come first in date order,
/// then always-on, then unscheduled; each group is ordered by start time.
pub fn group_by_fulfillment_date<T>(
    windows: Vec<T>,
    schedule: impl Fn(&T) -> (Option<DateTime<Utc>>, bool),
) -> Vec<(String, Vec<T>)> {
    let mut dated: BTreeMap<String, Vec<T>> = BTreeMap::new();
    let mut always_on = Vec::new();
    let mut unscheduled = Vec::new();

    for window in windows {
        let (start, is_always_on) = schedule(&window);
        match fulfillment_date_key(start, is_always_on) {
            key if key == ALWAYS_ON_KEY => always_on.push(window),
            key if key == UNSCHEDULED_KEY => unscheduled.push(window),
            key => dated.entry(key).or_default().push(window),
        }
    }

    let mut groups: Vec<(String, Vec<T>)> = dated.into_iter().collect();
    for (_, group) in groups.iter_mut() {
        group.sort_by_key(|w| schedule(w).0);
    }
    if !always_on.is_empty() {
        groups.push((ALWAYS_ON_KEY.to_string(), always_on));
    }
    if !unscheduled.is_empty() {
        groups.push((UNSCHEDULED_KEY.to_string(), unscheduled));
    }
    groups
}
