use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::sales_window::{self, DeliveryFeeMode, SalesWindowStatus, WindowDraft},
    dto::sales_windows::{
        BulkWindowProductsRequest, CreateSalesWindowRequest, FulfillmentGroup, FulfillmentPicker,
        GenerateSlotsRequest, SalesWindowDetail, SalesWindowList, SlotList, StorefrontWindow,
        UpdateSalesWindowRequest, WindowProductList,
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        sales_window_metrics::{
            ActiveModel as MetricsActive, Column as MetricsCol, Entity as Metrics,
        },
        sales_window_products::{
            ActiveModel as WindowProductActive, Column as WindowProductCol,
            Entity as WindowProducts,
        },
        sales_window_slots::{ActiveModel as SlotActive, Column as SlotCol, Entity as Slots},
        sales_windows::{
            ActiveModel as WindowActive, Column as WindowCol, Entity as SalesWindows,
            Model as WindowModel,
        },
        vendor_profiles::Entity as VendorProfiles,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{SalesWindow, SalesWindowMetrics, SalesWindowProduct, SalesWindowSlot},
    response::{ApiResponse, Meta},
    routes::params::SalesWindowQuery,
    services::vendor_service::require_vendor,
    state::AppState,
};

fn utc(value: Option<DateTimeWithTimeZone>) -> Option<DateTime<Utc>> {
    value.map(|dt| dt.with_timezone(&Utc))
}

fn tz(value: Option<DateTime<Utc>>) -> Option<DateTimeWithTimeZone> {
    value.map(Into::into)
}

pub(crate) fn window_status(window: &WindowModel) -> AppResult<SalesWindowStatus> {
    window.status.parse()
}

fn draft_of(window: &WindowModel) -> AppResult<WindowDraft> {
    Ok(WindowDraft {
        window_type: window.window_type.parse()?,
        name: window.name.clone(),
        epicenter_address: window.epicenter_address.clone(),
        radius_miles: window.radius_miles,
        delivery_fee_mode: window.delivery_fee_mode.parse()?,
        delivery_fee_cents: window.delivery_fee_cents,
        free_over_cents: window.free_over_cents,
        preorder_open_at: utc(window.preorder_open_at),
        preorder_close_at: utc(window.preorder_close_at),
        fulfill_start_at: utc(window.fulfill_start_at),
        fulfill_end_at: utc(window.fulfill_end_at),
        capacity_total: window.capacity_total,
        max_items_total: window.max_items_total,
    })
}

fn apply_draft(active: &mut WindowActive, draft: WindowDraft) {
    active.window_type = Set(draft.window_type.as_str().to_string());
    active.name = Set(draft.name.trim().to_string());
    active.epicenter_address = Set(draft.epicenter_address);
    active.radius_miles = Set(draft.radius_miles);
    active.delivery_fee_mode = Set(draft.delivery_fee_mode.as_str().to_string());
    active.delivery_fee_cents = Set(draft.delivery_fee_cents);
    active.free_over_cents = Set(draft.free_over_cents);
    active.preorder_open_at = Set(tz(draft.preorder_open_at));
    active.preorder_close_at = Set(tz(draft.preorder_close_at));
    active.fulfill_start_at = Set(tz(draft.fulfill_start_at));
    active.fulfill_end_at = Set(tz(draft.fulfill_end_at));
    active.capacity_total = Set(draft.capacity_total);
    active.max_items_total = Set(draft.max_items_total);
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    vendor_id: Uuid,
    id: Uuid,
    lock: bool,
) -> AppResult<WindowModel> {
    let mut finder = SalesWindows::find_by_id(id).filter(WindowCol::VendorId.eq(vendor_id));
    if lock {
        finder = finder.lock(LockType::Update);
    }
    finder.one(conn).await?.ok_or(AppError::NotFound)
}

/// Loads products, slots and metrics for each window, keeping the input order.
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    windows: Vec<WindowModel>,
    active_products_only: bool,
) -> AppResult<Vec<SalesWindowDetail>> {
    if windows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = windows.iter().map(|w| w.id).collect();

    let mut product_finder =
        WindowProducts::find().filter(WindowProductCol::SalesWindowId.is_in(ids.clone()));
    if active_products_only {
        product_finder = product_finder.filter(WindowProductCol::Active.eq(true));
    }
    let mut products: HashMap<Uuid, Vec<SalesWindowProduct>> = HashMap::new();
    for row in product_finder.all(conn).await? {
        products
            .entry(row.sales_window_id)
            .or_default()
            .push(row.into());
    }

    let mut slots: HashMap<Uuid, Vec<SalesWindowSlot>> = HashMap::new();
    for row in Slots::find()
        .filter(SlotCol::SalesWindowId.is_in(ids.clone()))
        .order_by_asc(SlotCol::StartsAt)
        .all(conn)
        .await?
    {
        slots.entry(row.sales_window_id).or_default().push(row.into());
    }

    let mut metrics: HashMap<Uuid, SalesWindowMetrics> = Metrics::find()
        .filter(MetricsCol::SalesWindowId.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.sales_window_id, SalesWindowMetrics::from(m)))
        .collect();

    Ok(windows
        .into_iter()
        .map(|window| SalesWindowDetail {
            products: products.remove(&window.id).unwrap_or_default(),
            slots: slots.remove(&window.id).unwrap_or_default(),
            metrics: metrics.remove(&window.id).unwrap_or_default(),
            window: window.into(),
        })
        .collect())
}

async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    window: WindowModel,
) -> AppResult<SalesWindowDetail> {
    load_details(conn, vec![window], false)
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

async fn insert_metrics<C: ConnectionTrait>(conn: &C, window_id: Uuid) -> AppResult<()> {
    MetricsActive {
        sales_window_id: Set(window_id),
        orders_count: Set(0),
        items_count: Set(0),
        revenue: Set(0),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// A window cannot be (re)opened once it has sold its item allowance.
async fn guard_open<C: ConnectionTrait>(
    conn: &C,
    window_id: Uuid,
    max_items_total: Option<i32>,
) -> AppResult<()> {
    let Some(max_items) = max_items_total else {
        return Ok(());
    };
    let sold = Metrics::find_by_id(window_id)
        .one(conn)
        .await?
        .map(|m| m.items_count)
        .unwrap_or(0);
    if sold >= max_items {
        return Err(AppError::BadRequest(
            "Sales window has reached max_items_total".into(),
        ));
    }
    Ok(())
}

pub async fn list_windows(
    state: &AppState,
    user: &AuthUser,
    query: SalesWindowQuery,
) -> AppResult<ApiResponse<SalesWindowList>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(WindowCol::VendorId.eq(vendor.id));
    if let Some(status) = query.status {
        condition = condition.add(WindowCol::Status.eq(status.as_str()));
    }
    if let Some(window_type) = query.window_type {
        condition = condition.add(WindowCol::WindowType.eq(window_type.as_str()));
    }
    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(Expr::col(WindowCol::Name).ilike(format!("%{}%", search.trim())));
    }

    let finder = SalesWindows::find()
        .filter(condition)
        .order_by_desc(WindowCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(SalesWindow::from)
        .collect();

    Ok(ApiResponse::success(
        "Sales windows",
        SalesWindowList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_window(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSalesWindowRequest,
) -> AppResult<ApiResponse<SalesWindowDetail>> {
    let vendor = require_vendor(&state.orm, user).await?;

    let status = payload.status.unwrap_or(SalesWindowStatus::Draft);
    if status != SalesWindowStatus::Draft {
        sales_window::ensure_transition(SalesWindowStatus::Draft, status)?;
    }
    let draft = WindowDraft {
        window_type: payload.window_type,
        name: payload.name,
        epicenter_address: payload.epicenter_address,
        radius_miles: payload.radius_miles,
        delivery_fee_mode: payload.delivery_fee_mode.unwrap_or(DeliveryFeeMode::None),
        delivery_fee_cents: payload.delivery_fee_cents,
        free_over_cents: payload.free_over_cents,
        preorder_open_at: payload.preorder_open_at,
        preorder_close_at: payload.preorder_close_at,
        fulfill_start_at: payload.fulfill_start_at,
        fulfill_end_at: payload.fulfill_end_at,
        capacity_total: payload.capacity_total,
        max_items_total: payload.max_items_total,
    };
    draft.validate()?;

    let mut active = WindowActive {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor.id),
        description: Set(payload.description),
        status: Set(status.as_str().to_string()),
        location_name: Set(payload.location_name),
        address_text: Set(payload.address_text),
        is_always_on: Set(payload.is_always_on.unwrap_or(false)),
        auto_close_when_full: Set(payload.auto_close_when_full.unwrap_or(true)),
        pickup_instructions: Set(payload.pickup_instructions),
        ..Default::default()
    };
    apply_draft(&mut active, draft);

    let txn = state.orm.begin().await?;
    let window = active.insert(&txn).await?;
    insert_metrics(&txn, window.id).await?;
    let detail = load_detail(&txn, window).await?;
    txn.commit().await?;

    tracing::info!(window_id = %detail.window.id, vendor_id = %vendor.id, "sales window created");
    audit::record(
        state,
        Some(user.user_id),
        "sales_window_create",
        "sales_windows",
        serde_json::json!({ "sales_window_id": detail.window.id }),
    )
    .await;

    Ok(ApiResponse::ok("Sales window created", detail))
}

pub async fn get_window(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SalesWindowDetail>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let window = find_owned(&state.orm, vendor.id, id, false).await?;
    let detail = load_detail(&state.orm, window).await?;
    Ok(ApiResponse::ok("Sales window", detail))
}

pub async fn update_window(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSalesWindowRequest,
) -> AppResult<ApiResponse<SalesWindowDetail>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, vendor.id, id, true).await?;
    let current = window_status(&existing)?;
    if current.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Sales window is {current} and can no longer be edited"
        )));
    }

    let next_status = match payload.status {
        Some(next) if next != current => {
            sales_window::ensure_transition(current, next)?;
            Some(next)
        }
        _ => None,
    };

    let base = draft_of(&existing)?;
    let draft = WindowDraft {
        window_type: payload.window_type.unwrap_or(base.window_type),
        name: payload.name.unwrap_or(base.name),
        epicenter_address: payload.epicenter_address.or(base.epicenter_address),
        radius_miles: payload.radius_miles.or(base.radius_miles),
        delivery_fee_mode: payload.delivery_fee_mode.unwrap_or(base.delivery_fee_mode),
        delivery_fee_cents: payload.delivery_fee_cents.or(base.delivery_fee_cents),
        free_over_cents: payload.free_over_cents.or(base.free_over_cents),
        preorder_open_at: payload.preorder_open_at.or(base.preorder_open_at),
        preorder_close_at: payload.preorder_close_at.or(base.preorder_close_at),
        fulfill_start_at: payload.fulfill_start_at.or(base.fulfill_start_at),
        fulfill_end_at: payload.fulfill_end_at.or(base.fulfill_end_at),
        capacity_total: payload.capacity_total.or(base.capacity_total),
        max_items_total: payload.max_items_total.or(base.max_items_total),
    };
    draft.validate()?;
    if next_status == Some(SalesWindowStatus::Open) {
        guard_open(&txn, existing.id, draft.max_items_total).await?;
    }

    let mut active: WindowActive = existing.into();
    apply_draft(&mut active, draft);
    if let Some(status) = next_status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(location) = payload.location_name {
        active.location_name = Set(Some(location));
    }
    if let Some(address) = payload.address_text {
        active.address_text = Set(Some(address));
    }
    if let Some(always_on) = payload.is_always_on {
        active.is_always_on = Set(always_on);
    }
    if let Some(auto_close) = payload.auto_close_when_full {
        active.auto_close_when_full = Set(auto_close);
    }
    if let Some(instructions) = payload.pickup_instructions {
        active.pickup_instructions = Set(Some(instructions));
    }
    active.updated_at = Set(Utc::now().into());

    let window = active.update(&txn).await?;
    let detail = load_detail(&txn, window).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "sales_window_update",
        "sales_windows",
        serde_json::json!({
            "sales_window_id": id,
            "status": next_status.map(|s| s.as_str()),
        }),
    )
    .await;

    Ok(ApiResponse::ok("Sales window updated", detail))
}

/// Moves a window along its lifecycle (open, close, cancel, fulfill).
pub async fn transition_window(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    to: SalesWindowStatus,
) -> AppResult<ApiResponse<SalesWindowDetail>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let txn = state.orm.begin().await?;
    let window = find_owned(&txn, vendor.id, id, true).await?;
    let from = window_status(&window)?;
    sales_window::ensure_transition(from, to)?;
    if to == SalesWindowStatus::Open {
        guard_open(&txn, window.id, window.max_items_total).await?;
    }

    let mut active: WindowActive = window.into();
    active.status = Set(to.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let window = active.update(&txn).await?;
    let detail = load_detail(&txn, window).await?;
    txn.commit().await?;

    tracing::info!(window_id = %id, %from, %to, "sales window status changed");
    audit::record(
        state,
        Some(user.user_id),
        "sales_window_status",
        "sales_windows",
        serde_json::json!({ "sales_window_id": id, "from": from, "to": to }),
    )
    .await;

    Ok(ApiResponse::ok(format!("Sales window {to}"), detail))
}

pub async fn duplicate_window(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SalesWindowDetail>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let txn = state.orm.begin().await?;
    let source = find_owned(&txn, vendor.id, id, false).await?;

    let mut draft = draft_of(&source)?;
    draft.name = format!("{} (Copy)", source.name);
    draft.validate()?;

    let mut active = WindowActive {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor.id),
        description: Set(source.description.clone()),
        status: Set(SalesWindowStatus::Draft.as_str().to_string()),
        location_name: Set(source.location_name.clone()),
        address_text: Set(source.address_text.clone()),
        is_always_on: Set(source.is_always_on),
        auto_close_when_full: Set(source.auto_close_when_full),
        pickup_instructions: Set(source.pickup_instructions.clone()),
        ..Default::default()
    };
    apply_draft(&mut active, draft);
    let copy = active.insert(&txn).await?;
    insert_metrics(&txn, copy.id).await?;

    let attachments: Vec<WindowProductActive> = WindowProducts::find()
        .filter(WindowProductCol::SalesWindowId.eq(source.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|row| WindowProductActive {
            id: Set(Uuid::new_v4()),
            sales_window_id: Set(copy.id),
            product_id: Set(row.product_id),
            price_override: Set(row.price_override),
            qty_limit_per_customer: Set(row.qty_limit_per_customer),
            active: Set(row.active),
        })
        .collect();
    if !attachments.is_empty() {
        WindowProducts::insert_many(attachments).exec(&txn).await?;
    }

    let detail = load_detail(&txn, copy).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "sales_window_duplicate",
        "sales_windows",
        serde_json::json!({ "source_id": id, "sales_window_id": detail.window.id }),
    )
    .await;

    Ok(ApiResponse::ok("Sales window duplicated", detail))
}

pub async fn set_window_products(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: BulkWindowProductsRequest,
) -> AppResult<ApiResponse<WindowProductList>> {
    let vendor = require_vendor(&state.orm, user).await?;

    let mut seen = HashSet::new();
    for input in &payload.products {
        if !seen.insert(input.product_id) {
            return Err(AppError::BadRequest(format!(
                "Product {} is listed more than once",
                input.product_id
            )));
        }
        if input.price_override.is_some_and(|p| p < 0) {
            return Err(AppError::BadRequest("price_override must not be negative".into()));
        }
        if input.qty_limit_per_customer.is_some_and(|q| q <= 0) {
            return Err(AppError::BadRequest(
                "qty_limit_per_customer must be positive".into(),
            ));
        }
    }

    let txn = state.orm.begin().await?;
    let window = find_owned(&txn, vendor.id, id, true).await?;
    if window_status(&window)?.is_terminal() {
        return Err(AppError::Conflict("Sales window can no longer be edited".into()));
    }

    let ids: Vec<Uuid> = seen.into_iter().collect();
    if !ids.is_empty() {
        let owned = Products::find()
            .filter(ProdCol::Id.is_in(ids.clone()))
            .filter(ProdCol::VendorId.eq(vendor.id))
            .count(&txn)
            .await?;
        if owned as usize != ids.len() {
            return Err(AppError::BadRequest(
                "Every product must belong to this vendor".into(),
            ));
        }
    }

    WindowProducts::delete_many()
        .filter(WindowProductCol::SalesWindowId.eq(window.id))
        .exec(&txn)
        .await?;

    let rows: Vec<WindowProductActive> = payload
        .products
        .iter()
        .map(|input| WindowProductActive {
            id: Set(Uuid::new_v4()),
            sales_window_id: Set(window.id),
            product_id: Set(input.product_id),
            price_override: Set(input.price_override),
            qty_limit_per_customer: Set(input.qty_limit_per_customer),
            active: Set(input.active.unwrap_or(true)),
        })
        .collect();
    if !rows.is_empty() {
        WindowProducts::insert_many(rows).exec(&txn).await?;
    }

    let items = WindowProducts::find()
        .filter(WindowProductCol::SalesWindowId.eq(window.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(SalesWindowProduct::from)
        .collect();
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "sales_window_products",
        "sales_windows",
        serde_json::json!({ "sales_window_id": id, "count": payload.products.len() }),
    )
    .await;

    Ok(ApiResponse::ok("Sales window products saved", WindowProductList { items }))
}

pub async fn generate_slots(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: GenerateSlotsRequest,
) -> AppResult<ApiResponse<SlotList>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let plan = sales_window::generate_slots(
        payload.start_time,
        payload.end_time,
        payload.slot_length_min,
        payload.slot_capacity,
    )?;

    let txn = state.orm.begin().await?;
    let window = find_owned(&txn, vendor.id, id, true).await?;
    if window_status(&window)?.is_terminal() {
        return Err(AppError::Conflict("Sales window can no longer be edited".into()));
    }

    let reserved = Slots::find()
        .filter(SlotCol::SalesWindowId.eq(window.id))
        .filter(SlotCol::Reserved.gt(0))
        .count(&txn)
        .await?;
    if reserved > 0 {
        return Err(AppError::Conflict(
            "Slots with reservations cannot be regenerated".into(),
        ));
    }

    Slots::delete_many()
        .filter(SlotCol::SalesWindowId.eq(window.id))
        .exec(&txn)
        .await?;
    let rows: Vec<SlotActive> = plan
        .iter()
        .map(|slot| SlotActive {
            id: Set(Uuid::new_v4()),
            sales_window_id: Set(window.id),
            starts_at: Set(slot.starts_at.into()),
            ends_at: Set(slot.ends_at.into()),
            capacity: Set(slot.capacity),
            reserved: Set(0),
        })
        .collect();
    Slots::insert_many(rows).exec(&txn).await?;

    let items = Slots::find()
        .filter(SlotCol::SalesWindowId.eq(window.id))
        .order_by_asc(SlotCol::StartsAt)
        .all(&txn)
        .await?
        .into_iter()
        .map(SalesWindowSlot::from)
        .collect();
    txn.commit().await?;

    tracing::info!(window_id = %id, slots = plan.len(), "slots generated");
    audit::record(
        state,
        Some(user.user_id),
        "sales_window_slots",
        "sales_windows",
        serde_json::json!({ "sales_window_id": id, "count": plan.len() }),
    )
    .await;

    Ok(ApiResponse::ok("Slots generated", SlotList { items }))
}

/// Storefront view of a vendor's upcoming windows, grouped by fulfillment date.
pub async fn fulfillment_picker(
    state: &AppState,
    vendor_id: Uuid,
) -> AppResult<ApiResponse<FulfillmentPicker>> {
    VendorProfiles::find_by_id(vendor_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let listed: Vec<&str> = SalesWindowStatus::ALL
        .iter()
        .filter(|s| s.is_listed())
        .map(|s| s.as_str())
        .collect();
    let windows = SalesWindows::find()
        .filter(WindowCol::VendorId.eq(vendor_id))
        .filter(WindowCol::Status.is_in(listed))
        .filter(
            Condition::any()
                .add(WindowCol::FulfillEndAt.is_null())
                .add(WindowCol::FulfillEndAt.gt(Utc::now())),
        )
        .order_by_asc(WindowCol::FulfillStartAt)
        .all(&state.orm)
        .await?;

    let storefront: Vec<StorefrontWindow> = load_details(&state.orm, windows, true)
        .await?
        .into_iter()
        .map(StorefrontWindow::from)
        .collect();
    let groups = sales_window::group_by_fulfillment_date(storefront, |d| {
        (d.window.fulfill_start_at, d.window.is_always_on)
    })
    .into_iter()
    .map(|(date, windows)| FulfillmentGroup { date, windows })
    .collect();

    Ok(ApiResponse::ok(
        "Sales windows",
        FulfillmentPicker { vendor_id, groups },
    ))
}
