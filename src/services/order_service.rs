use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        checkout::{self, FulfillmentStatus, OrderStatus, OrderTotals, PaymentStatus},
        roles::Role,
        sales_window::{self, SalesWindowStatus},
    },
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems, PayOrderRequest},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Relation as OrderItemRel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
        sales_window_metrics::{ActiveModel as MetricsActive, Column as MetricsCol, Entity as Metrics},
        sales_window_products::{Column as WindowProductCol, Entity as WindowProducts},
        sales_window_slots::{Column as SlotCol, Entity as Slots},
        sales_windows::{ActiveModel as WindowActive, Entity as SalesWindows},
        vendor_profiles::Entity as VendorProfiles,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::sales_window_service::window_status,
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct PriorQuantity {
    product_id: Uuid,
    quantity: i64,
}

struct Line {
    product_id: Uuid,
    name: String,
    quantity: i32,
    price: i64,
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(OrderWithItems {
        order: order.into(),
        items,
    })
}

/// Records a successful payment. The flag is false when the order was already paid.
pub(crate) async fn mark_paid<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    reference: Option<String>,
) -> AppResult<(OrderModel, bool)> {
    if order.payment_status.parse::<PaymentStatus>()? == PaymentStatus::Paid {
        return Ok((order, false));
    }
    let status = order.status.parse::<OrderStatus>()?;
    if status == OrderStatus::Cancelled {
        return Err(AppError::Conflict("Order is cancelled".into()));
    }

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.payment_status = Set(PaymentStatus::Paid.as_str().to_string());
    if status == OrderStatus::Pending {
        active.status = Set(OrderStatus::Paid.as_str().to_string());
    }
    if reference.is_some() {
        active.payment_reference = Set(reference);
    }
    active.paid_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    Ok((active.update(conn).await?, true))
}

/// Gives back stock, the slot reservation and the window metrics held by `order`.
pub(crate) async fn release_order<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(conn)
        .await?;
    let mut quantity: i32 = 0;
    for item in &items {
        quantity += item.quantity;
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }

    if let Some(slot_id) = order.slot_id {
        Slots::update_many()
            .col_expr(
                SlotCol::Reserved,
                Expr::cust("GREATEST(reserved - 1, 0)"),
            )
            .filter(SlotCol::Id.eq(slot_id))
            .exec(conn)
            .await?;
    }

    Metrics::update_many()
        .col_expr(MetricsCol::OrdersCount, Expr::col(MetricsCol::OrdersCount).sub(1))
        .col_expr(MetricsCol::ItemsCount, Expr::col(MetricsCol::ItemsCount).sub(quantity))
        .col_expr(MetricsCol::Revenue, Expr::col(MetricsCol::Revenue).sub(order.subtotal))
        .col_expr(MetricsCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(MetricsCol::SalesWindowId.eq(order.sales_window_id))
        .exec(conn)
        .await?;
    Ok(())
}

fn ensure_preorder_open(
    open_at: Option<DateTime<Utc>>,
    close_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if open_at.is_some_and(|open| now < open) {
        return Err(AppError::BadRequest("Preorders have not opened yet".into()));
    }
    if close_at.is_some_and(|close| now >= close) {
        return Err(AppError::BadRequest("Preorders are closed".into()));
    }
    Ok(())
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_role(user, Role::Customer)?;
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Quantity must be positive".into()));
        }
        if requested.insert(item.product_id, item.quantity).is_some() {
            return Err(AppError::BadRequest(format!(
                "Product {} is listed more than once",
                item.product_id
            )));
        }
    }
    let product_ids: Vec<Uuid> = requested.keys().copied().collect();

    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let window = SalesWindows::find_by_id(payload.sales_window_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if window_status(&window)? != SalesWindowStatus::Open {
        return Err(AppError::BadRequest("Sales window is not open".into()));
    }
    ensure_preorder_open(
        window.preorder_open_at.map(|d| d.with_timezone(&Utc)),
        window.preorder_close_at.map(|d| d.with_timezone(&Utc)),
        now,
    )?;

    let vendor = VendorProfiles::find_by_id(window.vendor_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if vendor.stripe_account_id.is_none() {
        return Err(AppError::BadRequest(
            "Vendor is not connected to payments".into(),
        ));
    }

    let attachments: HashMap<Uuid, _> = WindowProducts::find()
        .filter(WindowProductCol::SalesWindowId.eq(window.id))
        .filter(WindowProductCol::ProductId.is_in(product_ids.clone()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|row| (row.product_id, row))
        .collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.clone()))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|row| (row.id, row))
        .collect();

    let prior: HashMap<Uuid, i64> = OrderItems::find()
        .select_only()
        .column(OrderItemCol::ProductId)
        .column_as(Expr::col(OrderItemCol::Quantity).sum(), "quantity")
        .join(JoinType::InnerJoin, OrderItemRel::Orders.def())
        .filter(OrderCol::UserId.eq(user.user_id))
        .filter(OrderCol::SalesWindowId.eq(window.id))
        .filter(OrderCol::Status.ne(OrderStatus::Cancelled.as_str()))
        .filter(OrderItemCol::ProductId.is_in(product_ids.clone()))
        .group_by(OrderItemCol::ProductId)
        .into_model::<PriorQuantity>()
        .all(&txn)
        .await?
        .into_iter()
        .map(|row| (row.product_id, row.quantity))
        .collect();

    let mut lines = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let offered = attachments
            .get(&item.product_id)
            .filter(|a| a.active)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Product {} is not offered in this sales window",
                    item.product_id
                ))
            })?;
        let product = products
            .get(&item.product_id)
            .filter(|p| p.is_available && p.vendor_id == window.vendor_id)
            .ok_or_else(|| {
                AppError::BadRequest(format!("Product {} is not available", item.product_id))
            })?;
        if product.stock < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        if let Some(limit) = offered.qty_limit_per_customer {
            let already = prior.get(&item.product_id).copied().unwrap_or(0);
            if already + i64::from(item.quantity) > i64::from(limit) {
                return Err(AppError::BadRequest(format!(
                    "Limit of {} per customer for {}",
                    limit, product.name
                )));
            }
        }
        lines.push(Line {
            product_id: product.id,
            name: product.name.clone(),
            quantity: item.quantity,
            price: offered.price_override.unwrap_or(product.price),
        });
    }
    let item_count: i32 = lines.iter().map(|l| l.quantity).sum();

    let metrics = Metrics::find_by_id(window.id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let (orders_so_far, items_so_far) = metrics
        .as_ref()
        .map(|m| (m.orders_count, m.items_count))
        .unwrap_or((0, 0));
    if window.capacity_total.is_some_and(|cap| orders_so_far + 1 > cap) {
        return Err(AppError::Conflict("Sales window is full".into()));
    }
    if window
        .max_items_total
        .is_some_and(|max| items_so_far + item_count > max)
    {
        return Err(AppError::Conflict(
            "Sales window does not have enough items left".into(),
        ));
    }

    let has_slots = Slots::find()
        .filter(SlotCol::SalesWindowId.eq(window.id))
        .count(&txn)
        .await?
        > 0;
    let slot = match (has_slots, payload.slot_id) {
        (true, None) => {
            return Err(AppError::BadRequest("A pickup slot is required".into()));
        }
        (false, Some(_)) => {
            return Err(AppError::BadRequest("This sales window has no slots".into()));
        }
        (false, None) => None,
        (true, Some(slot_id)) => {
            let slot = Slots::find_by_id(slot_id)
                .filter(SlotCol::SalesWindowId.eq(window.id))
                .lock(LockType::Update)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::BadRequest("Invalid slot".into()))?;
            if slot.reserved >= slot.capacity {
                return Err(AppError::Conflict("Pickup slot is full".into()));
            }
            Some(slot)
        }
    };

    let priced: Vec<(i64, i32)> = lines.iter().map(|l| (l.price, l.quantity)).collect();
    let subtotal: i64 = priced.iter().map(|(p, q)| p * i64::from(*q)).sum();
    let fee = sales_window::delivery_fee(
        window.delivery_fee_mode.parse()?,
        window.delivery_fee_cents,
        window.free_over_cents,
        subtotal,
    );
    let totals = OrderTotals::compute(
        &priced,
        state.config.tax_rate_bps,
        state.config.commission_rate_bps,
        fee,
    );

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        vendor_id: Set(window.vendor_id),
        sales_window_id: Set(window.id),
        slot_id: Set(slot.as_ref().map(|s| s.id)),
        order_number: Set(checkout::build_order_number(order_id, now)),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_status: Set(PaymentStatus::Unpaid.as_str().to_string()),
        fulfillment_status: Set(FulfillmentStatus::Pending.as_str().to_string()),
        subtotal: Set(totals.subtotal),
        tax: Set(totals.tax),
        delivery_fee: Set(totals.delivery_fee),
        total_amount: Set(totals.total),
        commission_amount: Set(totals.commission),
        vendor_payout: Set(totals.vendor_payout),
        payment_reference: Set(None),
        notes: Set(payload.notes.filter(|n| !n.trim().is_empty())),
        fulfillment_notes: Set(None),
        paid_at: Set(None),
        fulfilled_at: Set(None),
        cancelled_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            product_name: Set(line.name.clone()),
            quantity: Set(line.quantity),
            price: Set(line.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;
    }

    if let Some(slot) = &slot {
        Slots::update_many()
            .col_expr(SlotCol::Reserved, Expr::col(SlotCol::Reserved).add(1))
            .filter(SlotCol::Id.eq(slot.id))
            .exec(&txn)
            .await?;
    }

    let orders_now = orders_so_far + 1;
    let items_now = items_so_far + item_count;
    match metrics {
        Some(m) => {
            let revenue = m.revenue + totals.subtotal;
            let mut active: MetricsActive = m.into();
            active.orders_count = Set(orders_now);
            active.items_count = Set(items_now);
            active.revenue = Set(revenue);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }
        None => {
            MetricsActive {
                sales_window_id: Set(window.id),
                orders_count: Set(orders_now),
                items_count: Set(items_now),
                revenue: Set(totals.subtotal),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    let full = window.capacity_total.is_some_and(|cap| orders_now >= cap)
        || window.max_items_total.is_some_and(|max| items_now >= max);
    let auto_closed = window.auto_close_when_full && full;
    if auto_closed {
        let mut active: WindowActive = window.clone().into();
        active.status = Set(SalesWindowStatus::Closed.as_str().to_string());
        active.updated_at = Set(now.into());
        active.update(&txn).await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        window_id = %window.id,
        total = totals.total,
        auto_closed,
        "checkout completed"
    );
    audit::record(
        state,
        Some(user.user_id),
        "order_checkout",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "sales_window_id": window.id,
            "total": totals.total,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(window_id) = query.sales_window_id {
        condition = condition.add(OrderCol::SalesWindowId.eq(window_id));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
    Ok(ApiResponse::success("Ok", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "OK",
        with_items(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.order_number != payload.order_number.trim() {
        return Err(AppError::BadRequest("Order number does not match".into()));
    }
    if order.payment_status.parse::<PaymentStatus>()? == PaymentStatus::Paid {
        return Err(AppError::Conflict("Order already paid".into()));
    }

    let (order, _) = mark_paid(&txn, order, payload.payment_reference).await?;
    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Payment recorded", data, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = order.status.parse::<OrderStatus>()?;
    let payment = order.payment_status.parse::<PaymentStatus>()?;
    if status != OrderStatus::Pending || payment == PaymentStatus::Paid {
        return Err(AppError::Conflict(
            "Only pending, unpaid orders can be cancelled".into(),
        ));
    }

    release_order(&txn, &order).await?;
    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().to_string());
    active.fulfillment_status = Set(FulfillmentStatus::Cancelled.as_str().to_string());
    active.cancelled_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;
    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}
