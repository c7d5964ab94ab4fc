use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::pricing::{self, PricePoint},
    dto::products::{
        CostAnalysis, CreateProductRequest, PriceSuggestionResponse, ProductList, ProductSummary,
        UpdateProductRequest,
    },
    entity::{
        product_price_history::{
            ActiveModel as HistoryActive, Column as HistoryCol, Entity as PriceHistory,
        },
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
        sales_window_products::{Column as WindowProductCol, Entity as WindowProducts},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, ProductQuery, ProductSortBy, SearchQuery, SortOrder},
    services::vendor_service::require_vendor,
    state::AppState,
};

pub const DEFAULT_TARGET_MARGIN: f64 = 30.0;
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
/// History entries fed to the price heuristic.
pub const SUGGESTION_HISTORY_LEN: u64 = 30;

fn validate_fields(
    name: Option<&str>,
    price: Option<i64>,
    unit_cost: Option<i64>,
    target_margin: Option<f64>,
    stock: Option<i32>,
) -> AppResult<()> {
    if let Some(name) = name {
        if name.trim().is_empty() || name.chars().count() > 200 {
            return Err(AppError::BadRequest(
                "name must be between 1 and 200 characters".into(),
            ));
        }
    }
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if unit_cost.is_some_and(|c| c < 0) {
        return Err(AppError::BadRequest("unit_cost must not be negative".into()));
    }
    if target_margin.is_some_and(|m| !(0.0..100.0).contains(&m)) {
        return Err(AppError::BadRequest(
            "target_margin must be at least 0 and below 100".into(),
        ));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}

async fn record_price<C: ConnectionTrait>(conn: &C, product: &ProductModel) -> AppResult<()> {
    HistoryActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        price: Set(product.price),
        unit_cost: Set(pricing::effective_unit_cost(product.price, product.unit_cost)),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    vendor_id: Uuid,
    id: Uuid,
) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .filter(Column::VendorId.eq(vendor_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsAvailable.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(vendor_id) = query.vendor_id {
        condition = condition.add(Column::VendorId.eq(vendor_id));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .filter(Column::IsAvailable.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn list_vendor_products(
    state: &AppState,
    user: &AuthUser,
    query: SearchQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Products::find().filter(Column::VendorId.eq(vendor.id));
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        finder = finder.filter(Expr::col(Column::Name).ilike(format!("%{}%", search)));
    }
    let finder = finder.order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Available products at or below `threshold` units, lowest stock first.
pub(crate) async fn low_stock(
    state: &AppState,
    vendor_id: Option<Uuid>,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    if threshold < 0 {
        return Err(AppError::BadRequest("threshold must not be negative".into()));
    }
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Products::find()
        .filter(Column::IsAvailable.eq(true))
        .filter(Column::Stock.lte(threshold));
    if let Some(vendor_id) = vendor_id {
        finder = finder.filter(Column::VendorId.eq(vendor_id));
    }
    let finder = finder
        .order_by_asc(Column::Stock)
        .order_by_asc(Column::Name);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn vendor_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let vendor = require_vendor(&state.orm, user).await?;
    low_stock(state, Some(vendor.id), query).await
}

pub async fn get_vendor_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let product = find_owned(&state.orm, vendor.id, id).await?;
    Ok(ApiResponse::ok("Product", product.into()))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let vendor = require_vendor(&state.orm, user).await?;
    validate_fields(
        Some(&payload.name),
        Some(payload.price),
        payload.unit_cost,
        payload.target_margin,
        Some(payload.stock),
    )?;

    let txn = state.orm.begin().await?;
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor.id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        unit_cost: Set(payload.unit_cost),
        target_margin: Set(payload.target_margin.unwrap_or(DEFAULT_TARGET_MARGIN)),
        stock: Set(payload.stock),
        is_available: Set(payload.is_available.unwrap_or(true)),
        last_ai_suggestion: Set(None),
        ai_suggestion_note: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    record_price(&txn, &product).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let vendor = require_vendor(&state.orm, user).await?;
    validate_fields(
        payload.name.as_deref(),
        payload.price,
        payload.unit_cost,
        payload.target_margin,
        payload.stock,
    )?;

    let txn = state.orm.begin().await?;
    let existing = find_owned(&txn, vendor.id, id).await?;
    let price_changed = payload.price.is_some_and(|p| p != existing.price)
        || payload.unit_cost.is_some_and(|c| Some(c) != existing.unit_cost);

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(unit_cost) = payload.unit_cost {
        active.unit_cost = Set(Some(unit_cost));
    }
    if let Some(margin) = payload.target_margin {
        active.target_margin = Set(margin);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(available) = payload.is_available {
        active.is_available = Set(available);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&txn).await?;
    if price_changed {
        record_price(&txn, &product).await?;
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id, "price_changed": price_changed }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Removes a product. Products that appear on orders are archived instead:
/// they stop being listed and are detached from every sales window.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let txn = state.orm.begin().await?;
    let product = find_owned(&txn, vendor.id, id).await?;

    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(product.id))
        .count(&txn)
        .await?
        > 0;
    if ordered {
        WindowProducts::delete_many()
            .filter(WindowProductCol::ProductId.eq(product.id))
            .exec(&txn)
            .await?;
        let mut active: ActiveModel = product.into();
        active.is_available = Set(false);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    } else {
        Products::delete_by_id(product.id).exec(&txn).await?;
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        if ordered { "product_archive" } else { "product_delete" },
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        if ordered { "Product archived" } else { "Product deleted" },
        serde_json::json!({ "id": id, "archived": ordered }),
        Some(Meta::empty()),
    ))
}

pub async fn suggest_price(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PriceSuggestionResponse>> {
    let vendor = require_vendor(&state.orm, user).await?;
    let product = find_owned(&state.orm, vendor.id, id).await?;

    let mut recent = PriceHistory::find()
        .filter(HistoryCol::ProductId.eq(product.id))
        .order_by_desc(HistoryCol::RecordedAt)
        .limit(SUGGESTION_HISTORY_LEN)
        .all(&state.orm)
        .await?;
    recent.reverse();
    let history: Vec<PricePoint> = recent
        .iter()
        .map(|h| PricePoint {
            price: h.price,
            unit_cost: h.unit_cost,
        })
        .collect();

    let unit_cost = pricing::effective_unit_cost(product.price, product.unit_cost);
    let suggestion = pricing::suggest_price(unit_cost, &history, product.target_margin);

    let summary = ProductSummary {
        id: product.id,
        name: product.name.clone(),
        current_price: product.price,
        target_margin: product.target_margin,
    };
    let cost_analysis = CostAnalysis {
        unit_cost,
        has_unit_cost: product.unit_cost.is_some(),
        history_points: history.len(),
    };

    let mut active: ActiveModel = product.into();
    active.last_ai_suggestion = Set(Some(suggestion.suggested_price));
    active.ai_suggestion_note = Set(Some(suggestion.note.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::debug!(
        product_id = %summary.id,
        suggested = suggestion.suggested_price,
        confidence = suggestion.confidence,
        "price suggestion computed"
    );

    Ok(ApiResponse::ok(
        "Price suggestion",
        PriceSuggestionResponse {
            product: summary,
            cost_analysis,
            suggestion,
        },
    ))
}
