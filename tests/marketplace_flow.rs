use chrono::{Duration, DurationRound, Utc};
use craved_artisan_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::{
        checkout::FulfillmentStatus,
        events::ApplicationStatus,
        roles::Role,
        sales_window::{SalesWindowStatus, SalesWindowType},
    },
    dto::{
        admin::{ImpersonateRequest, UserAction, UserActionRequest},
        auth::RegisterRequest,
        events::{ApplyToEventRequest, CreateEventRequest, ReviewApplicationRequest},
        orders::{CheckoutItem, CheckoutRequest, FulfillmentUpdateRequest, PayOrderRequest},
        products::CreateProductRequest,
        sales_windows::{
            BulkWindowProductsRequest, CreateSalesWindowRequest, GenerateSlotsRequest,
            UpdateSalesWindowRequest, WindowProductInput,
        },
        vendors::CreateVendorProfileRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::LowStockQuery,
    services::{
        admin_service, auth_service, event_service, fulfillment_service, order_service,
        payment_service, product_service, sales_window_service, vendor_service,
    },
    state::AppState,
};
use axum::http::{HeaderMap, HeaderValue};
use craved_artisan_api::domain::signature;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    setup_state_with(None).await
}

async fn setup_state_with(webhook_secret: Option<&str>) -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run marketplace flow tests."
            );
            return Ok(None);
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let mut config = AppConfig::with_defaults(database_url, "flow-test-secret");
    config.stripe_webhook_secret = webhook_secret.map(str::to_string);
    Ok(Some(AppState::new(pool, config)))
}

fn data<T>(resp: ApiResponse<T>) -> T {
    resp.data.expect("response carries data")
}

async fn register(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let user = data(
        auth_service::register_user(
            state,
            RegisterRequest {
                email: format!("{}-{}@example.com", role, Uuid::new_v4()),
                password: "correct-horse".into(),
                role: Some(role),
                display_name: None,
            },
        )
        .await?,
    );
    Ok(AuthUser::new(user.id, role))
}

async fn create_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let admin = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("admin-{}@example.com", Uuid::new_v4())),
        password_hash: Set(auth_service::hash_password("admin-password")?),
        role: Set(Role::Admin.as_str().to_string()),
        display_name: Set(None),
        status: Set("active".into()),
        email_verified: Set(true),
        email_verified_at: Set(None),
        token_version: Set(0),
        last_login_at: Set(None),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser::new(admin.id, Role::Admin))
}

fn checkout_request(window_id: Uuid, slot_id: Uuid, product_id: Uuid, quantity: i32) -> CheckoutRequest {
    CheckoutRequest {
        sales_window_id: window_id,
        slot_id: Some(slot_id),
        items: vec![CheckoutItem {
            product_id,
            quantity,
        }],
        notes: None,
    }
}

async fn connected_vendor(state: &AppState, store_name: &str) -> anyhow::Result<AuthUser> {
    let vendor = register(state, Role::Vendor).await?;
    vendor_service::create_profile(
        state,
        &vendor,
        CreateVendorProfileRequest {
            store_name: store_name.into(),
            bio: None,
            city: None,
            stripe_account_id: Some(format!("acct_{}", Uuid::new_v4().simple())),
        },
    )
    .await?;
    Ok(vendor)
}

async fn product_with_stock(
    state: &AppState,
    vendor: &AuthUser,
    name: &str,
    stock: i32,
) -> anyhow::Result<Product> {
    Ok(data(
        product_service::create_product(
            state,
            vendor,
            CreateProductRequest {
                name: name.into(),
                description: None,
                price: 500,
                unit_cost: None,
                target_margin: None,
                stock,
                is_available: Some(true),
            },
        )
        .await?,
    ))
}

/// An open window offering `product_id`, fulfilled tomorrow.
async fn open_window(
    state: &AppState,
    vendor: &AuthUser,
    product_id: Uuid,
    max_items_total: Option<i32>,
    qty_limit_per_customer: Option<i32>,
) -> anyhow::Result<Uuid> {
    let now = Utc::now().duration_trunc(Duration::minutes(1))?;
    let window = data(
        sales_window_service::create_window(
            state,
            vendor,
            CreateSalesWindowRequest {
                window_type: SalesWindowType::PorchPickup,
                name: "Porch pickup".into(),
                description: None,
                status: Some(SalesWindowStatus::Open),
                location_name: None,
                address_text: None,
                epicenter_address: None,
                radius_miles: None,
                delivery_fee_mode: None,
                delivery_fee_cents: None,
                free_over_cents: None,
                preorder_open_at: None,
                preorder_close_at: None,
                fulfill_start_at: Some(now + Duration::days(1)),
                fulfill_end_at: Some(now + Duration::days(1) + Duration::hours(2)),
                is_always_on: None,
                capacity_total: None,
                max_items_total,
                auto_close_when_full: None,
                pickup_instructions: None,
            },
        )
        .await?,
    );
    sales_window_service::set_window_products(
        state,
        vendor,
        window.window.id,
        BulkWindowProductsRequest {
            products: vec![WindowProductInput {
                product_id,
                price_override: None,
                qty_limit_per_customer,
                active: Some(true),
            }],
        },
    )
    .await?;
    Ok(window.window.id)
}

fn order_of(window_id: Uuid, product_id: Uuid, quantity: i32) -> CheckoutRequest {
    CheckoutRequest {
        sales_window_id: window_id,
        slot_id: None,
        items: vec![CheckoutItem {
            product_id,
            quantity,
        }],
        notes: None,
    }
}

// Vendor sets up a window -> customer checks out and pays -> vendor fulfills.
#[tokio::test]
async fn preorder_checkout_pay_and_fulfill_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let vendor = register(&state, Role::Vendor).await?;
    let customer = register(&state, Role::Customer).await?;

    let profile = data(
        vendor_service::create_profile(
            &state,
            &vendor,
            CreateVendorProfileRequest {
                store_name: "Flow Test Bakery".into(),
                bio: None,
                city: Some("Austin".into()),
                stripe_account_id: Some("acct_flow_test".into()),
            },
        )
        .await?,
    );
    assert!(profile.payments_connected);
    assert!(profile.slug.starts_with("flow-test-bakery"));

    let product = data(
        product_service::create_product(
            &state,
            &vendor,
            CreateProductRequest {
                name: "Country Sourdough".into(),
                description: None,
                price: 900,
                unit_cost: Some(300),
                target_margin: None,
                stock: 10,
                is_available: Some(true),
            },
        )
        .await?,
    );

    let now = Utc::now().duration_trunc(Duration::minutes(1))?;
    let fulfill_start = now + Duration::days(2);
    let fulfill_end = fulfill_start + Duration::hours(2);
    let window = data(
        sales_window_service::create_window(
            &state,
            &vendor,
            CreateSalesWindowRequest {
                window_type: SalesWindowType::Market,
                name: "Flow test market".into(),
                description: None,
                status: Some(SalesWindowStatus::Open),
                location_name: None,
                address_text: None,
                epicenter_address: None,
                radius_miles: None,
                delivery_fee_mode: None,
                delivery_fee_cents: None,
                free_over_cents: None,
                preorder_open_at: Some(now - Duration::hours(1)),
                preorder_close_at: Some(now + Duration::days(1)),
                fulfill_start_at: Some(fulfill_start),
                fulfill_end_at: Some(fulfill_end),
                is_always_on: None,
                capacity_total: Some(10),
                max_items_total: None,
                auto_close_when_full: None,
                pickup_instructions: None,
            },
        )
        .await?,
    );
    let window_id = window.window.id;
    assert_eq!(window.window.status, "open");
    assert_eq!(window.metrics.orders_count, 0);

    sales_window_service::set_window_products(
        &state,
        &vendor,
        window_id,
        BulkWindowProductsRequest {
            products: vec![WindowProductInput {
                product_id: product.id,
                price_override: None,
                qty_limit_per_customer: Some(3),
                active: Some(true),
            }],
        },
    )
    .await?;
    let slots = data(
        sales_window_service::generate_slots(
            &state,
            &vendor,
            window_id,
            GenerateSlotsRequest {
                start_time: fulfill_start,
                end_time: fulfill_end,
                slot_length_min: 60,
                slot_capacity: 1,
            },
        )
        .await?,
    )
    .items;
    assert_eq!(slots.len(), 2);

    // A slot is required once the window has slots.
    let mut no_slot = checkout_request(window_id, slots[0].id, product.id, 1);
    no_slot.slot_id = None;
    let err = order_service::checkout(&state, &customer, no_slot).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = data(
        order_service::checkout(&state, &customer, checkout_request(window_id, slots[0].id, product.id, 2))
            .await?,
    );
    assert_eq!(order.order.subtotal, 1800);
    assert_eq!(order.order.tax, 153);
    assert_eq!(order.order.total_amount, 1953);
    assert_eq!(order.order.status, "pending");
    assert_eq!(order.items.len(), 1);

    // Per-customer limit counts earlier orders in the same window.
    let err = order_service::checkout(&state, &customer, checkout_request(window_id, slots[1].id, product.id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // The first slot holds a single order.
    let err = order_service::checkout(&state, &customer, checkout_request(window_id, slots[0].id, product.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = order_service::pay_order(
        &state,
        &customer,
        order.order.id,
        PayOrderRequest {
            order_number: "CA-00000000-wrong".into(),
            payment_reference: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let paid = data(
        order_service::pay_order(
            &state,
            &customer,
            order.order.id,
            PayOrderRequest {
                order_number: order.order.order_number.clone(),
                payment_reference: Some("pi_flow_test".into()),
            },
        )
        .await?,
    );
    assert_eq!(paid.order.payment_status, "paid");
    assert_eq!(paid.order.status, "paid");

    let err = order_service::cancel_order(&state, &customer, order.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    for (step, expected) in [
        (FulfillmentStatus::Ready, "ready"),
        (FulfillmentStatus::Completed, "fulfilled"),
    ] {
        let updated = data(
            fulfillment_service::update_fulfillment(
                &state,
                &vendor,
                order.order.id,
                FulfillmentUpdateRequest {
                    status: step,
                    notes: None,
                },
            )
            .await?,
        );
        assert_eq!(updated.order.status, expected);
    }

    let stats = data(fulfillment_service::vendor_stats(&state, &vendor).await?);
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.completed_orders, 1);
    assert_eq!(stats.total_revenue, 1800);

    // A second, unpaid order is cancelled and gives its stock and slot back.
    let second = data(
        order_service::checkout(&state, &customer, checkout_request(window_id, slots[1].id, product.id, 1))
            .await?,
    );
    let stock = data(product_service::get_vendor_product(&state, &vendor, product.id).await?).stock;
    assert_eq!(stock, 7);

    let cancelled = data(order_service::cancel_order(&state, &customer, second.order.id).await?);
    assert_eq!(cancelled.order.status, "cancelled");
    let stock = data(product_service::get_vendor_product(&state, &vendor, product.id).await?).stock;
    assert_eq!(stock, 8);

    let detail = data(sales_window_service::get_window(&state, &vendor, window_id).await?);
    assert_eq!(detail.metrics.orders_count, 1);
    assert_eq!(detail.metrics.revenue, 1800);
    assert_eq!(detail.slots[1].reserved, 0);

    // Fulfilling the window requires closing it first.
    let err = sales_window_service::transition_window(&state, &vendor, window_id, SalesWindowStatus::Fulfilled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    sales_window_service::transition_window(&state, &vendor, window_id, SalesWindowStatus::Closed).await?;

    Ok(())
}

// Coordinator publishes an event -> vendor applies -> coordinator approves.
#[tokio::test]
async fn event_application_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let coordinator = register(&state, Role::Coordinator).await?;
    let vendor = register(&state, Role::Vendor).await?;
    vendor_service::create_profile(
        &state,
        &vendor,
        CreateVendorProfileRequest {
            store_name: "Flow Test Candles".into(),
            bio: None,
            city: None,
            stripe_account_id: None,
        },
    )
    .await?;

    let start_at = Utc::now() + Duration::days(10);
    let event = data(
        event_service::create_event(
            &state,
            &coordinator,
            CreateEventRequest {
                title: "Flow Test Night Market".into(),
                description: "Makers and music".into(),
                venue: "Town Square".into(),
                start_at,
                end_at: start_at + Duration::hours(5),
                max_vendors: Some(1),
                categories: Some(vec!["crafts".into()]),
                rules: None,
            },
        )
        .await?,
    );
    assert_eq!(event.status, "draft");

    let apply = || ApplyToEventRequest {
        business_name: "Flow Test Candles".into(),
        category: "crafts".into(),
        message: None,
    };
    let err = event_service::apply_to_event(&state, &vendor, event.id, apply())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    event_service::publish_event(&state, &coordinator, event.id).await?;
    let public = data(event_service::get_public_event(&state, &event.slug).await?);
    assert_eq!(public.id, event.id);

    let application = data(event_service::apply_to_event(&state, &vendor, event.id, apply()).await?);
    let err = event_service::apply_to_event(&state, &vendor, event.id, apply())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let reviewed = data(
        event_service::review_application(
            &state,
            &coordinator,
            event.id,
            application.id,
            ReviewApplicationRequest {
                status: ApplicationStatus::Approved,
            },
        )
        .await?,
    );
    assert_eq!(reviewed.status, "approved");

    // Customers cannot create events.
    let customer = register(&state, Role::Customer).await?;
    let err = event_service::publish_event(&state, &customer, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

// Admin impersonates, then suspends, a customer.
#[tokio::test]
async fn admin_moderation_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_admin(&state).await?;
    let customer = register(&state, Role::Customer).await?;

    let err = admin_service::impersonate(
        &state,
        &admin,
        customer.user_id,
        ImpersonateRequest { reason: "  ".into() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let session = data(
        admin_service::impersonate(
            &state,
            &admin,
            customer.user_id,
            ImpersonateRequest {
                reason: "Investigating a checkout ticket".into(),
            },
        )
        .await?,
    );
    assert_eq!(session.user.id, customer.user_id);
    assert!(session.expires_at > Utc::now());

    let err = admin_service::apply_user_action(
        &state,
        &admin,
        admin.user_id,
        UserActionRequest {
            action: UserAction::Suspend,
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let result = data(
        admin_service::apply_user_action(
            &state,
            &admin,
            customer.user_id,
            UserActionRequest {
                action: UserAction::Suspend,
                reason: Some("chargeback abuse".into()),
            },
        )
        .await?,
    );
    assert_eq!(result.user.status, "suspended");

    // Impersonated sessions never reach admin operations.
    let mut acting = AuthUser::new(admin.user_id, Role::Admin);
    acting.impersonator = Some(admin.user_id);
    let err = admin_service::apply_user_action(
        &state,
        &acting,
        customer.user_id,
        UserActionRequest {
            action: UserAction::Reinstate,
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

// Per-customer limits add up across orders; reaching max_items_total closes the window.
#[tokio::test]
async fn window_limits_and_auto_close_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let vendor = connected_vendor(&state, "Flow Test Jams").await?;
    let customer = register(&state, Role::Customer).await?;
    let jam = product_with_stock(&state, &vendor, "Fig Jam", 50).await?;

    let limited = open_window(&state, &vendor, jam.id, None, Some(3)).await?;
    order_service::checkout(&state, &customer, order_of(limited, jam.id, 2)).await?;
    let err = order_service::checkout(&state, &customer, order_of(limited, jam.id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    // Exactly reaching the limit is fine.
    order_service::checkout(&state, &customer, order_of(limited, jam.id, 1)).await?;
    // Another customer has their own allowance.
    let neighbour = register(&state, Role::Customer).await?;
    order_service::checkout(&state, &neighbour, order_of(limited, jam.id, 3)).await?;

    let capped = open_window(&state, &vendor, jam.id, Some(3), None).await?;
    let err = order_service::checkout(&state, &customer, order_of(capped, jam.id, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    order_service::checkout(&state, &customer, order_of(capped, jam.id, 3)).await?;

    let detail = data(sales_window_service::get_window(&state, &vendor, capped).await?);
    assert_eq!(detail.window.status, "closed");
    assert_eq!(detail.metrics.items_count, 3);

    // Sold out: reopening needs a higher allowance.
    let err = sales_window_service::transition_window(&state, &vendor, capped, SalesWindowStatus::Open)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let reopened = data(
        sales_window_service::update_window(
            &state,
            &vendor,
            capped,
            UpdateSalesWindowRequest {
                status: Some(SalesWindowStatus::Open),
                max_items_total: Some(10),
                ..Default::default()
            },
        )
        .await?,
    );
    assert_eq!(reopened.window.status, "open");
    assert_eq!(reopened.window.max_items_total, Some(10));

    Ok(())
}

// Slots that hold reservations stay put; the storefront sees availability, not sales.
#[tokio::test]
async fn reserved_slots_and_storefront_view_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let vendor = connected_vendor(&state, "Flow Test Pies").await?;
    let customer = register(&state, Role::Customer).await?;
    let pie = product_with_stock(&state, &vendor, "Pecan Pie", 20).await?;
    let window_id = open_window(&state, &vendor, pie.id, None, None).await?;

    let start = Utc::now().duration_trunc(Duration::minutes(1))? + Duration::days(1);
    let slots_request = || GenerateSlotsRequest {
        start_time: start,
        end_time: start + Duration::hours(1),
        slot_length_min: 30,
        slot_capacity: 4,
    };
    let slots = data(sales_window_service::generate_slots(&state, &vendor, window_id, slots_request()).await?).items;
    assert_eq!(slots.len(), 2);

    // Regenerating is fine while nothing is booked.
    let slots = data(sales_window_service::generate_slots(&state, &vendor, window_id, slots_request()).await?).items;
    let mut request = order_of(window_id, pie.id, 2);
    request.slot_id = Some(slots[0].id);
    order_service::checkout(&state, &customer, request).await?;

    let err = sales_window_service::generate_slots(&state, &vendor, window_id, slots_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let picker = data(sales_window_service::fulfillment_picker(&state, profile_id(&state, &vendor).await?).await?);
    let body = serde_json::to_value(&picker)?;
    let text = body.to_string();
    assert!(!text.contains("revenue"));
    assert!(!text.contains("orders_count"));

    let window = picker
        .groups
        .iter()
        .flat_map(|g| g.windows.iter())
        .find(|w| w.window.id == window_id)
        .expect("open window is listed");
    let available: Vec<i32> = window.slots.iter().map(|s| s.available).collect();
    assert_eq!(available, vec![3, 4]);

    Ok(())
}

async fn profile_id(state: &AppState, vendor: &AuthUser) -> anyhow::Result<Uuid> {
    Ok(data(vendor_service::get_own_profile(state, vendor).await?).id)
}

// Ordered products are archived rather than deleted; low stock is reported per vendor.
#[tokio::test]
async fn product_archive_and_low_stock_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let vendor = connected_vendor(&state, "Flow Test Pantry").await?;
    let customer = register(&state, Role::Customer).await?;
    let honey = product_with_stock(&state, &vendor, "Wildflower Honey", 6).await?;
    let granola = product_with_stock(&state, &vendor, "Maple Granola", 40).await?;
    let window_id = open_window(&state, &vendor, honey.id, None, None).await?;
    order_service::checkout(&state, &customer, order_of(window_id, honey.id, 2)).await?;

    let low = data(
        product_service::vendor_low_stock(&state, &vendor, LowStockQuery::default()).await?,
    );
    let ids: Vec<Uuid> = low.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![honey.id]);
    assert_eq!(low.items[0].stock, 4);

    let wide = data(
        product_service::vendor_low_stock(
            &state,
            &vendor,
            LowStockQuery {
                threshold: Some(100),
                ..Default::default()
            },
        )
        .await?,
    );
    let ids: Vec<Uuid> = wide.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![honey.id, granola.id]);

    let err = product_service::vendor_low_stock(
        &state,
        &vendor,
        LowStockQuery {
            threshold: Some(-1),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let archived = product_service::delete_product(&state, &vendor, honey.id).await?;
    assert_eq!(archived.message, "Product archived");
    let kept = data(product_service::get_vendor_product(&state, &vendor, honey.id).await?);
    assert!(!kept.is_available);
    let err = product_service::get_product(&state, honey.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let detail = data(sales_window_service::get_window(&state, &vendor, window_id).await?);
    assert!(detail.products.is_empty());

    let deleted = product_service::delete_product(&state, &vendor, granola.id).await?;
    assert_eq!(deleted.message, "Product deleted");
    let err = product_service::get_vendor_product(&state, &vendor, granola.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

const FLOW_WEBHOOK_SECRET: &str = "whsec_flow_test";

fn signed_headers(payload: &[u8]) -> anyhow::Result<HeaderMap> {
    let timestamp = Utc::now().timestamp();
    let sig = signature::sign(FLOW_WEBHOOK_SECRET, timestamp, payload)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        payment_service::SIGNATURE_HEADER,
        HeaderValue::from_str(&format!("t={timestamp},v1={sig}"))?,
    );
    Ok(headers)
}

// Stripe retries a delivered payment event; only the first one counts.
#[tokio::test]
async fn repeated_payment_webhook_is_recorded_once() -> anyhow::Result<()> {
    let Some(state) = setup_state_with(Some(FLOW_WEBHOOK_SECRET)).await? else {
        return Ok(());
    };
    let vendor = connected_vendor(&state, "Flow Test Soaps").await?;
    let customer = register(&state, Role::Customer).await?;
    let soap = product_with_stock(&state, &vendor, "Oat Soap", 10).await?;
    let window_id = open_window(&state, &vendor, soap.id, None, None).await?;
    let order = data(order_service::checkout(&state, &customer, order_of(window_id, soap.id, 1)).await?);

    let payload = serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_flow_retry",
            "metadata": { "order_id": order.order.id },
        }},
    }))?;

    let first = payment_service::handle_stripe_webhook(&state, &signed_headers(&payload)?, &payload).await?;
    assert!(first.handled);
    let again = payment_service::handle_stripe_webhook(&state, &signed_headers(&payload)?, &payload).await?;
    assert!(again.received);
    assert!(!again.handled);

    let paid = data(order_service::get_order(&state, &customer, order.order.id).await?);
    assert_eq!(paid.order.payment_status, "paid");
    assert_eq!(paid.order.payment_reference.as_deref(), Some("pi_flow_retry"));

    let audited: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs WHERE action = $1 AND metadata->>'order_id' = $2",
    )
    .bind("order_paid_webhook")
    .bind(order.order.id.to_string())
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(audited, 1);

    Ok(())
}
