use chrono::{DateTime, Duration, TimeZone, Utc};
use craved_artisan_api::{
    domain::{
        checkout::{
            FulfillmentStatus, OrderStatus, OrderTotals, PaymentStatus, apply_bps,
            build_order_number, order_status_after_fulfillment,
        },
        events::validate_event,
        pricing::{
            PricePoint, PriceTrend, coefficient_of_variation, effective_unit_cost, suggest_price,
            trend_of,
        },
        pulse::{PulseItem, PulseOrder, PulsePeriod, TOP_PRODUCTS, summarize},
        roles::Role,
        sales_window::{
            ALWAYS_ON_KEY, DeliveryFeeMode, SalesWindowStatus, SalesWindowType, UNSCHEDULED_KEY,
            WindowDraft, delivery_fee, generate_slots, group_by_fulfillment_date,
        },
        signature::{self, SignatureError},
        slug::{candidate, slugify},
    },
    error::AppError,
};
use rstest::{fixture, rstest};
use uuid::Uuid;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
}

fn history(prices: &[i64], unit_cost: i64) -> Vec<PricePoint> {
    prices
        .iter()
        .map(|&price| PricePoint { price, unit_cost })
        .collect()
}

#[fixture]
fn pickup_draft() -> WindowDraft {
    WindowDraft {
        window_type: SalesWindowType::ParkPickup,
        name: "Saturday pickup".into(),
        epicenter_address: None,
        radius_miles: None,
        delivery_fee_mode: DeliveryFeeMode::None,
        delivery_fee_cents: None,
        free_over_cents: None,
        preorder_open_at: Some(at(8, 0)),
        preorder_close_at: Some(at(20, 0)),
        fulfill_start_at: Some(at(21, 0)),
        fulfill_end_at: Some(at(23, 0)),
        capacity_total: Some(20),
        max_items_total: None,
    }
}

// Pricing

#[test]
fn suggestion_without_history_uses_cost_plus_margin() {
    let suggestion = suggest_price(600, &[], 40.0);
    assert_eq!(suggestion.suggested_price, 1000);
    assert_eq!(suggestion.trend, PriceTrend::Stable);
    assert!(!suggestion.volatility_detected);
    assert_eq!(suggestion.confidence, 0.5);
    assert!(suggestion.note.starts_with("No price history"));
}

#[rstest]
#[case::flat(vec![1000, 1000, 1000, 1000], 1000, PriceTrend::Stable)]
#[case::rising(vec![1000, 1010, 1020, 1030], 1020, PriceTrend::Increasing)]
#[case::falling(vec![1030, 1020, 1010, 1000], 980, PriceTrend::Decreasing)]
fn stable_market_follows_the_trend(
    #[case] prices: Vec<i64>,
    #[case] expected: i64,
    #[case] trend: PriceTrend,
) {
    let suggestion = suggest_price(600, &history(&prices, 600), 40.0);
    assert_eq!(suggestion.trend, trend);
    assert_eq!(suggestion.suggested_price, expected);
    assert_eq!(suggestion.confidence, 0.9);
    assert!(suggestion.note.starts_with("Stable market conditions."));
}

#[test]
fn volatile_prices_get_a_conservative_markup() {
    let suggestion = suggest_price(600, &history(&[500, 1500], 600), 40.0);
    assert!(suggestion.volatility_detected);
    assert_eq!(suggestion.confidence, 0.7);
    // CV of 0.5 adds 5% to the 1000 cent base.
    assert_eq!(suggestion.suggested_price, 1050);
    assert!(suggestion.note.contains("High price volatility"));
}

#[test]
fn volatile_costs_are_flagged_separately() {
    let points = vec![
        PricePoint { price: 1000, unit_cost: 400 },
        PricePoint { price: 1000, unit_cost: 800 },
    ];
    let suggestion = suggest_price(600, &points, 40.0);
    assert!(!suggestion.volatility_detected);
    assert_eq!(suggestion.confidence, 0.8);
    assert!(suggestion.note.contains("High cost volatility"));
}

#[rstest]
#[case::recorded(1000, Some(450), 450)]
#[case::estimated(1000, None, 600)]
#[case::estimate_rounds(999, None, 599)]
fn unit_cost_falls_back_to_an_estimate(
    #[case] price: i64,
    #[case] unit_cost: Option<i64>,
    #[case] expected: i64,
) {
    assert_eq!(effective_unit_cost(price, unit_cost), expected);
}

#[test]
fn estimated_costs_do_not_read_as_cost_volatility() {
    // Two points recorded before a unit cost was known, one after.
    let points = vec![
        PricePoint { price: 1000, unit_cost: effective_unit_cost(1000, None) },
        PricePoint { price: 1000, unit_cost: effective_unit_cost(1000, None) },
        PricePoint { price: 1000, unit_cost: effective_unit_cost(1000, Some(600)) },
    ];
    let suggestion = suggest_price(600, &points, 40.0);
    assert!(!suggestion.volatility_detected);
    assert_eq!(suggestion.confidence, 0.9);
    assert!(suggestion.note.starts_with("Stable market conditions."));
}

#[test]
fn suggestion_never_undercuts_the_margin_floor() {
    // A 5% margin leaves less room than the 2% trend discount.
    let suggestion = suggest_price(1000, &history(&[1100, 1090, 1080], 1000), 5.0);
    assert_eq!(suggestion.trend, PriceTrend::Decreasing);
    assert_eq!(suggestion.suggested_price, 1042);
    assert!(suggestion.note.ends_with("Adjusted to maintain minimum margin requirements."));
}

#[test]
fn coefficient_of_variation_is_population_based() {
    let cv = coefficient_of_variation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    assert!((cv - 0.4).abs() < 1e-9);
    assert_eq!(coefficient_of_variation(&[]), 0.0);
    assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
}

#[rstest]
#[case(vec![], PriceTrend::Stable)]
#[case(vec![7.0], PriceTrend::Stable)]
#[case(vec![1.0, 2.0, 3.0], PriceTrend::Increasing)]
#[case(vec![3.0, 1.0], PriceTrend::Decreasing)]
fn trend_is_sign_of_slope(#[case] values: Vec<f64>, #[case] expected: PriceTrend) {
    assert_eq!(trend_of(&values), expected);
}

// Sales windows

#[rstest]
#[case(SalesWindowStatus::Draft, SalesWindowStatus::Open, true)]
#[case(SalesWindowStatus::Draft, SalesWindowStatus::Scheduled, true)]
#[case(SalesWindowStatus::Scheduled, SalesWindowStatus::Open, true)]
#[case(SalesWindowStatus::Open, SalesWindowStatus::Closed, true)]
#[case(SalesWindowStatus::Closed, SalesWindowStatus::Open, true)]
#[case(SalesWindowStatus::Closed, SalesWindowStatus::Fulfilled, true)]
#[case(SalesWindowStatus::Open, SalesWindowStatus::Fulfilled, false)]
#[case(SalesWindowStatus::Draft, SalesWindowStatus::Closed, false)]
#[case(SalesWindowStatus::Fulfilled, SalesWindowStatus::Open, false)]
#[case(SalesWindowStatus::Cancelled, SalesWindowStatus::Draft, false)]
fn window_lifecycle(
    #[case] from: SalesWindowStatus,
    #[case] to: SalesWindowStatus,
    #[case] allowed: bool,
) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn terminal_and_listed_statuses() {
    let terminal: Vec<_> = SalesWindowStatus::ALL
        .iter()
        .filter(|s| s.is_terminal())
        .collect();
    assert_eq!(
        terminal,
        [&SalesWindowStatus::Fulfilled, &SalesWindowStatus::Cancelled]
    );
    assert!(SalesWindowStatus::Open.is_listed());
    assert!(SalesWindowStatus::Scheduled.is_listed());
    assert!(!SalesWindowStatus::Draft.is_listed());
}

#[test]
fn status_text_round_trips_and_rejects_unknown_values() {
    assert_eq!("open".parse::<SalesWindowStatus>().ok(), Some(SalesWindowStatus::Open));
    assert_eq!(SalesWindowType::PorchPickup.as_str(), "porch_pickup");
    assert!(matches!(
        "reopened".parse::<SalesWindowStatus>(),
        Err(AppError::BadRequest(_))
    ));
}

#[rstest]
fn valid_pickup_draft_passes(pickup_draft: WindowDraft) {
    assert!(pickup_draft.validate().is_ok());
}

#[rstest]
#[case::blank_name(|d: &mut WindowDraft| d.name = "   ".into())]
#[case::close_before_open(|d: &mut WindowDraft| d.preorder_close_at = Some(at(7, 0)))]
#[case::end_before_start(|d: &mut WindowDraft| d.fulfill_end_at = Some(at(21, 0)))]
#[case::zero_capacity(|d: &mut WindowDraft| d.capacity_total = Some(0))]
#[case::negative_radius(|d: &mut WindowDraft| d.radius_miles = Some(-1.0))]
#[case::delivery_without_epicenter(|d: &mut WindowDraft| d.window_type = SalesWindowType::Delivery)]
#[case::flat_fee_without_amount(|d: &mut WindowDraft| d.delivery_fee_mode = DeliveryFeeMode::Flat)]
#[case::free_over_without_threshold(|d: &mut WindowDraft| {
    d.delivery_fee_mode = DeliveryFeeMode::FreeOver;
    d.delivery_fee_cents = Some(500);
})]
fn invalid_drafts_are_rejected(pickup_draft: WindowDraft, #[case] edit: fn(&mut WindowDraft)) {
    let mut draft = pickup_draft;
    edit(&mut draft);
    assert!(matches!(draft.validate(), Err(AppError::BadRequest(_))));
}

#[rstest]
#[case(DeliveryFeeMode::None, Some(500), None, 1000, 0)]
#[case(DeliveryFeeMode::Flat, Some(500), None, 1000, 500)]
#[case(DeliveryFeeMode::FreeOver, Some(500), Some(3000), 2999, 500)]
#[case(DeliveryFeeMode::FreeOver, Some(500), Some(3000), 3000, 0)]
fn delivery_fee_by_mode(
    #[case] mode: DeliveryFeeMode,
    #[case] fee: Option<i64>,
    #[case] free_over: Option<i64>,
    #[case] subtotal: i64,
    #[case] expected: i64,
) {
    assert_eq!(delivery_fee(mode, fee, free_over, subtotal), expected);
}

#[test]
fn slots_cover_the_range_and_clamp_the_last_one() -> anyhow::Result<()> {
    let slots = generate_slots(at(10, 0), at(11, 10), 30, 5)?;
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].starts_at, at(10, 0));
    assert_eq!(slots[1].starts_at, at(10, 30));
    assert_eq!(slots[2].starts_at, at(11, 0));
    assert_eq!(slots[2].ends_at, at(11, 10));
    assert!(slots.iter().all(|s| s.capacity == 5));
    Ok(())
}

#[test]
fn slot_cap_is_inclusive() -> anyhow::Result<()> {
    let slots = generate_slots(at(0, 0), at(8, 20), 1, 5)?;
    assert_eq!(slots.len(), 500);
    Ok(())
}

#[test]
fn a_slot_longer_than_the_range_is_clamped_to_it() -> anyhow::Result<()> {
    let slots = generate_slots(at(10, 0), at(11, 0), 100_000_000_000, 5)?;
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].starts_at, at(10, 0));
    assert_eq!(slots[0].ends_at, at(11, 0));
    Ok(())
}

#[rstest]
#[case::zero_length(at(10, 0), at(11, 0), 0, 5)]
#[case::zero_capacity(at(10, 0), at(11, 0), 15, 0)]
#[case::empty_range(at(11, 0), at(11, 0), 15, 5)]
#[case::too_many(at(0, 0), at(10, 0), 1, 5)]
#[case::too_many_with_seconds_left(at(0, 0), at(8, 20) + Duration::seconds(30), 1, 5)]
#[case::length_out_of_range(at(10, 0), at(11, 0), 1_000_000_000_000_000, 5)]
#[case::length_at_i64_max(at(10, 0), at(11, 0), i64::MAX, 5)]
fn bad_slot_requests_are_rejected(
    #[case] start: DateTime<Utc>,
    #[case] end: DateTime<Utc>,
    #[case] length: i64,
    #[case] capacity: i32,
) {
    assert!(matches!(
        generate_slots(start, end, length, capacity),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn picker_groups_by_date_then_always_on_then_unscheduled() {
    let day_two = at(9, 0) + Duration::days(1);
    let windows = vec![
        ("late", Some(at(15, 0)), false),
        ("always", None, true),
        ("tomorrow", Some(day_two), false),
        ("loose", None, false),
        ("early", Some(at(9, 0)), false),
    ];
    let groups = group_by_fulfillment_date(windows, |w| (w.1, w.2));

    let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["2026-03-14", "2026-03-15", ALWAYS_ON_KEY, UNSCHEDULED_KEY]);
    let first: Vec<&str> = groups[0].1.iter().map(|w| w.0).collect();
    assert_eq!(first, ["early", "late"]);
}

// Checkout

#[test]
fn totals_add_tax_fee_and_split_commission() {
    let totals = OrderTotals::compute(&[(900, 2), (1200, 1)], 850, 200, 500);
    assert_eq!(totals.subtotal, 3000);
    assert_eq!(totals.tax, 255);
    assert_eq!(totals.delivery_fee, 500);
    assert_eq!(totals.total, 3755);
    assert_eq!(totals.commission, 75);
    assert_eq!(totals.vendor_payout, 3680);
}

#[rstest]
#[case(1000, 850, 85)]
#[case(5, 1000, 1)]
#[case(4, 1000, 0)]
#[case(0, 850, 0)]
fn basis_points_round_half_up(#[case] amount: i64, #[case] bps: i64, #[case] expected: i64) {
    assert_eq!(apply_bps(amount, bps), expected);
}

#[test]
fn order_number_embeds_date_and_id_prefix() {
    let id = Uuid::parse_str("1b2c3d4e-0000-4000-8000-000000000000").unwrap();
    assert_eq!(build_order_number(id, at(12, 0)), "CA-20260314-1b2c3d4e");
}

#[rstest]
#[case(OrderStatus::Paid, PaymentStatus::Paid, FulfillmentStatus::InProgress, OrderStatus::Paid)]
#[case(OrderStatus::Paid, PaymentStatus::Paid, FulfillmentStatus::Ready, OrderStatus::Ready)]
#[case(OrderStatus::Ready, PaymentStatus::Paid, FulfillmentStatus::Completed, OrderStatus::Fulfilled)]
#[case(OrderStatus::Pending, PaymentStatus::Unpaid, FulfillmentStatus::Cancelled, OrderStatus::Cancelled)]
fn fulfillment_moves_the_order(
    #[case] order: OrderStatus,
    #[case] payment: PaymentStatus,
    #[case] next: FulfillmentStatus,
    #[case] expected: OrderStatus,
) {
    assert_eq!(
        order_status_after_fulfillment(order, payment, next).ok(),
        Some(expected)
    );
}

#[test]
fn fulfillment_refusals() {
    assert!(matches!(
        order_status_after_fulfillment(
            OrderStatus::Pending,
            PaymentStatus::Unpaid,
            FulfillmentStatus::Completed
        ),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        order_status_after_fulfillment(
            OrderStatus::Paid,
            PaymentStatus::Paid,
            FulfillmentStatus::Cancelled
        ),
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        order_status_after_fulfillment(
            OrderStatus::Cancelled,
            PaymentStatus::Unpaid,
            FulfillmentStatus::Ready
        ),
        Err(AppError::Conflict(_))
    ));
}

// Pulse

fn item(product_id: Uuid, name: &str, quantity: i32, price: i64) -> PulseItem {
    PulseItem {
        product_id,
        product_name: name.into(),
        quantity,
        price,
    }
}

#[test]
fn period_bounds_are_back_to_back() {
    let now = at(12, 0);
    let (previous, current, end) = PulsePeriod::Weekly.bounds(now);
    assert_eq!(end, now);
    assert_eq!(current, now - Duration::days(7));
    assert_eq!(previous, now - Duration::days(14));
    assert_eq!(PulsePeriod::default(), PulsePeriod::Weekly);
}

#[test]
fn pulse_summarizes_orders_and_ranks_products() {
    let bread = Uuid::new_v4();
    let cake = Uuid::new_v4();
    let orders = [
        PulseOrder { subtotal: 1000, commission: 20, vendor_payout: 980 },
        PulseOrder { subtotal: 3000, commission: 60, vendor_payout: 2940 },
    ];
    let items = [
        item(bread, "Bread", 2, 500),
        item(cake, "Cake", 1, 3000),
    ];
    let summary = summarize(PulsePeriod::Weekly, at(0, 0), at(12, 0), &orders, &items, 2000);

    assert_eq!(summary.orders, 2);
    assert_eq!(summary.items_sold, 3);
    assert_eq!(summary.gross, 4000);
    assert_eq!(summary.commission, 80);
    assert_eq!(summary.net_payout, 3920);
    assert_eq!(summary.average_order_value, 2000);
    assert_eq!(summary.gross_change_pct, Some(100.0));
    assert_eq!(summary.top_products[0].product_id, bread);
    assert_eq!(summary.top_products[0].revenue, 1000);
    assert_eq!(summary.top_products[1].name, "Cake");
}

#[test]
fn pulse_without_history_has_no_change_and_caps_top_products() {
    let items: Vec<PulseItem> = (0..TOP_PRODUCTS + 2)
        .map(|i| item(Uuid::new_v4(), &format!("p{i}"), 1, 100))
        .collect();
    let summary = summarize(PulsePeriod::Daily, at(0, 0), at(12, 0), &[], &items, 0);
    assert_eq!(summary.gross_change_pct, None);
    assert_eq!(summary.average_order_value, 0);
    assert_eq!(summary.top_products.len(), TOP_PRODUCTS);
}

// Webhook signatures

const SECRET: &str = "whsec_domain_test";
const PAYLOAD: &[u8] = br#"{"id":"evt_1"}"#;
const NOW: i64 = 1_773_489_600;

#[test]
fn signed_payload_verifies() -> anyhow::Result<()> {
    let sig = signature::sign(SECRET, NOW, PAYLOAD)?;
    let header = format!("t={NOW},v1=deadbeef,v1={sig}");
    assert_eq!(signature::verify(&header, PAYLOAD, SECRET, NOW + 10, 300), Ok(()));
    Ok(())
}

#[rstest]
#[case::tampered(br#"{"id":"evt_2"}"#.as_slice(), NOW, SignatureError::Mismatch)]
#[case::stale(PAYLOAD, NOW + 301, SignatureError::Expired)]
fn verification_failures(
    #[case] payload: &[u8],
    #[case] now: i64,
    #[case] expected: SignatureError,
) -> anyhow::Result<()> {
    let sig = signature::sign(SECRET, NOW, PAYLOAD)?;
    let header = format!("t={NOW},v1={sig}");
    assert_eq!(signature::verify(&header, payload, SECRET, now, 300), Err(expected));
    Ok(())
}

#[rstest]
#[case("v1=abcd", SignatureError::MissingTimestamp)]
#[case("t=1773489600", SignatureError::MissingSignature)]
#[case::timestamp_at_i64_min("t=-9223372036854775808,v1=00", SignatureError::Expired)]
#[case::timestamp_at_i64_max("t=9223372036854775807,v1=00", SignatureError::Expired)]
fn malformed_headers(#[case] header: &str, #[case] expected: SignatureError) {
    assert_eq!(signature::verify(header, PAYLOAD, SECRET, NOW, 300), Err(expected));
}

// Slugs, events and roles

#[rstest]
#[case("Rise & Crumb Bakery", "rise-crumb-bakery")]
#[case("  Hello, World!  ", "hello-world")]
#[case("Café Olé", "caf-ol")]
#[case("!!!", "item")]
fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(slugify(input), expected);
}

#[test]
fn slug_candidates_are_numbered_from_two() {
    assert_eq!(candidate("market", 1), "market");
    assert_eq!(candidate("market", 3), "market-3");
}

#[test]
fn event_validation() {
    let start = at(9, 0);
    let end = at(17, 0);
    assert!(validate_event("Spring Market", "Local makers", "Town Square", start, end, Some(40)).is_ok());
    assert!(validate_event("", "Local makers", "Town Square", start, end, None).is_err());
    assert!(validate_event("Spring Market", "Local makers", " ", start, end, None).is_err());
    assert!(validate_event("Spring Market", "Local makers", "Town Square", end, start, None).is_err());
    assert!(validate_event("Spring Market", "Local makers", "Town Square", start, end, Some(0)).is_err());
}

#[test]
fn admin_is_not_self_assignable() {
    assert!(Role::Customer.self_assignable());
    assert!(Role::Coordinator.self_assignable());
    assert!(!Role::Admin.self_assignable());
}
