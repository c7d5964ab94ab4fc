use chrono::{Duration, DurationRound, Utc};
use craved_artisan_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

const WINDOW_NAME: &str = "Saturday Market Pickup";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    let vendor_user = ensure_user(&pool, "baker@example.com", "vendor123", "vendor").await?;
    let customer_id = ensure_user(&pool, "customer@example.com", "customer123", "customer").await?;
    let coordinator_id =
        ensure_user(&pool, "markets@example.com", "coordinator123", "coordinator").await?;

    let vendor_id = ensure_vendor_profile(&pool, vendor_user).await?;
    let product_ids = seed_products(&pool, vendor_id).await?;
    let window_id = seed_window(&pool, vendor_id, &product_ids).await?;

    println!(
        "Seed completed. Admin: {admin_id}, Vendor: {vendor_id}, Customer: {customer_id}, \
         Coordinator: {coordinator_id}, Window: {window_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role, email_verified, email_verified_at)
        VALUES ($1, $2, $3, $4, TRUE, NOW())
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_vendor_profile(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<Uuid> {
    let (vendor_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO vendor_profiles (id, user_id, store_name, slug, bio, city, stripe_account_id)
        VALUES ($1, $2, 'Rise & Crumb Bakery', 'rise-crumb-bakery',
                'Naturally leavened bread baked the morning of pickup.', 'Austin', 'acct_seed_vendor')
        ON CONFLICT (user_id) DO UPDATE SET stripe_account_id = EXCLUDED.stripe_account_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(vendor_id)
}

async fn seed_products(pool: &sqlx::PgPool, vendor_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
    let existing: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE vendor_id = $1 ORDER BY created_at")
            .bind(vendor_id)
            .fetch_all(pool)
            .await?;
    if !existing.is_empty() {
        println!("Products already present, skipping");
        return Ok(existing.into_iter().map(|(id,)| id).collect());
    }

    // name, description, price, unit cost, stock
    let products = [
        ("Country Sourdough", "Classic loaf, 48 hour ferment", 900_i64, 310_i64, 40),
        ("Seeded Rye", "Dense rye with sunflower and flax", 1000, 360, 25),
        ("Morning Buns", "Box of four, orange and cardamom", 1400, 520, 30),
        ("Olive Focaccia", "Half sheet with castelvetrano olives", 1200, 450, 15),
    ];

    let mut ids = Vec::with_capacity(products.len());
    for (name, description, price, unit_cost, stock) in products {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO products (id, vendor_id, name, description, price, unit_cost, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(vendor_id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(unit_cost)
        .bind(stock)
        .execute(pool)
        .await?;

        sqlx::query(
            "INSERT INTO product_price_history (id, product_id, price, unit_cost) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(price)
        .bind(unit_cost)
        .execute(pool)
        .await?;
        ids.push(id);
    }

    println!("Seeded {} products", ids.len());
    Ok(ids)
}

async fn seed_window(
    pool: &sqlx::PgPool,
    vendor_id: Uuid,
    product_ids: &[Uuid],
) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM sales_windows WHERE vendor_id = $1 AND name = $2")
            .bind(vendor_id)
            .bind(WINDOW_NAME)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        println!("Sales window already present, skipping");
        return Ok(id);
    }

    let now = Utc::now().duration_trunc(Duration::hours(1))?;
    let fulfill_start = now + Duration::days(5);
    let fulfill_end = fulfill_start + Duration::hours(3);
    let window_id = Uuid::new_v4();

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO sales_windows (
            id, vendor_id, window_type, name, description, status, location_name, address_text,
            preorder_open_at, preorder_close_at, fulfill_start_at, fulfill_end_at,
            capacity_total, pickup_instructions
        )
        VALUES ($1, $2, 'market', $3, 'Preorder for pickup at the farmers market booth.', 'open',
                'Downtown Farmers Market', '400 Guadalupe St', $4, $5, $6, $7, 60,
                'Booth 14, look for the green awning.')
        "#,
    )
    .bind(window_id)
    .bind(vendor_id)
    .bind(WINDOW_NAME)
    .bind(now - Duration::days(1))
    .bind(fulfill_start - Duration::days(1))
    .bind(fulfill_start)
    .bind(fulfill_end)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO sales_window_metrics (sales_window_id) VALUES ($1)")
        .bind(window_id)
        .execute(&mut *tx)
        .await?;

    for product_id in product_ids {
        sqlx::query(
            r#"
            INSERT INTO sales_window_products (id, sales_window_id, product_id, qty_limit_per_customer)
            VALUES ($1, $2, $3, 4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(window_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    }

    let mut slot_start = fulfill_start;
    while slot_start < fulfill_end {
        let slot_end = (slot_start + Duration::minutes(30)).min(fulfill_end);
        sqlx::query(
            r#"
            INSERT INTO sales_window_slots (id, sales_window_id, starts_at, ends_at, capacity)
            VALUES ($1, $2, $3, $4, 10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(window_id)
        .bind(slot_start)
        .bind(slot_end)
        .execute(&mut *tx)
        .await?;
        slot_start = slot_end;
    }
    tx.commit().await?;

    println!("Seeded open sales window {window_id}");
    Ok(window_id)
}
