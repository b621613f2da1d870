use chrono::{Duration, Utc};
use order_admin_api::{
    config::AppConfig,
    db::{create_pool, create_orm_conn, run_migrations},
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config).await?;
    // Ensure migrations are applied.
    run_migrations(&create_orm_conn(&config).await?).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    ensure_user_with_role(&pool, "moderator@example.com", "moderator123", "moderator").await?;
    let user_id = ensure_user_with_role(&pool, "user@example.com", "user123", "user").await?;
    let rice_id = seed_products(&pool).await?;
    seed_weighted_promotion(&pool, rice_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
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

/// Returns the id of the rice product, which the sample promotion targets.
async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<Uuid> {
    let products = [
        ("Basmati Rice 5kg", "Long grain rice", Decimal::new(2450, 2), Decimal::from(5000)),
        ("Green Tea", "Loose leaf, 100g", Decimal::new(899, 2), Decimal::from(100)),
        ("Olive Oil 1L", "Extra virgin", Decimal::new(1275, 2), Decimal::from(950)),
        ("Sea Salt", "Coarse, 500g", Decimal::new(350, 2), Decimal::from(500)),
    ];

    for (name, desc, price, weight) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, weight)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(weight)
        .execute(pool)
        .await?;
    }

    let (rice_id,): (Uuid,) = sqlx::query_as("SELECT id FROM products WHERE name = $1")
        .bind(products[0].0)
        .fetch_one(pool)
        .await?;

    println!("Seeded products");
    Ok(rice_id)
}

async fn seed_weighted_promotion(pool: &sqlx::PgPool, product_id: Uuid) -> anyhow::Result<()> {
    let title = "Bulk Weight Deal";
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM promotions WHERE title = $1")
        .bind(title)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        println!("Promotion {title} already present");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let promotion_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO promotions (id, title, promotion_type, start_date, end_date)
        VALUES ($1, $2, 'weighted', $3, $4)
        "#,
    )
    .bind(promotion_id)
    .bind(title)
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(30))
    .execute(&mut *tx)
    .await?;

    let slabs = [
        (Decimal::ZERO, Decimal::from(1000), Decimal::new(50, 2)),
        (Decimal::from(1000), Decimal::from(5000), Decimal::from(2)),
        (Decimal::from(5000), Decimal::from(20000), Decimal::from(5)),
    ];
    for (position, (min_weight, max_weight, discount)) in slabs.into_iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO promotion_slabs
                (id, promotion_id, position, min_weight, max_weight, discount)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(promotion_id)
        .bind(position as i32)
        .bind(min_weight)
        .bind(max_weight)
        .bind(discount)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO promotion_products (id, promotion_id, product_id) VALUES ($1, $2, $3)",
    )
    .bind(Uuid::new_v4())
    .bind(promotion_id)
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    println!("Seeded promotion {title}");
    Ok(())
}
