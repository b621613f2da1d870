use std::time::Duration;

use chrono::Utc;
use order_admin_api::{
    config::AppConfig,
    db::run_migrations,
    dto::{products::CreateProductRequest, promotions::CreatePromotionRequest},
    entity::users::ActiveModel as UserActive,
    middleware::auth::{AuthUser, Role},
    models::{Product, Promotion},
    pricing::{PromotionType, Slab},
    services::{product_service, promotion_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

/// Connect to the test database, or `None` when none is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
            return Ok(None);
        }
    };

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        db_max_connections: 5,
        db_acquire_timeout: Duration::from_secs(5),
    };
    let state = AppState::connect(&config).await?;
    run_migrations(&state.orm).await?;

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE order_lines, orders, promotion_products, promotion_slabs, promotions, \
             audit_logs, products, users RESTART IDENTITY CASCADE",
        ))
        .await?;

    Ok(Some(state))
}

pub async fn staff_user(state: &AppState, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(Role::Moderator.as_str().into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: Role::Moderator,
    })
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    name: &str,
    price: i64,
    weight: i64,
) -> anyhow::Result<Product> {
    let resp = product_service::create_product(
        state,
        user,
        CreateProductRequest {
            name: name.into(),
            description: None,
            price: Decimal::from(price),
            weight: Decimal::from(weight),
            is_enabled: None,
        },
    )
    .await?;
    resp.data.ok_or_else(|| anyhow::anyhow!("missing product"))
}

pub fn promotion_request(
    title: &str,
    promotion_type: PromotionType,
    discount: Option<i64>,
    slabs: Option<Vec<Slab>>,
    product_ids: Vec<Uuid>,
) -> CreatePromotionRequest {
    let now = Utc::now();
    CreatePromotionRequest {
        title: title.into(),
        promotion_type,
        discount: discount.map(Decimal::from),
        slabs,
        start_date: now - chrono::Duration::days(1),
        end_date: now + chrono::Duration::days(7),
        product_ids,
    }
}

pub async fn create_promotion(
    state: &AppState,
    user: &AuthUser,
    request: CreatePromotionRequest,
) -> anyhow::Result<Promotion> {
    let resp = promotion_service::create_promotion(state, user, request).await?;
    resp.data.ok_or_else(|| anyhow::anyhow!("missing promotion"))
}

pub fn slab(min: i64, max: i64, discount: i64) -> Slab {
    Slab {
        min_weight: Decimal::from(min),
        max_weight: Decimal::from(max),
        discount: Decimal::from(discount),
    }
}
