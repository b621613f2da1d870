use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Audited mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    PromotionCreate,
    PromotionUpdate,
    PromotionStatus,
    PromotionDelete,
    OrderCreate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::PromotionCreate => "promotion_create",
            AuditAction::PromotionUpdate => "promotion_update",
            AuditAction::PromotionStatus => "promotion_status",
            AuditAction::PromotionDelete => "promotion_delete",
            AuditAction::OrderCreate => "order_create",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::UserRegister | AuditAction::UserLogin => "users",
            AuditAction::ProductCreate
            | AuditAction::ProductUpdate
            | AuditAction::ProductDelete => "products",
            AuditAction::PromotionCreate
            | AuditAction::PromotionUpdate
            | AuditAction::PromotionStatus
            | AuditAction::PromotionDelete => "promotions",
            AuditAction::OrderCreate => "orders",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write an audit row; failures are logged and otherwise ignored.
pub async fn record(pool: &DbPool, user_id: Option<Uuid>, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, user_id, action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
