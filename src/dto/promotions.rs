use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::Promotion,
    pricing::{PromotionType, Slab},
};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromotionRequest {
    #[validate(length(min = 1, message = "Promotion title is required"))]
    pub title: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub discount: Option<Decimal>,
    pub slabs: Option<Vec<Slab>>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromotionRequest {
    #[validate(length(min = 1, message = "Promotion title must not be empty"))]
    pub title: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Replaces the product associations when present.
    pub product_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PromotionStatusRequest {
    pub enable: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PromotionList {
    #[schema(value_type = Vec<Promotion>)]
    pub items: Vec<Promotion>,
}
