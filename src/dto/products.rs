use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Product, PromotionSnapshot};

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub weight: Decimal,
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "Product name must not be empty"))]
    pub name: Option<String>,
    /// An empty or blank string clears the description.
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub is_enabled: Option<bool>,
}

/// Catalog row: an enabled product with its resolved promotion.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    #[serde(flatten)]
    pub product: Product,
    pub promotion: Option<PromotionSnapshot>,
    pub unit_discount: Decimal,
    pub discounted_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CatalogList {
    #[schema(value_type = Vec<CatalogProduct>)]
    pub items: Vec<CatalogProduct>,
}
