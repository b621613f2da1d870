//! Promotion resolution and order pricing.
//!
//! Everything in here is pure: callers read a snapshot of products and
//! promotions from storage, price against it, and persist the result.

pub mod engine;
pub mod promotion;
pub mod resolver;

use rust_decimal::Decimal;
use uuid::Uuid;

pub use engine::{
    CatalogEntry, CatalogSnapshot, OrderItem, PricedLine, PricedOrder, PricingError,
    catalog_entry, price_order,
};
pub use promotion::{
    PromotionKind, PromotionRule, PromotionShapeError, PromotionType, PromotionWindow, Slab,
};
pub use resolver::{AppliedPromotion, Resolution, resolve};

/// Digits and scale of a `NUMERIC(digits, scale)` storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub digits: u32,
    pub scale: u32,
}

/// Prices, flat discounts and slab discounts.
pub const MONEY_COLUMN: Precision = Precision {
    digits: 12,
    scale: 2,
};
/// Product and slab weights.
pub const WEIGHT_COLUMN: Precision = Precision {
    digits: 12,
    scale: 3,
};
/// Order and order-line totals.
pub const TOTAL_COLUMN: Precision = Precision {
    digits: 14,
    scale: 2,
};

impl Precision {
    /// Whether `value` is stored without rounding or overflow.
    pub fn holds(&self, value: Decimal) -> bool {
        let value = value.normalize();
        let limit = Decimal::from(10_i64.pow(self.digits - self.scale));
        value.scale() <= self.scale && value.abs() < limit
    }
}

/// The product fields pricing depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub weight: Decimal,
    pub is_enabled: bool,
}
