use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::{
    ProductSnapshot, TOTAL_COLUMN,
    promotion::PromotionRule,
    resolver::{AppliedPromotion, resolve},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("No products provided for the order")]
    EmptyOrder,

    #[error("Product with ID {0} not found or is disabled")]
    ProductUnavailable(Uuid),

    #[error("Quantity {quantity} for product {product_id} must be greater than 0")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },

    #[error("Order amount {0} exceeds the largest total that can be stored")]
    TotalTooLarge(Decimal),
}

/// Products and their associated promotions, read once per pricing request.
///
/// Promotions are kept in association order; the resolver's tie-break
/// depends on it.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: HashMap<Uuid, ProductSnapshot>,
    promotions: HashMap<Uuid, Vec<PromotionRule>>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product: ProductSnapshot, promotions: Vec<PromotionRule>) {
        self.promotions.insert(product.id, promotions);
        self.products.insert(product.id, product);
    }

    pub fn product(&self, id: Uuid) -> Option<&ProductSnapshot> {
        self.products.get(&id)
    }

    pub fn promotions_for(&self, id: Uuid) -> &[PromotionRule] {
        self.promotions.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product: ProductSnapshot,
    pub quantity: i32,
    pub promotion: Option<AppliedPromotion>,
    pub unit_discount: Decimal,
    /// `price * quantity`
    pub gross: Decimal,
    /// `unit_discount * quantity`
    pub discount: Decimal,
    /// `gross - discount`
    pub sub_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub sub_total: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Price every item against `snapshot`.
///
/// Lines come back in input order. The first unavailable product or bad
/// quantity aborts the whole order, as does a gross amount too large to store.
pub fn price_order(
    items: &[OrderItem],
    snapshot: &CatalogSnapshot,
    at: DateTime<Utc>,
) -> Result<PricedOrder, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyOrder);
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut sub_total = Decimal::ZERO;
    let mut discount = Decimal::ZERO;

    for item in items {
        if item.quantity <= 0 {
            return Err(PricingError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }
        let product = snapshot
            .product(item.product_id)
            .filter(|p| p.is_enabled)
            .ok_or(PricingError::ProductUnavailable(item.product_id))?;

        let line = price_line(
            product,
            snapshot.promotions_for(product.id),
            item.quantity,
            at,
        );
        sub_total += line.gross;
        discount += line.discount;
        lines.push(line);
    }

    // every line amount and the order total are bounded by the gross sub total
    if !TOTAL_COLUMN.holds(sub_total) {
        return Err(PricingError::TotalTooLarge(sub_total));
    }

    Ok(PricedOrder {
        lines,
        sub_total,
        discount,
        total: sub_total - discount,
    })
}

fn price_line(
    product: &ProductSnapshot,
    promotions: &[PromotionRule],
    quantity: i32,
    at: DateTime<Utc>,
) -> PricedLine {
    let resolution = resolve(product, promotions, at);
    let qty = Decimal::from(quantity);
    let gross = product.price * qty;
    let discount = resolution.unit_discount * qty;

    PricedLine {
        product: product.clone(),
        quantity,
        promotion: resolution.promotion,
        unit_discount: resolution.unit_discount,
        gross,
        discount,
        sub_total: gross - discount,
    }
}

/// Display price of a single product in the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub promotion: Option<AppliedPromotion>,
    pub unit_discount: Decimal,
    pub discounted_price: Decimal,
}

/// Same arithmetic as a quantity-1 line of [`price_order`].
pub fn catalog_entry(
    product: &ProductSnapshot,
    promotions: &[PromotionRule],
    at: DateTime<Utc>,
) -> CatalogEntry {
    let line = price_line(product, promotions, 1, at);
    CatalogEntry {
        promotion: line.promotion,
        unit_discount: line.unit_discount,
        discounted_price: line.sub_total,
    }
}
