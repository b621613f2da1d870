//! Promotion shapes accepted by the pricing core.
//!
//! A promotion's type decides which fields it carries: percentage and fixed
//! promotions have a flat `discount`, weighted promotions have weight slabs.
//! [`PromotionKind::from_parts`] is the only way to build one from loose
//! request or database fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{MONEY_COLUMN, WEIGHT_COLUMN};

/// Promotion type tag as stored and sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    Percentage,
    Fixed,
    Weighted,
}

impl PromotionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionType::Percentage => "percentage",
            PromotionType::Fixed => "fixed",
            PromotionType::Weighted => "weighted",
        }
    }
}

/// Rejected promotion shapes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromotionShapeError {
    #[error("discount is required for {0} promotions")]
    MissingDiscount(&'static str),

    #[error("discount must be empty for weighted promotions")]
    UnexpectedDiscount,

    #[error("slabs are required for weighted promotions")]
    MissingSlabs,

    #[error("slabs are only allowed on weighted promotions")]
    UnexpectedSlabs,

    #[error("slab minWeight must be less than maxWeight")]
    InvalidSlabRange,

    #[error("weights and discounts must not be negative")]
    Negative,

    #[error("percentage discount must not exceed 100")]
    PercentageOverflow,

    #[error("start date must not be after end date")]
    InvalidWindow,

    #[error("{0} has more digits or decimal places than can be stored")]
    Unrepresentable(&'static str),
}

/// One weight band of a weighted promotion. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slab {
    pub min_weight: Decimal,
    pub max_weight: Decimal,
    pub discount: Decimal,
}

impl Slab {
    pub fn new(
        min_weight: Decimal,
        max_weight: Decimal,
        discount: Decimal,
    ) -> Result<Self, PromotionShapeError> {
        if min_weight.is_sign_negative() || discount.is_sign_negative() {
            return Err(PromotionShapeError::Negative);
        }
        if !WEIGHT_COLUMN.holds(min_weight) {
            return Err(PromotionShapeError::Unrepresentable("slab minWeight"));
        }
        if !WEIGHT_COLUMN.holds(max_weight) {
            return Err(PromotionShapeError::Unrepresentable("slab maxWeight"));
        }
        if !MONEY_COLUMN.holds(discount) {
            return Err(PromotionShapeError::Unrepresentable("slab discount"));
        }
        if min_weight >= max_weight {
            return Err(PromotionShapeError::InvalidSlabRange);
        }
        Ok(Self {
            min_weight,
            max_weight,
            discount,
        })
    }

    pub fn contains(&self, weight: Decimal) -> bool {
        self.min_weight <= weight && weight <= self.max_weight
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionKind {
    /// Percent of the unit price, `0..=100`.
    Percentage { discount: Decimal },
    /// Absolute amount per unit.
    Fixed { discount: Decimal },
    /// Absolute amount per unit picked from the slab containing the product weight.
    Weighted { slabs: Vec<Slab> },
}

impl PromotionKind {
    /// Build a promotion kind from its loose parts.
    ///
    /// `slabs: Some(vec![])` counts as "slabs present": it is rejected on
    /// percentage and fixed promotions and is not enough for a weighted one.
    pub fn from_parts(
        promotion_type: PromotionType,
        discount: Option<Decimal>,
        slabs: Option<Vec<Slab>>,
    ) -> Result<Self, PromotionShapeError> {
        match promotion_type {
            PromotionType::Weighted => {
                if discount.is_some() {
                    return Err(PromotionShapeError::UnexpectedDiscount);
                }
                let slabs = slabs
                    .filter(|s| !s.is_empty())
                    .ok_or(PromotionShapeError::MissingSlabs)?;
                for slab in &slabs {
                    Slab::new(slab.min_weight, slab.max_weight, slab.discount)?;
                }
                Ok(PromotionKind::Weighted { slabs })
            }
            PromotionType::Percentage | PromotionType::Fixed => {
                if slabs.is_some() {
                    return Err(PromotionShapeError::UnexpectedSlabs);
                }
                let discount =
                    discount.ok_or(PromotionShapeError::MissingDiscount(promotion_type.as_str()))?;
                if discount.is_sign_negative() {
                    return Err(PromotionShapeError::Negative);
                }
                if !MONEY_COLUMN.holds(discount) {
                    return Err(PromotionShapeError::Unrepresentable("discount"));
                }
                if promotion_type == PromotionType::Percentage {
                    if discount > Decimal::ONE_HUNDRED {
                        return Err(PromotionShapeError::PercentageOverflow);
                    }
                    Ok(PromotionKind::Percentage { discount })
                } else {
                    Ok(PromotionKind::Fixed { discount })
                }
            }
        }
    }

    pub fn promotion_type(&self) -> PromotionType {
        match self {
            PromotionKind::Percentage { .. } => PromotionType::Percentage,
            PromotionKind::Fixed { .. } => PromotionType::Fixed,
            PromotionKind::Weighted { .. } => PromotionType::Weighted,
        }
    }

    /// Flat discount for percentage/fixed promotions, `None` for weighted.
    pub fn flat_discount(&self) -> Option<Decimal> {
        match self {
            PromotionKind::Percentage { discount } | PromotionKind::Fixed { discount } => {
                Some(*discount)
            }
            PromotionKind::Weighted { .. } => None,
        }
    }

    pub fn slabs(&self) -> &[Slab] {
        match self {
            PromotionKind::Weighted { slabs } => slabs,
            _ => &[],
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, PromotionKind::Weighted { .. })
    }
}

/// Inclusive active window of a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl PromotionWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, PromotionShapeError> {
        if start > end {
            return Err(PromotionShapeError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    pub fn overlaps(&self, other: &PromotionWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A promotion as the resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRule {
    pub id: Uuid,
    pub title: String,
    pub kind: PromotionKind,
    pub window: PromotionWindow,
    pub is_enabled: bool,
}

impl PromotionRule {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.is_enabled && self.window.contains(at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn slab(min: i64, max: i64, discount: i64) -> Slab {
        Slab {
            min_weight: Decimal::from(min),
            max_weight: Decimal::from(max),
            discount: Decimal::from(discount),
        }
    }

    #[test]
    fn weighted_without_slabs_is_rejected() {
        let err = PromotionKind::from_parts(PromotionType::Weighted, None, None).unwrap_err();
        assert_eq!(err, PromotionShapeError::MissingSlabs);

        let err =
            PromotionKind::from_parts(PromotionType::Weighted, None, Some(vec![])).unwrap_err();
        assert_eq!(err, PromotionShapeError::MissingSlabs);
    }

    #[test]
    fn weighted_with_discount_is_rejected() {
        let err = PromotionKind::from_parts(
            PromotionType::Weighted,
            Some(Decimal::TEN),
            Some(vec![slab(0, 500, 10)]),
        )
        .unwrap_err();
        assert_eq!(err, PromotionShapeError::UnexpectedDiscount);
    }

    #[test]
    fn percentage_with_slabs_is_rejected() {
        let err = PromotionKind::from_parts(
            PromotionType::Percentage,
            Some(Decimal::TEN),
            Some(vec![slab(0, 500, 10)]),
        )
        .unwrap_err();
        assert_eq!(err, PromotionShapeError::UnexpectedSlabs);

        let err = PromotionKind::from_parts(PromotionType::Fixed, Some(Decimal::TEN), Some(vec![]))
            .unwrap_err();
        assert_eq!(err, PromotionShapeError::UnexpectedSlabs);
    }

    #[test]
    fn flat_promotions_need_a_discount() {
        let err = PromotionKind::from_parts(PromotionType::Fixed, None, None).unwrap_err();
        assert_eq!(err, PromotionShapeError::MissingDiscount("fixed"));
    }

    #[test]
    fn slab_bounds_must_be_ordered() {
        let err = PromotionKind::from_parts(
            PromotionType::Weighted,
            None,
            Some(vec![slab(0, 500, 10), slab(700, 700, 5)]),
        )
        .unwrap_err();
        assert_eq!(err, PromotionShapeError::InvalidSlabRange);
    }

    #[test]
    fn percentage_is_capped_at_one_hundred() {
        let err = PromotionKind::from_parts(
            PromotionType::Percentage,
            Some(Decimal::from(101)),
            None,
        )
        .unwrap_err();
        assert_eq!(err, PromotionShapeError::PercentageOverflow);

        let kind =
            PromotionKind::from_parts(PromotionType::Percentage, Some(Decimal::ONE_HUNDRED), None)
                .unwrap();
        assert_eq!(kind.flat_discount(), Some(Decimal::ONE_HUNDRED));
    }

    #[test]
    fn negative_discount_is_rejected() {
        let err = PromotionKind::from_parts(PromotionType::Fixed, Some(Decimal::NEGATIVE_ONE), None)
            .unwrap_err();
        assert_eq!(err, PromotionShapeError::Negative);
    }

    #[test]
    fn values_finer_than_storage_are_rejected() {
        // 0.0001 and 0.0004 would both round to 0.000 in a NUMERIC(12, 3) column
        let err = Slab::new(Decimal::new(1, 4), Decimal::new(4, 4), Decimal::ONE).unwrap_err();
        assert_eq!(err, PromotionShapeError::Unrepresentable("slab minWeight"));

        let err = PromotionKind::from_parts(
            PromotionType::Weighted,
            None,
            Some(vec![Slab {
                min_weight: Decimal::ZERO,
                max_weight: Decimal::from(500),
                discount: Decimal::new(1005, 3),
            }]),
        )
        .unwrap_err();
        assert_eq!(err, PromotionShapeError::Unrepresentable("slab discount"));

        let err =
            PromotionKind::from_parts(PromotionType::Fixed, Some(Decimal::new(12345, 3)), None)
                .unwrap_err();
        assert_eq!(err, PromotionShapeError::Unrepresentable("discount"));

        let err = PromotionKind::from_parts(
            PromotionType::Fixed,
            Some(Decimal::from(10_000_000_000_i64)),
            None,
        )
        .unwrap_err();
        assert_eq!(err, PromotionShapeError::Unrepresentable("discount"));
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        let slab = Slab::new(Decimal::new(5000, 4), Decimal::new(25, 1), Decimal::new(1000, 3))
            .unwrap();
        assert_eq!(slab.discount, Decimal::ONE);
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(7);
        let window = PromotionWindow::new(start, end).unwrap();

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(end + Duration::seconds(1)));
        assert!(PromotionWindow::new(end, start).is_err());
    }

    #[test]
    fn windows_touching_at_an_edge_overlap() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = PromotionWindow::new(start, start + Duration::days(7)).unwrap();
        let b = PromotionWindow::new(start + Duration::days(7), start + Duration::days(9)).unwrap();
        let c = PromotionWindow::new(start + Duration::days(8), start + Duration::days(9)).unwrap();

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
