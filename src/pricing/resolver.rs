//! Picks the single promotion that applies to a product and its unit discount.
//!
//! Precedence:
//! 1. An active weighted promotion always wins over percentage/fixed ones.
//! 2. Otherwise the first active percentage/fixed promotion in collection
//!    order wins. There is no "best discount" search.
//!
//! Inactive candidates (disabled, or `at` outside their window) are skipped.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use super::{
    ProductSnapshot,
    promotion::{PromotionKind, PromotionRule, PromotionType, Slab},
};

/// Scale money values are kept at.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPromotion {
    pub id: Uuid,
    pub title: String,
    pub promotion_type: PromotionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub promotion: Option<AppliedPromotion>,
    pub unit_discount: Decimal,
}

impl Resolution {
    pub fn none() -> Self {
        Self {
            promotion: None,
            unit_discount: Decimal::ZERO,
        }
    }
}

pub fn resolve(
    product: &ProductSnapshot,
    candidates: &[PromotionRule],
    at: DateTime<Utc>,
) -> Resolution {
    let mut active = candidates.iter().filter(|p| p.is_active_at(at));
    let selected = active
        .clone()
        .find(|p| p.kind.is_weighted())
        .or_else(|| active.next());

    let Some(promotion) = selected else {
        return Resolution::none();
    };

    let raw = match &promotion.kind {
        PromotionKind::Weighted { slabs } => matching_slab(slabs, product.weight)
            .map(|slab| slab.discount)
            .unwrap_or(Decimal::ZERO),
        PromotionKind::Percentage { discount } => product.price * *discount / Decimal::ONE_HUNDRED,
        PromotionKind::Fixed { discount } => *discount,
    };

    Resolution {
        promotion: Some(AppliedPromotion {
            id: promotion.id,
            title: promotion.title.clone(),
            promotion_type: promotion.kind.promotion_type(),
        }),
        unit_discount: clamp_to_price(round_money(raw), product.price),
    }
}

/// Slab whose inclusive band contains `weight`.
///
/// When bands share a boundary (or overlap) the one with the highest
/// `min_weight` wins; among equal `min_weight` the later slab wins.
pub fn matching_slab(slabs: &[Slab], weight: Decimal) -> Option<&Slab> {
    slabs
        .iter()
        .filter(|slab| slab.contains(weight))
        .max_by(|a, b| a.min_weight.cmp(&b.min_weight))
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// a unit discount never exceeds the unit price
fn clamp_to_price(discount: Decimal, price: Decimal) -> Decimal {
    discount.min(price).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::pricing::promotion::PromotionWindow;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn product(price: i64, weight: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: Uuid::new_v4(),
            name: "Flour".into(),
            price: Decimal::from(price),
            weight: Decimal::from(weight),
            is_enabled: true,
        }
    }

    fn rule(title: &str, kind: PromotionKind) -> PromotionRule {
        PromotionRule {
            id: Uuid::new_v4(),
            title: title.into(),
            kind,
            window: PromotionWindow::new(now() - Duration::days(1), now() + Duration::days(1))
                .unwrap(),
            is_enabled: true,
        }
    }

    fn slabs() -> Vec<Slab> {
        vec![
            Slab::new(Decimal::ZERO, Decimal::from(500), Decimal::TEN).unwrap(),
            Slab::new(Decimal::from(500), Decimal::from(1000), Decimal::from(25)).unwrap(),
        ]
    }

    #[test]
    fn no_candidates_means_no_discount() {
        let resolution = resolve(&product(100, 10), &[], now());
        assert_eq!(resolution, Resolution::none());
    }

    #[test]
    fn percentage_discount_is_share_of_price() {
        let promo = rule("Spring", PromotionKind::Percentage { discount: Decimal::TEN });
        let resolution = resolve(&product(200, 10), &[promo.clone()], now());

        assert_eq!(resolution.unit_discount, Decimal::from(20));
        assert_eq!(resolution.promotion.unwrap().id, promo.id);
    }

    #[test]
    fn fixed_discount_is_absolute() {
        let promo = rule("Flat", PromotionKind::Fixed { discount: Decimal::from(15) });
        let resolution = resolve(&product(100, 10), &[promo], now());
        assert_eq!(resolution.unit_discount, Decimal::from(15));
    }

    #[test]
    fn weighted_wins_regardless_of_position() {
        let fixed = rule("Flat", PromotionKind::Fixed { discount: Decimal::from(50) });
        let weighted = rule("Heavy", PromotionKind::Weighted { slabs: slabs() });

        let resolution = resolve(&product(100, 200), &[fixed, weighted.clone()], now());

        assert_eq!(resolution.promotion.unwrap().id, weighted.id);
        assert_eq!(resolution.unit_discount, Decimal::TEN);
    }

    #[test]
    fn first_weighted_promotion_wins() {
        let fixed = rule("Flat", PromotionKind::Fixed { discount: Decimal::from(50) });
        let first = rule(
            "Light Goods",
            PromotionKind::Weighted {
                slabs: vec![
                    Slab::new(Decimal::ZERO, Decimal::from(1000), Decimal::from(4)).unwrap(),
                ],
            },
        );
        let second = rule("Heavy", PromotionKind::Weighted { slabs: slabs() });

        let resolution = resolve(&product(100, 400), &[fixed, first.clone(), second], now());

        assert_eq!(resolution.promotion.unwrap().id, first.id);
        assert_eq!(resolution.unit_discount, Decimal::from(4));
    }

    #[test]
    fn nested_slab_takes_precedence_over_enclosing_one() {
        let weighted = rule(
            "Nested",
            PromotionKind::Weighted {
                slabs: vec![
                    Slab::new(Decimal::ZERO, Decimal::from(800), Decimal::from(5)).unwrap(),
                    Slab::new(Decimal::from(300), Decimal::from(600), Decimal::from(9)).unwrap(),
                ],
            },
        );

        let inside = resolve(&product(100, 400), &[weighted.clone()], now());
        assert_eq!(inside.unit_discount, Decimal::from(9));

        let outside = resolve(&product(100, 700), &[weighted], now());
        assert_eq!(outside.unit_discount, Decimal::from(5));
    }

    #[test]
    fn first_flat_promotion_wins_over_bigger_later_one() {
        let small = rule("Small", PromotionKind::Fixed { discount: Decimal::ONE });
        let big = rule("Big", PromotionKind::Percentage { discount: Decimal::from(50) });

        let resolution = resolve(&product(100, 10), &[small.clone(), big], now());

        assert_eq!(resolution.promotion.unwrap().id, small.id);
        assert_eq!(resolution.unit_discount, Decimal::ONE);
    }

    #[test]
    fn shared_slab_boundary_resolves_to_upper_band() {
        let weighted = rule("Heavy", PromotionKind::Weighted { slabs: slabs() });
        let resolution = resolve(&product(100, 500), &[weighted], now());
        assert_eq!(resolution.unit_discount, Decimal::from(25));
    }

    #[test]
    fn weight_outside_every_slab_gets_zero() {
        let weighted = rule("Heavy", PromotionKind::Weighted { slabs: slabs() });
        let resolution = resolve(&product(100, 1500), &[weighted.clone()], now());

        assert_eq!(resolution.unit_discount, Decimal::ZERO);
        assert_eq!(resolution.promotion.unwrap().id, weighted.id);
    }

    #[test]
    fn inactive_promotions_are_ignored() {
        let mut disabled = rule("Off", PromotionKind::Fixed { discount: Decimal::from(5) });
        disabled.is_enabled = false;
        let mut expired = rule("Old", PromotionKind::Fixed { discount: Decimal::from(7) });
        expired.window =
            PromotionWindow::new(now() - Duration::days(10), now() - Duration::days(2)).unwrap();
        let live = rule("Live", PromotionKind::Fixed { discount: Decimal::from(3) });

        let resolution = resolve(&product(100, 10), &[disabled, expired, live.clone()], now());

        assert_eq!(resolution.promotion.unwrap().id, live.id);
        assert_eq!(resolution.unit_discount, Decimal::from(3));
    }

    #[test]
    fn discount_is_clamped_to_unit_price() {
        let promo = rule("Huge", PromotionKind::Fixed { discount: Decimal::from(500) });
        let resolution = resolve(&product(100, 10), &[promo], now());
        assert_eq!(resolution.unit_discount, Decimal::from(100));
    }

    #[test]
    fn percentage_rounds_to_cents() {
        let promo = rule("Third", PromotionKind::Percentage { discount: Decimal::from(15) });
        // 9.99 * 15% = 1.4985
        let mut item = product(0, 10);
        item.price = Decimal::new(999, 2);

        let resolution = resolve(&item, &[promo], now());

        assert_eq!(resolution.unit_discount, Decimal::new(150, 2));
    }
}
