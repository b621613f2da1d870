//! Loads promotions from storage into the shapes the pricing core works on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    entity::{
        promotion_products::{Column as LinkCol, Entity as PromotionProducts},
        promotion_slabs::{Column as SlabCol, Entity as PromotionSlabs, Model as SlabModel},
        promotions::{Column as PromoCol, Entity as Promotions, Model as PromotionModel},
    },
    error::{AppError, AppResult},
    pricing::{PromotionKind, PromotionRule, PromotionType, PromotionWindow, Slab},
};

/// Promotions attached to each of `product_ids` that are enabled and whose
/// window contains `at`, in association order.
pub async fn load_active_rules<C: ConnectionTrait>(
    db: &C,
    product_ids: &[Uuid],
    at: DateTime<Utc>,
) -> AppResult<HashMap<Uuid, Vec<PromotionRule>>> {
    let mut rules: HashMap<Uuid, Vec<PromotionRule>> = HashMap::new();
    if product_ids.is_empty() {
        return Ok(rules);
    }

    let links = PromotionProducts::find()
        .filter(LinkCol::ProductId.is_in(product_ids.iter().copied()))
        .order_by_asc(LinkCol::CreatedAt)
        .order_by_asc(LinkCol::PromotionId)
        .find_also_related(Promotions)
        .filter(PromoCol::IsEnabled.eq(true))
        .filter(PromoCol::StartDate.lte(at))
        .filter(PromoCol::EndDate.gte(at))
        .all(db)
        .await?;

    let promotion_ids: Vec<Uuid> = links
        .iter()
        .filter_map(|(_, promotion)| promotion.as_ref().map(|p| p.id))
        .collect();
    let mut slabs = load_slabs(db, &promotion_ids).await?;

    let mut built: HashMap<Uuid, PromotionRule> = HashMap::new();
    for (link, promotion) in links {
        let Some(promotion) = promotion else {
            continue;
        };
        let rule = match built.get(&promotion.id) {
            Some(rule) => rule.clone(),
            None => {
                let rule =
                    rule_from_entity(&promotion, slabs.remove(&promotion.id).unwrap_or_default())?;
                built.insert(promotion.id, rule.clone());
                rule
            }
        };
        rules.entry(link.product_id).or_default().push(rule);
    }

    Ok(rules)
}

/// Slabs of each promotion, in submitted order.
pub async fn load_slabs<C: ConnectionTrait>(
    db: &C,
    promotion_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Slab>>> {
    let mut slabs: HashMap<Uuid, Vec<Slab>> = HashMap::new();
    if promotion_ids.is_empty() {
        return Ok(slabs);
    }

    let rows = PromotionSlabs::find()
        .filter(SlabCol::PromotionId.is_in(promotion_ids.iter().copied()))
        .order_by_asc(SlabCol::PromotionId)
        .order_by_asc(SlabCol::Position)
        .all(db)
        .await?;

    for row in rows {
        slabs
            .entry(row.promotion_id)
            .or_default()
            .push(slab_from_entity(&row));
    }
    Ok(slabs)
}

pub fn slab_from_entity(model: &SlabModel) -> Slab {
    Slab {
        min_weight: model.min_weight,
        max_weight: model.max_weight,
        discount: model.discount,
    }
}

/// Rebuild a validated rule from a stored row.
pub fn rule_from_entity(model: &PromotionModel, slabs: Vec<Slab>) -> AppResult<PromotionRule> {
    let promotion_type = PromotionType::from(model.promotion_type);
    let slabs = (promotion_type == PromotionType::Weighted).then_some(slabs);
    let kind = PromotionKind::from_parts(promotion_type, model.discount, slabs)
        .map_err(|e| malformed(model.id, e))?;
    let window = PromotionWindow::new(
        model.start_date.with_timezone(&Utc),
        model.end_date.with_timezone(&Utc),
    )
    .map_err(|e| malformed(model.id, e))?;

    Ok(PromotionRule {
        id: model.id,
        title: model.title.clone(),
        kind,
        window,
        is_enabled: model.is_enabled,
    })
}

fn malformed(id: Uuid, err: impl std::fmt::Display) -> AppError {
    AppError::Internal(anyhow::anyhow!("stored promotion {id} is malformed: {err}"))
}
