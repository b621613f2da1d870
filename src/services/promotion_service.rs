use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{self, AuditAction},
    dto::promotions::{
        CreatePromotionRequest, PromotionList, PromotionStatusRequest, UpdatePromotionRequest,
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        promotion_products::{
            ActiveModel as LinkActive, Column as LinkCol, Entity as PromotionProducts,
        },
        promotion_slabs::{ActiveModel as SlabActive, Column as SlabCol, Entity as PromotionSlabs},
        promotions::{
            ActiveModel as PromotionActive, Column as PromoCol, Entity as Promotions,
            Model as PromotionModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Promotion,
    pricing::{PromotionKind, PromotionWindow, Slab},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::promotion_rules::load_slabs,
    state::AppState,
};

/// Enabled promotions, newest window first.
pub async fn list_promotions(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PromotionList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Promotions::find()
        .filter(PromoCol::IsEnabled.eq(true))
        .order_by_desc(PromoCol::StartDate)
        .order_by_asc(PromoCol::Title);

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut slabs = load_slabs(&state.orm, &ids).await?;
    let mut links = load_product_ids(&state.orm, &ids).await?;

    let items = models
        .into_iter()
        .map(|model| {
            let slabs = slabs.remove(&model.id).unwrap_or_default();
            let product_ids = links.remove(&model.id).unwrap_or_default();
            promotion_from_entity(model, slabs, product_ids)
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Promotions",
        PromotionList { items },
        Some(meta),
    ))
}

pub async fn create_promotion(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_staff(user)?;
    payload.validate()?;
    let kind = PromotionKind::from_parts(payload.promotion_type, payload.discount, payload.slabs)?;
    let window = PromotionWindow::new(payload.start_date, payload.end_date)?;
    let product_ids = dedup(payload.product_ids);

    let txn = state.orm.begin().await?;
    ensure_no_overlap(&txn, &payload.title, &window, None).await?;
    ensure_products_enabled(&txn, &product_ids).await?;

    let now = Utc::now();
    let promotion = PromotionActive {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        promotion_type: Set(kind.promotion_type().into()),
        discount: Set(kind.flat_discount()),
        start_date: Set(window.start().into()),
        end_date: Set(window.end().into()),
        is_enabled: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    insert_slabs(&txn, promotion.id, kind.slabs()).await?;
    insert_links(&txn, promotion.id, &product_ids, now).await?;
    txn.commit().await?;

    tracing::info!(
        promotion_id = %promotion.id,
        promotion_type = kind.promotion_type().as_str(),
        products = product_ids.len(),
        "promotion created"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::PromotionCreate,
        serde_json::json!({ "promotion_id": promotion.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion created",
        promotion_from_entity(promotion, kind.slabs().to_vec(), product_ids),
        Some(Meta::empty()),
    ))
}

pub async fn update_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_staff(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let existing = find_promotion(&txn, id).await?;

    let title = payload.title.unwrap_or_else(|| existing.title.clone());
    let window = PromotionWindow::new(
        payload
            .start_date
            .unwrap_or_else(|| existing.start_date.with_timezone(&Utc)),
        payload
            .end_date
            .unwrap_or_else(|| existing.end_date.with_timezone(&Utc)),
    )?;
    if existing.is_enabled {
        ensure_no_overlap(&txn, &title, &window, Some(id)).await?;
    }

    if let Some(product_ids) = payload.product_ids {
        let product_ids = dedup(product_ids);
        ensure_products_enabled(&txn, &product_ids).await?;
        PromotionProducts::delete_many()
            .filter(LinkCol::PromotionId.eq(id))
            .exec(&txn)
            .await?;
        insert_links(&txn, id, &product_ids, Utc::now()).await?;
    }

    let mut active: PromotionActive = existing.into();
    active.title = Set(title);
    active.start_date = Set(window.start().into());
    active.end_date = Set(window.end().into());
    active.updated_at = Set(Utc::now().into());
    let promotion = active.update(&txn).await?;

    let promotion = with_children(&txn, promotion).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::PromotionUpdate,
        serde_json::json!({ "promotion_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion updated",
        promotion,
        Some(Meta::empty()),
    ))
}

/// Enable or disable a promotion. Enabling re-checks the title/window rule.
pub async fn set_promotion_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PromotionStatusRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    let existing = find_promotion(&txn, id).await?;

    if payload.enable && !existing.is_enabled {
        let window = PromotionWindow::new(
            existing.start_date.with_timezone(&Utc),
            existing.end_date.with_timezone(&Utc),
        )?;
        ensure_no_overlap(&txn, &existing.title, &window, Some(id)).await?;
    }

    let mut active: PromotionActive = existing.into();
    active.is_enabled = Set(payload.enable);
    active.updated_at = Set(Utc::now().into());
    let promotion = active.update(&txn).await?;
    let promotion = with_children(&txn, promotion).await?;
    txn.commit().await?;

    tracing::info!(promotion_id = %id, enabled = payload.enable, "promotion status changed");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::PromotionStatus,
        serde_json::json!({ "promotion_id": id, "enabled": payload.enable }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion status updated",
        promotion,
        Some(Meta::empty()),
    ))
}

/// Remove a promotion with its slabs and product links. Products are untouched.
pub async fn delete_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    find_promotion(&txn, id).await?;

    PromotionSlabs::delete_many()
        .filter(SlabCol::PromotionId.eq(id))
        .exec(&txn)
        .await?;
    PromotionProducts::delete_many()
        .filter(LinkCol::PromotionId.eq(id))
        .exec(&txn)
        .await?;
    Promotions::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(promotion_id = %id, "promotion deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::PromotionDelete,
        serde_json::json!({ "promotion_id": id }),
    )
    .await;

    Ok(ApiResponse::empty("Promotion deleted"))
}

async fn find_promotion<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<PromotionModel> {
    Promotions::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion"))
}

/// No two enabled promotions may share a title with overlapping windows.
async fn ensure_no_overlap<C: ConnectionTrait>(
    db: &C,
    title: &str,
    window: &PromotionWindow,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Promotions::find()
        .filter(PromoCol::Title.eq(title))
        .filter(PromoCol::IsEnabled.eq(true))
        .filter(PromoCol::StartDate.lte(window.end()))
        .filter(PromoCol::EndDate.gte(window.start()));
    if let Some(id) = exclude {
        finder = finder.filter(PromoCol::Id.ne(id));
    }

    if finder.count(db).await? > 0 {
        return Err(AppError::Conflict(
            "Promotion with this title and date range already exists.".into(),
        ));
    }
    Ok(())
}

async fn ensure_products_enabled<C: ConnectionTrait>(
    db: &C,
    product_ids: &[Uuid],
) -> AppResult<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let found = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .filter(ProdCol::IsEnabled.eq(true))
        .count(db)
        .await?;
    if found as usize != product_ids.len() {
        return Err(AppError::NotFound(
            "One or more products in the promotion are invalid or disabled.".into(),
        ));
    }
    Ok(())
}

async fn insert_slabs<C: ConnectionTrait>(
    db: &C,
    promotion_id: Uuid,
    slabs: &[Slab],
) -> AppResult<()> {
    if slabs.is_empty() {
        return Ok(());
    }
    let rows = slabs.iter().enumerate().map(|(position, slab)| SlabActive {
        id: Set(Uuid::new_v4()),
        promotion_id: Set(promotion_id),
        position: Set(position as i32),
        min_weight: Set(slab.min_weight),
        max_weight: Set(slab.max_weight),
        discount: Set(slab.discount),
    });
    PromotionSlabs::insert_many(rows).exec(db).await?;
    Ok(())
}

async fn insert_links<C: ConnectionTrait>(
    db: &C,
    promotion_id: Uuid,
    product_ids: &[Uuid],
    at: DateTime<Utc>,
) -> AppResult<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let rows = product_ids.iter().map(|product_id| LinkActive {
        id: Set(Uuid::new_v4()),
        promotion_id: Set(promotion_id),
        product_id: Set(*product_id),
        created_at: Set(at.into()),
    });
    PromotionProducts::insert_many(rows).exec(db).await?;
    Ok(())
}

async fn load_product_ids<C: ConnectionTrait>(
    db: &C,
    promotion_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
    let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    if promotion_ids.is_empty() {
        return Ok(links);
    }
    let rows = PromotionProducts::find()
        .filter(LinkCol::PromotionId.is_in(promotion_ids.iter().copied()))
        .order_by_asc(LinkCol::CreatedAt)
        .all(db)
        .await?;
    for row in rows {
        links.entry(row.promotion_id).or_default().push(row.product_id);
    }
    Ok(links)
}

async fn with_children<C: ConnectionTrait>(
    db: &C,
    model: PromotionModel,
) -> AppResult<Promotion> {
    let id = model.id;
    let slabs = load_slabs(db, &[id]).await?.remove(&id).unwrap_or_default();
    let product_ids = load_product_ids(db, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    Ok(promotion_from_entity(model, slabs, product_ids))
}

// keeps first occurrence order
fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn promotion_from_entity(
    model: PromotionModel,
    slabs: Vec<Slab>,
    product_ids: Vec<Uuid>,
) -> Promotion {
    Promotion {
        id: model.id,
        title: model.title,
        promotion_type: model.promotion_type.into(),
        discount: model.discount,
        slabs,
        product_ids,
        start_date: model.start_date.with_timezone(&Utc),
        end_date: model.end_date.with_timezone(&Utc),
        is_enabled: model.is_enabled,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(vec![b, a, b, a]), vec![b, a]);
    }
}
