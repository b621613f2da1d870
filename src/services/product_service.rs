use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{self, AuditAction},
    dto::products::{CatalogList, CatalogProduct, CreateProductRequest, UpdateProductRequest},
    entity::{
        order_lines::{Column as LineCol, Entity as OrderLines},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
        promotion_products::{Column as LinkCol, Entity as PromotionProducts},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Product, PromotionSnapshot},
    pricing::{MONEY_COLUMN, Precision, ProductSnapshot, WEIGHT_COLUMN, catalog_entry},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::promotion_rules::load_active_rules,
    state::AppState,
};

/// Enabled products with their resolved promotion and display price.
pub async fn list_catalog(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<CatalogList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsEnabled.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let at = Utc::now();
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let rules = load_active_rules(&state.orm, &ids, at).await?;

    let items = products
        .into_iter()
        .map(|model| {
            let snapshot = snapshot_from_entity(&model);
            let promotions = rules.get(&model.id).map(Vec::as_slice).unwrap_or(&[]);
            let entry = catalog_entry(&snapshot, promotions, at);
            CatalogProduct {
                product: product_from_entity(model),
                promotion: entry.promotion.map(|p| PromotionSnapshot {
                    id: p.id,
                    title: p.title,
                    promotion_type: p.promotion_type,
                }),
                unit_discount: entry.unit_discount,
                discounted_price: entry.discounted_price,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", CatalogList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    let product = find_product(&state.orm, id).await?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    payload.validate()?;
    ensure_amount("price", payload.price, MONEY_COLUMN)?;
    ensure_amount("weight", payload.weight, WEIGHT_COLUMN)?;
    ensure_name_available(&state.orm, &payload.name).await?;

    let now = Utc::now();
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description.and_then(description_update)),
        price: Set(payload.price),
        weight: Set(payload.weight),
        is_enabled: Set(payload.is_enabled.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    payload.validate()?;
    let existing = find_product(&state.orm, id).await?;

    if let Some(name) = payload.name.as_ref().filter(|n| **n != existing.name) {
        ensure_name_available(&state.orm, name).await?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description_update(description));
    }
    if let Some(price) = payload.price {
        ensure_amount("price", price, MONEY_COLUMN)?;
        active.price = Set(price);
    }
    if let Some(weight) = payload.weight {
        ensure_amount("weight", weight, WEIGHT_COLUMN)?;
        active.weight = Set(weight);
    }
    if let Some(is_enabled) = payload.is_enabled {
        active.is_enabled = Set(is_enabled);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Delete a product after detaching its order history and promotion links.
///
/// Historical order lines keep their copied name and price; only their
/// product reference is cleared.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    find_product(&txn, id).await?;

    let detached = OrderLines::update_many()
        .col_expr(LineCol::ProductId, Expr::value(Option::<Uuid>::None))
        .filter(LineCol::ProductId.eq(id))
        .exec(&txn)
        .await?;

    PromotionProducts::delete_many()
        .filter(LinkCol::ProductId.eq(id))
        .exec(&txn)
        .await?;

    Products::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(product_id = %id, detached_lines = detached.rows_affected, "product deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::empty("Deleted"))
}

async fn find_product<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
}

async fn ensure_name_available<C: ConnectionTrait>(db: &C, name: &str) -> AppResult<()> {
    let taken = Products::find()
        .filter(Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict("Product name already exists".into()));
    }
    Ok(())
}

fn ensure_amount(field: &str, value: Decimal, column: Precision) -> AppResult<()> {
    if value.is_sign_negative() {
        return Err(AppError::Validation(format!("{field} must not be negative")));
    }
    if !column.holds(value) {
        return Err(AppError::Validation(format!(
            "{field} allows at most {} decimal places and {} integer digits",
            column.scale,
            column.digits - column.scale
        )));
    }
    Ok(())
}

// a blank description clears it
fn description_update(description: String) -> Option<String> {
    let trimmed = description.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        weight: model.weight,
        is_enabled: model.is_enabled,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn snapshot_from_entity(model: &ProductModel) -> ProductSnapshot {
    ProductSnapshot {
        id: model.id,
        name: model.name.clone(),
        price: model.price,
        weight: model.weight,
        is_enabled: model.is_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_fit_their_column() {
        assert!(ensure_amount("price", Decimal::new(1999, 2), MONEY_COLUMN).is_ok());
        assert!(ensure_amount("weight", Decimal::new(1250, 3), WEIGHT_COLUMN).is_ok());

        let err = ensure_amount("price", Decimal::NEGATIVE_ONE, MONEY_COLUMN).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: price must not be negative");

        let err = ensure_amount("price", Decimal::new(10005, 3), MONEY_COLUMN).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: price allows at most 2 decimal places and 10 integer digits"
        );

        let too_heavy = Decimal::from(1_000_000_000_i64);
        assert!(ensure_amount("weight", too_heavy, WEIGHT_COLUMN).is_err());
    }

    #[test]
    fn blank_description_clears_it() {
        assert_eq!(description_update("  ".into()), None);
        assert_eq!(
            description_update(" Long grain ".into()),
            Some("Long grain".to_string())
        );
    }
}
