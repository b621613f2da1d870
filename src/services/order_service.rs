use std::collections::HashMap;

use chrono::Utc;
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
    dto::orders::{CreateOrderRequest, OrderList, OrderWithLines},
    entity::{
        order_lines::{
            ActiveModel as LineActive, Column as LineCol, Entity as OrderLines,
            Model as OrderLineModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Order, OrderLine, PromotionSnapshot},
    pricing::{CatalogSnapshot, OrderItem, PricedOrder, PricingError, price_order},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{product_service::snapshot_from_entity, promotion_rules::load_active_rules},
    state::AppState,
};

/// Price the requested items and store the order with all of its lines.
///
/// Product and promotion state is read once up front; the order and its
/// lines are then written in a single transaction, so a failure leaves
/// nothing behind.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithLines>> {
    ensure_staff(user)?;
    if payload.order_items.is_empty() {
        return Err(PricingError::EmptyOrder.into());
    }
    payload.validate()?;

    let items: Vec<OrderItem> = payload
        .order_items
        .iter()
        .map(|item| OrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    let at = Utc::now();
    let snapshot = read_snapshot(&state.orm, &items, at).await?;
    let priced = price_order(&items, &snapshot, at)?;

    let txn = state.orm.begin().await?;
    let (order, lines) = insert_order(&txn, user, &payload, &priced).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        lines = lines.len(),
        sub_total = %order.sub_total,
        discount = %order.discount,
        total = %order.total,
        "order created"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created successfully!",
        OrderWithLines {
            order: order_from_entity(order),
            lines: lines.into_iter().map(line_from_entity).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(OrderCol::CustomerName).ilike(pattern.clone()))
                .add(Expr::col(OrderCol::CustomerEmail).ilike(pattern)),
        );
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut lines = load_lines(&state.orm, &ids).await?;

    let items = orders
        .into_iter()
        .map(|order| OrderWithLines {
            lines: lines.remove(&order.id).unwrap_or_default(),
            order: order_from_entity(order),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders fetched successfully!",
        OrderList { items },
        Some(meta),
    ))
}

pub async fn get_order_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithLines>> {
    ensure_staff(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let lines = load_lines(&state.orm, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();

    Ok(ApiResponse::success(
        "Order details fetched successfully!",
        OrderWithLines {
            order: order_from_entity(order),
            lines,
        },
        Some(Meta::empty()),
    ))
}

async fn read_snapshot<C: ConnectionTrait>(
    db: &C,
    items: &[OrderItem],
    at: chrono::DateTime<Utc>,
) -> AppResult<CatalogSnapshot> {
    let ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    let mut rules = load_active_rules(db, &ids, at).await?;

    let mut snapshot = CatalogSnapshot::new();
    for product in &products {
        let promotions = rules.remove(&product.id).unwrap_or_default();
        snapshot.insert(snapshot_from_entity(product), promotions);
    }
    Ok(snapshot)
}

async fn insert_order<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    payload: &CreateOrderRequest,
    priced: &PricedOrder,
) -> AppResult<(OrderModel, Vec<OrderLineModel>)> {
    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(payload.customer_name.clone()),
        customer_email: Set(payload.customer_email.clone()),
        sub_total: Set(priced.sub_total),
        discount: Set(priced.discount),
        total: Set(priced.total),
        created_by: Set(Some(user.user_id)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    let mut lines = Vec::with_capacity(priced.lines.len());
    for (line_no, line) in priced.lines.iter().enumerate() {
        let promotion = line.promotion.as_ref();
        let model = LineActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            line_no: Set(line_no as i32),
            product_id: Set(Some(line.product.id)),
            product_name: Set(line.product.name.clone()),
            unit_price: Set(line.product.price),
            weight: Set(line.product.weight),
            quantity: Set(line.quantity),
            discount: Set(line.discount),
            sub_total: Set(line.sub_total),
            promotion_id: Set(promotion.map(|p| p.id)),
            promotion_title: Set(promotion.map(|p| p.title.clone())),
            promotion_type: Set(promotion.map(|p| p.promotion_type.into())),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        lines.push(model);
    }

    Ok((order, lines))
}

async fn load_lines<C: ConnectionTrait>(
    db: &C,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderLine>>> {
    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(lines);
    }
    let rows = OrderLines::find()
        .filter(LineCol::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(LineCol::OrderId)
        .order_by_asc(LineCol::LineNo)
        .all(db)
        .await?;
    for row in rows {
        lines
            .entry(row.order_id)
            .or_default()
            .push(line_from_entity(row));
    }
    Ok(lines)
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        sub_total: model.sub_total,
        discount: model.discount,
        total: model.total,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn line_from_entity(model: OrderLineModel) -> OrderLine {
    let promotion = match (model.promotion_id, model.promotion_title, model.promotion_type) {
        (Some(id), Some(title), Some(promotion_type)) => Some(PromotionSnapshot {
            id,
            title,
            promotion_type: promotion_type.into(),
        }),
        _ => None,
    };
    OrderLine {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        unit_price: model.unit_price,
        weight: model.weight,
        quantity: model.quantity,
        discount: model.discount,
        sub_total: model.sub_total,
        promotion,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
