mod common;

use order_admin_api::{
    dto::{
        orders::{CreateOrderRequest, OrderItemRequest},
        products::UpdateProductRequest,
    },
    entity::{AuditLogs, OrderLines, Orders},
    error::AppError,
    pricing::PromotionType,
    routes::params::{OrderListQuery, ProductQuery},
    services::{order_service, product_service},
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use common::{create_product, create_promotion, promotion_request, setup_state, slab, staff_user};

fn order_request(items: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: "Jane Doe".into(),
        customer_email: "jane@example.com".into(),
        order_items: items
            .iter()
            .map(|&(product_id, quantity)| OrderItemRequest {
                product_id,
                quantity,
            })
            .collect(),
    }
}

// Flow: promotions attached -> catalog shows discounted prices -> order priced and stored ->
// failed orders leave nothing behind -> deleting a product keeps order history.
#[tokio::test]
async fn order_pricing_and_atomic_creation_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = staff_user(&state, "staff@example.com").await?;

    let shirt = create_product(&state, &user, "Shirt", 200, 300).await?;
    let rice = create_product(&state, &user, "Rice", 50, 800).await?;
    let lamp = create_product(&state, &user, "Lamp", 80, 1200).await?;

    create_promotion(
        &state,
        &user,
        promotion_request("Shirt Sale", PromotionType::Percentage, Some(10), None, vec![shirt.id]),
    )
    .await?;
    create_promotion(
        &state,
        &user,
        promotion_request(
            "Heavy Goods",
            PromotionType::Weighted,
            None,
            Some(vec![slab(0, 500, 10), slab(500, 1000, 25)]),
            vec![rice.id],
        ),
    )
    .await?;

    // Catalog: same arithmetic as a single-unit order line.
    let catalog = product_service::list_catalog(&state, &user, ProductQuery::default())
        .await?
        .data
        .expect("catalog");
    let shirt_row = catalog
        .items
        .iter()
        .find(|row| row.product.id == shirt.id)
        .expect("shirt in catalog");
    assert_eq!(shirt_row.discounted_price, Decimal::from(180));
    let lamp_row = catalog
        .items
        .iter()
        .find(|row| row.product.id == lamp.id)
        .expect("lamp in catalog");
    assert!(lamp_row.promotion.is_none());
    assert_eq!(lamp_row.discounted_price, Decimal::from(80));

    // Shirt: 600 gross, 60 off. Rice: 100 gross, 25 per unit off.
    let created = order_service::create_order(
        &state,
        &user,
        order_request(&[(shirt.id, 3), (rice.id, 2)]),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(created.order.sub_total, Decimal::from(700));
    assert_eq!(created.order.discount, Decimal::from(110));
    assert_eq!(created.order.total, Decimal::from(590));
    assert_eq!(created.lines.len(), 2);
    assert_eq!(created.lines[0].product_name, "Shirt");
    assert_eq!(created.lines[1].sub_total, Decimal::from(50));
    let applied = created.lines[1].promotion.as_ref().expect("weighted promotion");
    assert_eq!(applied.title, "Heavy Goods");
    assert_eq!(applied.promotion_type, PromotionType::Weighted);

    // A disabled product anywhere in the order aborts the whole order.
    product_service::update_product(
        &state,
        &user,
        lamp.id,
        UpdateProductRequest {
            is_enabled: Some(false),
            ..Default::default()
        },
    )
    .await?;
    let err = order_service::create_order(
        &state,
        &user,
        order_request(&[(shirt.id, 1), (lamp.id, 1)]),
    )
    .await
    .expect_err("disabled product must fail the order");
    assert!(matches!(err, AppError::NotFound(_)));

    // Totals that would overflow the order columns are a validation error, not a 500.
    let piano = create_product(&state, &user, "Piano", 5000, 250_000).await?;
    let err = order_service::create_order(
        &state,
        &user,
        order_request(&[(piano.id, 1_000_000_000)]),
    )
    .await
    .expect_err("oversized order must fail");
    assert!(matches!(err, AppError::Validation(_)));

    let err = order_service::create_order(&state, &user, order_request(&[]))
        .await
        .expect_err("empty order must fail");
    assert!(matches!(err, AppError::EmptyInput(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    assert_eq!(OrderLines::find().count(&state.orm).await?, 2);

    // Deleting a product detaches its lines but keeps their snapshot.
    product_service::delete_product(&state, &user, rice.id).await?;
    let details = order_service::get_order_details(&state, &user, created.order.id)
        .await?
        .data
        .expect("order details");
    assert_eq!(details.lines[1].product_id, None);
    assert_eq!(details.lines[1].product_name, "Rice");
    assert_eq!(details.order.total, Decimal::from(590));

    let listed = order_service::list_orders(
        &state,
        &user,
        OrderListQuery {
            q: Some("jane".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(listed.meta.and_then(|m| m.total), Some(1));

    assert!(AuditLogs::find().count(&state.orm).await? > 0);

    Ok(())
}
