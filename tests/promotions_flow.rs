mod common;

use order_admin_api::{
    dto::promotions::{PromotionStatusRequest, UpdatePromotionRequest},
    entity::{Products, PromotionProducts, PromotionSlabs, Promotions},
    error::AppError,
    pricing::{PromotionType, Slab},
    routes::params::Pagination,
    services::promotion_service,
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};

use common::{create_product, create_promotion, promotion_request, setup_state, slab, staff_user};

// Flow: shape validation -> overlap rules on create, update and enable -> cascade on delete.
#[tokio::test]
async fn promotion_lifecycle_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = staff_user(&state, "promo@example.com").await?;
    let flour = create_product(&state, &user, "Flour", 40, 1000).await?;

    let err = promotion_service::create_promotion(
        &state,
        &user,
        promotion_request("No Slabs", PromotionType::Weighted, None, None, vec![flour.id]),
    )
    .await
    .expect_err("weighted promotion needs slabs");
    assert!(matches!(err, AppError::Validation(_)));

    let err = promotion_service::create_promotion(
        &state,
        &user,
        promotion_request(
            "Stray Slabs",
            PromotionType::Percentage,
            Some(5),
            Some(vec![slab(0, 100, 1)]),
            vec![flour.id],
        ),
    )
    .await
    .expect_err("percentage promotion takes no slabs");
    assert!(matches!(err, AppError::Validation(_)));

    // Weights finer than the column scale would be rounded into an empty band.
    let err = promotion_service::create_promotion(
        &state,
        &user,
        promotion_request(
            "Too Fine",
            PromotionType::Weighted,
            None,
            Some(vec![Slab {
                min_weight: Decimal::new(1, 4),
                max_weight: Decimal::new(4, 4),
                discount: Decimal::ONE,
            }]),
            vec![flour.id],
        ),
    )
    .await
    .expect_err("slab weights must fit the column scale");
    assert!(matches!(err, AppError::Validation(_)));

    let bulk = create_promotion(
        &state,
        &user,
        promotion_request(
            "Bulk",
            PromotionType::Weighted,
            None,
            Some(vec![slab(0, 500, 2), slab(500, 2000, 6)]),
            vec![flour.id],
        ),
    )
    .await?;
    assert_eq!(bulk.slabs.len(), 2);
    assert_eq!(bulk.product_ids, vec![flour.id]);

    // Same title with an overlapping window is rejected.
    let err = promotion_service::create_promotion(
        &state,
        &user,
        promotion_request("Bulk", PromotionType::Fixed, Some(3), None, vec![]),
    )
    .await
    .expect_err("overlapping title");
    assert!(matches!(err, AppError::Conflict(_)));

    // Disabled promotions don't block, but re-enabling one that overlaps does.
    promotion_service::set_promotion_status(
        &state,
        &user,
        bulk.id,
        PromotionStatusRequest { enable: false },
    )
    .await?;
    let fixed = create_promotion(
        &state,
        &user,
        promotion_request("Bulk", PromotionType::Fixed, Some(3), None, vec![]),
    )
    .await?;
    let err = promotion_service::set_promotion_status(
        &state,
        &user,
        bulk.id,
        PromotionStatusRequest { enable: true },
    )
    .await
    .expect_err("enabling would overlap");
    assert!(matches!(err, AppError::Conflict(_)));

    let listed = promotion_service::list_promotions(&state, &user, Pagination::default())
        .await?
        .data
        .expect("promotions");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, fixed.id);

    let renamed = promotion_service::update_promotion(
        &state,
        &user,
        fixed.id,
        UpdatePromotionRequest {
            title: Some("Flat Three".into()),
            product_ids: Some(vec![flour.id]),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("updated promotion");
    assert_eq!(renamed.title, "Flat Three");
    assert_eq!(renamed.product_ids, vec![flour.id]);

    promotion_service::delete_promotion(&state, &user, bulk.id).await?;
    assert_eq!(PromotionSlabs::find().count(&state.orm).await?, 0);
    assert_eq!(PromotionProducts::find().count(&state.orm).await?, 1);
    assert_eq!(Promotions::find().count(&state.orm).await?, 1);
    assert_eq!(Products::find().count(&state.orm).await?, 1);

    let err = promotion_service::delete_promotion(&state, &user, bulk.id)
        .await
        .expect_err("already deleted");
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}
