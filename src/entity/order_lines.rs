use sea_orm::entity::prelude::*;

use super::promotions::PromotionTypeColumn;

/// A priced line. Product and promotion fields are copied at pricing time;
/// `product_id` is cleared when the product is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub line_no: i32,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub weight: Decimal,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub discount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub sub_total: Decimal,
    pub promotion_id: Option<Uuid>,
    pub promotion_title: Option<String>,
    pub promotion_type: Option<PromotionTypeColumn>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_delete = "Cascade"
    )]
    Orders,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
