use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "promotion_slabs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub position: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub min_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub max_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub discount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promotions::Entity",
        from = "Column::PromotionId",
        to = "super::promotions::Column::Id"
    )]
    Promotions,
}

impl Related<super::promotions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
