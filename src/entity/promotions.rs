use sea_orm::entity::prelude::*;

use crate::pricing::PromotionType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PromotionTypeColumn {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
    #[sea_orm(string_value = "weighted")]
    Weighted,
}

impl From<PromotionType> for PromotionTypeColumn {
    fn from(value: PromotionType) -> Self {
        match value {
            PromotionType::Percentage => Self::Percentage,
            PromotionType::Fixed => Self::Fixed,
            PromotionType::Weighted => Self::Weighted,
        }
    }
}

impl From<PromotionTypeColumn> for PromotionType {
    fn from(value: PromotionTypeColumn) -> Self {
        match value {
            PromotionTypeColumn::Percentage => Self::Percentage,
            PromotionTypeColumn::Fixed => Self::Fixed,
            PromotionTypeColumn::Weighted => Self::Weighted,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub promotion_type: PromotionTypeColumn,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub discount: Option<Decimal>,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub is_enabled: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promotion_slabs::Entity")]
    PromotionSlabs,
    #[sea_orm(has_many = "super::promotion_products::Entity")]
    PromotionProducts,
}

impl Related<super::promotion_slabs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromotionSlabs.def()
    }
}

impl Related<super::promotion_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromotionProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
