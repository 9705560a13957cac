use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::unit::BaseUnit;
use crate::packaging::EmbeddedPackaging;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "items")]
#[serde(rename_all = "camelCase")]
#[schema(as = Item)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub item_code: String,
    pub name_en: String,
    pub name_local: Option<String>,
    pub description: Option<String>,
    pub base_unit: BaseUnit,
    pub unit_id: Uuid,
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub tax_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub unit_price: Decimal,
    #[serde(rename = "priceIncludesVAT")]
    pub price_includes_vat: bool,
    #[sea_orm(column_type = "Json", nullable)]
    pub base_packaging: Option<EmbeddedPackaging>,
    #[sea_orm(column_type = "Json", nullable)]
    pub pack_packaging: Option<EmbeddedPackaging>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::packaging::Entity")]
    Packaging,
    #[sea_orm(has_many = "super::supplier_item::Entity")]
    SupplierItem,
}

impl Related<super::packaging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packaging.def()
    }
}

impl Related<super::supplier_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        self.updated_at = Set(Utc::now());
        Ok(self)
    }
}
