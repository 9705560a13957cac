use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::packaging::{PackagingNode, PackagingType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "packagings")]
#[serde(rename_all = "camelCase")]
#[schema(as = Packaging)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub item_id: Uuid,
    pub packaging_type: PackagingType,
    pub amount: Decimal,
    pub unit: String,
    pub pack_size: Option<Decimal>,
    pub pack_unit: Option<String>,
    pub parent_packaging_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn to_node(&self) -> PackagingNode {
        PackagingNode {
            id: self.id,
            item_id: self.item_id,
            packaging_type: self.packaging_type,
            amount: Some(self.amount),
            unit: self.unit.clone(),
            pack_size: self.pack_size,
            pack_unit: self.pack_unit.clone(),
            parent_id: self.parent_packaging_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
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
