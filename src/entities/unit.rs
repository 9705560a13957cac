use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Measurement family an item or unit is counted in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BaseUnit {
    #[sea_orm(string_value = "kg")]
    Kg,
    #[sea_orm(string_value = "liter")]
    Liter,
    #[sea_orm(string_value = "pieces")]
    Pieces,
}

pub const BASE_UNIT_ERROR: &str = "baseUnit must be one of: kg, liter, pieces";

impl BaseUnit {
    pub fn parse(raw: &str) -> Result<Self, String> {
        raw.trim().parse().map_err(|_| BASE_UNIT_ERROR.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "units")]
#[serde(rename_all = "camelCase")]
#[schema(as = Unit)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub symbol: Option<String>,
    pub base_unit: BaseUnit,
    pub unit_type: String,
    pub conversion_factor: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_unit_parses_known_names_only() {
        assert_eq!(BaseUnit::parse("kg").unwrap(), BaseUnit::Kg);
        assert_eq!(BaseUnit::parse(" Pieces ").unwrap(), BaseUnit::Pieces);
        assert_eq!(BaseUnit::parse("gallon").unwrap_err(), BASE_UNIT_ERROR);
        assert_eq!(BaseUnit::Liter.to_string(), "liter");
    }
}
