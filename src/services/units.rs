use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clean, ensure_positive, fetch_page, find_or_404, required, Page, PageRequest};
use crate::entities::{item, unit, BaseUnit};
use crate::errors::{ServiceError, ServiceResult};

pub const DEFAULT_UNIT_TYPE: &str = "Standard Unit";

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitInput {
    pub name: Option<String>,
    pub symbol: Option<String>,
    /// One of `kg`, `liter`, `pieces`
    pub base_unit: Option<String>,
    pub unit_type: Option<String>,
    pub conversion_factor: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UnitFilter {
    pub base_unit: Option<BaseUnit>,
    pub active: Option<bool>,
}

fn parse_base_unit(raw: Option<String>) -> ServiceResult<Option<BaseUnit>> {
    clean(raw)
        .map(|value| BaseUnit::parse(&value).map_err(ServiceError::ValidationError))
        .transpose()
}

#[derive(Clone)]
pub struct UnitService {
    db: Arc<DatabaseConnection>,
}

impl UnitService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: UnitFilter, page: PageRequest) -> ServiceResult<Page<unit::Model>> {
        let mut query = unit::Entity::find().order_by_asc(unit::Column::Name);
        if let Some(base_unit) = filter.base_unit {
            query = query.filter(unit::Column::BaseUnit.eq(base_unit));
        }
        if let Some(active) = filter.active {
            query = query.filter(unit::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<unit::Model> {
        find_or_404::<unit::Entity, _>(&*self.db, id, "Unit").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: UnitInput) -> ServiceResult<unit::Model> {
        let name = required(input.name, "name")?;
        let base_unit = parse_base_unit(input.base_unit)?
            .ok_or_else(|| ServiceError::ValidationError("baseUnit is required".into()))?;
        let conversion_factor = input.conversion_factor.unwrap_or(Decimal::ONE);
        ensure_positive(conversion_factor, "conversionFactor")?;

        let now = Utc::now();
        let created = unit::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            symbol: Set(clean(input.symbol)),
            base_unit: Set(base_unit),
            unit_type: Set(clean(input.unit_type).unwrap_or_else(|| DEFAULT_UNIT_TYPE.to_string())),
            conversion_factor: Set(conversion_factor),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(unit_id = %created.id, base_unit = %created.base_unit, "unit created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: UnitInput) -> ServiceResult<unit::Model> {
        let base_unit = parse_base_unit(input.base_unit)?;
        let mut active: unit::ActiveModel = self.get(id).await?.into();
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(symbol) = clean(input.symbol) {
            active.symbol = Set(Some(symbol));
        }
        if let Some(base_unit) = base_unit {
            active.base_unit = Set(base_unit);
        }
        if let Some(unit_type) = clean(input.unit_type) {
            active.unit_type = Set(unit_type);
        }
        if let Some(factor) = input.conversion_factor {
            ensure_positive(factor, "conversionFactor")?;
            active.conversion_factor = Set(factor);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Refused while any item still measures in this unit.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let existing = self.get(id).await?;
        let in_use = item::Entity::find()
            .filter(item::Column::UnitId.eq(id))
            .count(&*self.db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Unit is used by {} item(s)",
                in_use
            )));
        }
        existing.delete(&*self.db).await?;
        info!(unit_id = %id, "unit deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use assert_matches::assert_matches;
    use crate::entities::BASE_UNIT_ERROR;

    #[tokio::test]
    async fn create_applies_defaults_and_validates_base_unit() {
        let (db, _dir) = migrated_sqlite().await;
        let service = UnitService::new(db);

        let kg = service
            .create(UnitInput {
                name: Some("Kilogram".into()),
                symbol: Some("kg".into()),
                base_unit: Some("kg".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(kg.unit_type, DEFAULT_UNIT_TYPE);
        assert_eq!(kg.conversion_factor, Decimal::ONE);
        assert!(kg.is_active);

        let err = service
            .create(UnitInput {
                name: Some("Bad".into()),
                base_unit: Some("invalid".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(ref msg) if msg == BASE_UNIT_ERROR);
    }

    #[tokio::test]
    async fn update_merges_non_empty_fields() {
        let (db, _dir) = migrated_sqlite().await;
        let service = UnitService::new(db);
        let liter = service
            .create(UnitInput {
                name: Some("Liter".into()),
                symbol: Some("l".into()),
                base_unit: Some("liter".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = service
            .update(
                liter.id,
                UnitInput {
                    name: Some("  ".into()),
                    symbol: Some("L".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Liter");
        assert_eq!(updated.symbol.as_deref(), Some("L"));
        assert_eq!(updated.base_unit, BaseUnit::Liter);
    }
}
