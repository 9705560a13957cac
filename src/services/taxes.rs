use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clean, fetch_page, find_or_404, required, Page, PageRequest};
use crate::entities::tax;
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxInput {
    pub name: Option<String>,
    /// Percentage, 0 to 100
    pub rate: Option<Decimal>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_rate(rate: Decimal) -> ServiceResult<Decimal> {
    if rate < Decimal::ZERO || rate > dec!(100) {
        return Err(ServiceError::ValidationError(
            "rate must be between 0 and 100".into(),
        ));
    }
    Ok(rate)
}

#[derive(Clone)]
pub struct TaxService {
    db: Arc<DatabaseConnection>,
}

impl TaxService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, active: Option<bool>, page: PageRequest) -> ServiceResult<Page<tax::Model>> {
        let mut query = tax::Entity::find().order_by_asc(tax::Column::Name);
        if let Some(active) = active {
            query = query.filter(tax::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<tax::Model> {
        find_or_404::<tax::Entity, _>(&*self.db, id, "Tax").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: TaxInput) -> ServiceResult<tax::Model> {
        let name = required(input.name, "name")?;
        let rate = input
            .rate
            .ok_or_else(|| ServiceError::ValidationError("rate is required".into()))?;
        let now = Utc::now();
        let created = tax::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            rate: Set(validate_rate(rate)?),
            description: Set(clean(input.description)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(tax_id = %created.id, rate = %created.rate, "tax created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: TaxInput) -> ServiceResult<tax::Model> {
        let mut active: tax::ActiveModel = self.get(id).await?.into();
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(rate) = input.rate {
            active.rate = Set(validate_rate(rate)?);
        }
        if let Some(description) = clean(input.description) {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?.delete(&*self.db).await?;
        info!(tax_id = %id, "tax deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_bounds() {
        assert!(validate_rate(dec!(0)).is_ok());
        assert!(validate_rate(dec!(100)).is_ok());
        assert!(validate_rate(dec!(15.5)).is_ok());
        assert!(validate_rate(dec!(-1)).is_err());
        assert!(validate_rate(dec!(100.01)).is_err());
    }
}
