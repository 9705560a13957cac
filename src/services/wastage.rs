use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    clean, ensure_exists, ensure_optional, ensure_positive, fetch_page, find_or_404, required_id,
    Page, PageRequest,
};
use crate::entities::{branch, item, section, wastage};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WastageInput {
    #[serde(alias = "item")]
    pub item_id: Option<Uuid>,
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    #[serde(alias = "section")]
    pub section_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub reason: Option<String>,
    pub wasted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct WastageFilter {
    pub item: Option<Uuid>,
    pub branch: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn cost_of(item: &item::Model, quantity: Decimal) -> ServiceResult<Decimal> {
    item.unit_price
        .checked_mul(quantity)
        .ok_or_else(|| ServiceError::ValidationError("quantity is too large".into()))
}

/// Wastage records, costed at the item's unit price when recorded.
#[derive(Clone)]
pub struct WastageService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl WastageService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    pub async fn list(
        &self,
        filter: WastageFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<wastage::Model>> {
        let mut query = wastage::Entity::find().order_by_desc(wastage::Column::WastedAt);
        if let Some(item_id) = filter.item {
            query = query.filter(wastage::Column::ItemId.eq(item_id));
        }
        if let Some(branch_id) = filter.branch {
            query = query.filter(wastage::Column::BranchId.eq(branch_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(wastage::Column::WastedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(wastage::Column::WastedAt.lte(to));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<wastage::Model> {
        find_or_404::<wastage::Entity, _>(&*self.db, id, "Wastage").await
    }

    async fn check_location(&self, input: &WastageInput) -> ServiceResult<()> {
        ensure_optional::<branch::Entity, _>(&*self.db, input.branch_id, "branchId", "branch")
            .await?;
        ensure_optional::<section::Entity, _>(&*self.db, input.section_id, "sectionId", "section")
            .await
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: WastageInput,
        recorded_by: Option<Uuid>,
    ) -> ServiceResult<wastage::Model> {
        let item_id = required_id(input.item_id, "itemId")?;
        let quantity = input
            .quantity
            .ok_or_else(|| ServiceError::ValidationError("quantity is required".into()))?;
        ensure_positive(quantity, "quantity")?;
        let item = ensure_exists::<item::Entity, _>(&*self.db, item_id, "itemId", "item").await?;
        self.check_location(&input).await?;

        let now = Utc::now();
        let created = wastage::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item_id),
            branch_id: Set(input.branch_id.or(item.branch_id)),
            section_id: Set(input.section_id),
            quantity: Set(quantity),
            unit: Set(clean(input.unit)),
            reason: Set(clean(input.reason)),
            cost: Set(cost_of(&item, quantity)?),
            recorded_by: Set(recorded_by),
            wasted_at: Set(input.wasted_at.unwrap_or(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(wastage_id = %created.id, %item_id, cost = %created.cost, "wastage recorded");
        self.events
            .emit(Event::WastageRecorded {
                wastage_id: created.id,
                item_id,
            })
            .await;
        Ok(created)
    }

    /// Re-costs the record when the item or quantity changes.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: WastageInput) -> ServiceResult<wastage::Model> {
        let existing = self.get(id).await?;
        if let Some(quantity) = input.quantity {
            ensure_positive(quantity, "quantity")?;
        }
        self.check_location(&input).await?;

        let recost = input.item_id.is_some() || input.quantity.is_some();
        let item_id = input.item_id.unwrap_or(existing.item_id);
        let quantity = input.quantity.unwrap_or(existing.quantity);
        let cost = if recost {
            let item = ensure_exists::<item::Entity, _>(&*self.db, item_id, "itemId", "item").await?;
            Some(cost_of(&item, quantity)?)
        } else {
            None
        };

        let mut active: wastage::ActiveModel = existing.into();
        active.item_id = Set(item_id);
        active.quantity = Set(quantity);
        if let Some(cost) = cost {
            active.cost = Set(cost);
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        if let Some(section_id) = input.section_id {
            active.section_id = Set(Some(section_id));
        }
        if let Some(unit) = clean(input.unit) {
            active.unit = Set(Some(unit));
        }
        if let Some(reason) = clean(input.reason) {
            active.reason = Set(Some(reason));
        }
        if let Some(wasted_at) = input.wasted_at {
            active.wasted_at = Set(wasted_at);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?.delete(&*self.db).await?;
        info!(wastage_id = %id, "wastage deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use crate::services::testing::seed_item;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn cost_follows_unit_price_and_quantity() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(3.5)).await;
        let (tx, mut rx) = mpsc::channel(8);
        let service = WastageService::new(db, EventSender::new(tx));
        let user = Uuid::new_v4();

        let record = service
            .create(
                WastageInput {
                    item_id: Some(item.id),
                    quantity: Some(dec!(2)),
                    reason: Some(" spoiled ".into()),
                    ..Default::default()
                },
                Some(user),
            )
            .await
            .unwrap();
        assert_eq!(record.cost, dec!(7));
        assert_eq!(record.recorded_by, Some(user));
        assert_eq!(record.reason.as_deref(), Some("spoiled"));
        assert!(matches!(rx.recv().await, Some(Event::WastageRecorded { .. })));

        let updated = service
            .update(
                record.id,
                WastageInput {
                    quantity: Some(dec!(4)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.cost, dec!(14));
    }

    #[tokio::test]
    async fn date_range_filter() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let (tx, _rx) = mpsc::channel(8);
        let service = WastageService::new(db, EventSender::new(tx));
        let now = Utc::now();

        for days_ago in [1, 10] {
            service
                .create(
                    WastageInput {
                        item_id: Some(item.id),
                        quantity: Some(dec!(1)),
                        wasted_at: Some(now - Duration::days(days_ago)),
                        ..Default::default()
                    },
                    None,
                )
                .await
                .unwrap();
        }

        let recent = service
            .list(
                WastageFilter {
                    from: Some(now - Duration::days(5)),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(recent.total, 1);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let (tx, _rx) = mpsc::channel(8);
        let service = WastageService::new(db, EventSender::new(tx));
        let err = service
            .create(
                WastageInput {
                    item_id: Some(item.id),
                    quantity: Some(Decimal::ZERO),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quantity must be greater than 0");
    }
}
