use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::packaging::active_for_item;
use super::{ensure_exists, fetch_page, find_or_404, required, required_id, Page, PageRequest};
use crate::entities::{item, packaging, supplier, supplier_item};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::packaging::SupplierSlot;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierItemInput {
    #[serde(alias = "supplier")]
    pub supplier_id: Option<Uuid>,
    #[serde(alias = "item")]
    pub item_id: Option<Uuid>,
    /// Slot key: `base`, `pack` or `additional_<index>`
    pub packaging_type: Option<String>,
    #[serde(alias = "packaging")]
    pub packaging_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierItemFilter {
    pub item: Option<Uuid>,
    pub supplier: Option<Uuid>,
    pub active: Option<bool>,
}

/// Slot key to supplier ids, e.g. `{"base": [..], "additional_0": [..]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSelections {
    pub selections: BTreeMap<String, Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionsReplaced {
    pub item_id: Uuid,
    pub deactivated_count: u64,
    pub inserted_count: usize,
    pub selections: BTreeMap<String, Vec<Uuid>>,
}

/// A slot resolved against the item's packaging.
struct ResolvedSlot {
    key: String,
    packaging_id: Option<Uuid>,
}

fn resolve_slot(slot: SupplierSlot, additional: &[packaging::Model]) -> ServiceResult<ResolvedSlot> {
    let packaging_id = match slot {
        SupplierSlot::Base | SupplierSlot::Pack => None,
        SupplierSlot::Additional(index) => Some(
            additional
                .get(index)
                .map(|p| p.id)
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "{slot} references a missing packaging"
                    ))
                })?,
        ),
    };
    Ok(ResolvedSlot {
        key: slot.key(),
        packaging_id,
    })
}

fn parse_slot(raw: &str) -> ServiceResult<SupplierSlot> {
    SupplierSlot::from_str(raw).map_err(ServiceError::ValidationError)
}

/// Supplier associations per item and packaging slot.
#[derive(Clone)]
pub struct SupplierItemService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl SupplierItemService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    pub async fn list(
        &self,
        filter: SupplierItemFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<supplier_item::Model>> {
        let mut query = supplier_item::Entity::find().order_by_asc(supplier_item::Column::CreatedAt);
        if let Some(item_id) = filter.item {
            query = query.filter(supplier_item::Column::ItemId.eq(item_id));
        }
        if let Some(supplier_id) = filter.supplier {
            query = query.filter(supplier_item::Column::SupplierId.eq(supplier_id));
        }
        if let Some(active) = filter.active {
            query = query.filter(supplier_item::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<supplier_item::Model> {
        find_or_404::<supplier_item::Entity, _>(&*self.db, id, "SupplierItem").await
    }

    /// An explicit packaging must belong to the item; an `additional_<index>`
    /// slot without one is resolved by position.
    async fn resolve_packaging(
        &self,
        item_id: Uuid,
        slot: SupplierSlot,
        packaging_id: Option<Uuid>,
    ) -> ServiceResult<Option<Uuid>> {
        if let Some(packaging_id) = packaging_id {
            let row = ensure_exists::<packaging::Entity, _>(
                &*self.db,
                packaging_id,
                "packagingId",
                "packaging",
            )
            .await?;
            if row.item_id != item_id {
                return Err(ServiceError::ValidationError(
                    "packagingId belongs to a different item".into(),
                ));
            }
            return Ok(Some(packaging_id));
        }
        let additional = active_for_item(&*self.db, item_id).await?;
        Ok(resolve_slot(slot, &additional)?.packaging_id)
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: SupplierItemInput) -> ServiceResult<supplier_item::Model> {
        let supplier_id = required_id(input.supplier_id, "supplierId")?;
        let item_id = required_id(input.item_id, "itemId")?;
        let slot = parse_slot(&required(input.packaging_type, "packagingType")?)?;
        ensure_exists::<supplier::Entity, _>(&*self.db, supplier_id, "supplierId", "supplier")
            .await?;
        ensure_exists::<item::Entity, _>(&*self.db, item_id, "itemId", "item").await?;
        let packaging_id = self
            .resolve_packaging(item_id, slot, input.packaging_id)
            .await?;

        let now = Utc::now();
        let created = supplier_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            supplier_id: Set(supplier_id),
            item_id: Set(item_id),
            packaging_type: Set(slot.key()),
            packaging_id: Set(packaging_id),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(supplier_item_id = %created.id, %supplier_id, %item_id, "supplier item created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: SupplierItemInput,
    ) -> ServiceResult<supplier_item::Model> {
        let existing = self.get(id).await?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_exists::<supplier::Entity, _>(&*self.db, supplier_id, "supplierId", "supplier")
                .await?;
        }
        if input.item_id.is_some_and(|item_id| item_id != existing.item_id) {
            return Err(ServiceError::ValidationError("itemId cannot be changed".into()));
        }
        let slot = super::clean(input.packaging_type)
            .map(|raw| parse_slot(&raw))
            .transpose()?;

        let item_id = existing.item_id;
        let current_slot = existing.packaging_type.clone();
        let mut active: supplier_item::ActiveModel = existing.into();
        if let Some(supplier_id) = input.supplier_id {
            active.supplier_id = Set(supplier_id);
        }
        if slot.is_some() || input.packaging_id.is_some() {
            let slot = match slot {
                Some(slot) => slot,
                None => parse_slot(&current_slot)?,
            };
            let packaging_id = self
                .resolve_packaging(item_id, slot, input.packaging_id)
                .await?;
            active.packaging_type = Set(slot.key());
            active.packaging_id = Set(packaging_id);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?.delete(&*self.db).await?;
        info!(supplier_item_id = %id, "supplier item deleted");
        Ok(())
    }

    /// Current active selections of an item grouped by slot key.
    pub async fn selections(&self, item_id: Uuid) -> ServiceResult<SupplierSelections> {
        find_or_404::<item::Entity, _>(&*self.db, item_id, "Item").await?;
        let rows = supplier_item::Entity::find()
            .filter(supplier_item::Column::ItemId.eq(item_id))
            .filter(supplier_item::Column::IsActive.eq(true))
            .order_by_asc(supplier_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut selections: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
        for row in rows {
            selections
                .entry(row.packaging_type)
                .or_default()
                .push(row.supplier_id);
        }
        Ok(SupplierSelections { selections })
    }

    /// Replaces every active association of the item with `selections`.
    ///
    /// All references are checked before anything is written; the
    /// deactivate-then-insert runs in one transaction, so a failure leaves the
    /// previous selections in place.
    #[instrument(skip(self, selections), fields(slots = selections.selections.len()))]
    pub async fn replace_selections(
        &self,
        item_id: Uuid,
        selections: SupplierSelections,
    ) -> ServiceResult<SelectionsReplaced> {
        find_or_404::<item::Entity, _>(&*self.db, item_id, "Item").await?;

        let supplier_ids: BTreeSet<Uuid> = selections
            .selections
            .values()
            .flatten()
            .copied()
            .collect();
        if !supplier_ids.is_empty() {
            let found = supplier::Entity::find()
                .filter(supplier::Column::Id.is_in(supplier_ids.iter().copied()))
                .all(&*self.db)
                .await?;
            if found.len() != supplier_ids.len() {
                return Err(ServiceError::ValidationError(
                    "selections references a missing supplier".into(),
                ));
            }
            if found.iter().any(|s| !s.is_active) {
                return Err(ServiceError::ValidationError(
                    "selections references an inactive supplier".into(),
                ));
            }
        }

        let additional = active_for_item(&*self.db, item_id).await?;
        let mut normalized: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
        let mut rows = Vec::new();
        let now = Utc::now();
        for (key, suppliers) in selections.selections {
            let slot = resolve_slot(parse_slot(&key)?, &additional)?;
            let mut seen = BTreeSet::new();
            for supplier_id in suppliers.into_iter().filter(|id| seen.insert(*id)) {
                normalized
                    .entry(slot.key.clone())
                    .or_default()
                    .push(supplier_id);
                rows.push(supplier_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    supplier_id: Set(supplier_id),
                    item_id: Set(item_id),
                    packaging_type: Set(slot.key.clone()),
                    packaging_id: Set(slot.packaging_id),
                    is_active: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                });
            }
        }

        let inserted = rows.len();
        let txn = self.db.begin().await?;
        let deactivated = supplier_item::Entity::update_many()
            .col_expr(supplier_item::Column::IsActive, Expr::value(false))
            .col_expr(supplier_item::Column::UpdatedAt, Expr::value(now))
            .filter(supplier_item::Column::ItemId.eq(item_id))
            .filter(supplier_item::Column::IsActive.eq(true))
            .exec(&txn)
            .await?
            .rows_affected;
        if !rows.is_empty() {
            supplier_item::Entity::insert_many(rows).exec(&txn).await?;
        }
        txn.commit().await?;

        info!(%item_id, deactivated, inserted, "supplier selections replaced");
        self.events
            .emit(Event::SupplierSelectionsReplaced {
                item_id,
                deactivated,
                inserted,
            })
            .await;
        Ok(SelectionsReplaced {
            item_id,
            deactivated_count: deactivated,
            inserted_count: inserted,
            selections: normalized,
        })
    }
}
