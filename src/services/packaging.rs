use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    clean, ensure_exists, ensure_optional, ensure_positive, fetch_page, find_or_404, required,
    required_id, Page, PageRequest,
};
use crate::entities::{branch, brand, item, packaging, tax};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::packaging::{ChainError, HierarchyEntry, PackagingChain, PackagingType, PricingContext};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingInput {
    #[serde(alias = "item")]
    pub item_id: Option<Uuid>,
    /// One of `base`, `pack`, `bulk`, `retail`, `wholesale`, `custom`
    pub packaging_type: Option<String>,
    pub amount: Option<Decimal>,
    pub unit: Option<String>,
    pub pack_size: Option<Decimal>,
    pub pack_unit: Option<String>,
    #[serde(alias = "parentPackaging")]
    pub parent_packaging_id: Option<Uuid>,
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    #[serde(alias = "brand")]
    pub brand_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PackagingFilter {
    pub item: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingHierarchy {
    pub item_id: Uuid,
    pub entries: Vec<HierarchyEntry>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingDeactivation {
    pub message: String,
    /// The packaging itself plus every active descendant
    pub deactivated_count: usize,
}

fn parse_packaging_type(raw: Option<String>) -> ServiceResult<Option<PackagingType>> {
    clean(raw)
        .map(|value| PackagingType::parse(&value).map_err(ServiceError::ValidationError))
        .transpose()
}

/// Active standalone packaging of an item in creation order. The position in
/// this list is the index used by `additional_<index>` supplier slots.
pub(crate) async fn active_for_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> ServiceResult<Vec<packaging::Model>> {
    Ok(packaging::Entity::find()
        .filter(packaging::Column::ItemId.eq(item_id))
        .filter(packaging::Column::IsActive.eq(true))
        .order_by_asc(packaging::Column::CreatedAt)
        .order_by_asc(packaging::Column::Id)
        .all(conn)
        .await?)
}

/// Builds the arena over an item's active packaging. Stored rows were
/// validated on write, so a failure here means the data was edited elsewhere.
pub(crate) fn chain_of(rows: &[packaging::Model]) -> ServiceResult<PackagingChain> {
    PackagingChain::build(rows.iter().map(packaging::Model::to_node).collect()).map_err(|e| {
        warn!(error = %e, "stored packaging hierarchy is inconsistent");
        ServiceError::InternalError(e.to_string())
    })
}

pub(crate) async fn pricing_context<C: ConnectionTrait>(
    conn: &C,
    item: &item::Model,
) -> ServiceResult<PricingContext> {
    let tax_rate = match item.tax_id {
        Some(tax_id) => tax::Entity::find_by_id(tax_id)
            .one(conn)
            .await?
            .map(|t| t.rate),
        None => None,
    };
    Ok(PricingContext {
        unit_price: Some(item.unit_price),
        tax_rate,
        price_includes_vat: item.price_includes_vat,
    })
}

/// Standalone packaging records of an item, nested through `parentPackagingId`.
#[derive(Clone)]
pub struct PackagingService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl PackagingService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    pub async fn list(
        &self,
        filter: PackagingFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<packaging::Model>> {
        let mut query = packaging::Entity::find()
            .order_by_asc(packaging::Column::CreatedAt)
            .order_by_asc(packaging::Column::Id);
        if let Some(item_id) = filter.item {
            query = query.filter(packaging::Column::ItemId.eq(item_id));
        }
        if let Some(active) = filter.active {
            query = query.filter(packaging::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<packaging::Model> {
        find_or_404::<packaging::Entity, _>(&*self.db, id, "Packaging").await
    }

    /// Checks a prospective parent for `child` (absent on create).
    async fn check_parent(
        &self,
        item_id: Uuid,
        child: Option<Uuid>,
        parent_id: Uuid,
    ) -> ServiceResult<()> {
        let parent = ensure_exists::<packaging::Entity, _>(
            &*self.db,
            parent_id,
            "parentPackagingId",
            "packaging",
        )
        .await?;
        if !parent.is_active {
            return Err(ServiceError::ValidationError(
                "parentPackagingId references an inactive packaging".into(),
            ));
        }
        let Some(child) = child else {
            if parent.item_id != item_id {
                return Err(ServiceError::ValidationError(
                    "parentPackagingId belongs to a different item".into(),
                ));
            }
            return Ok(());
        };
        if parent.item_id != item_id {
            return Err(ServiceError::ValidationError(
                ChainError::ForeignParent {
                    child,
                    parent: parent_id,
                }
                .to_string(),
            ));
        }
        let chain = chain_of(&active_for_item(&*self.db, item_id).await?)?;
        if chain.would_create_cycle(child, parent_id) {
            let err = if child == parent_id {
                ChainError::SelfParent(child)
            } else {
                ChainError::Cycle(child)
            };
            return Err(ServiceError::ValidationError(err.to_string()));
        }
        Ok(())
    }

    /// A deactivated row keeps its stored parent link, which may now close a
    /// loop through rows that were re-parented while it was inactive.
    async fn check_reactivation(
        &self,
        existing: &packaging::Model,
        parent_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        let mut nodes: Vec<_> = active_for_item(&*self.db, existing.item_id)
            .await?
            .iter()
            .filter(|row| row.id != existing.id)
            .map(packaging::Model::to_node)
            .collect();
        let mut node = existing.to_node();
        if parent_id.is_some() {
            node.parent_id = parent_id;
        }
        nodes.push(node);
        PackagingChain::build(nodes)
            .map(|_| ())
            .map_err(|e| ServiceError::ValidationError(e.to_string()))
    }

    async fn check_scope(&self, branch_id: Option<Uuid>, brand_id: Option<Uuid>) -> ServiceResult<()> {
        ensure_optional::<branch::Entity, _>(&*self.db, branch_id, "branchId", "branch").await?;
        ensure_optional::<brand::Entity, _>(&*self.db, brand_id, "brandId", "brand").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: PackagingInput) -> ServiceResult<packaging::Model> {
        let item_id = required_id(input.item_id, "itemId")?;
        let packaging_type = parse_packaging_type(input.packaging_type)?
            .ok_or_else(|| ServiceError::ValidationError("packagingType is required".into()))?;
        let amount = input
            .amount
            .ok_or_else(|| ServiceError::ValidationError("amount is required".into()))?;
        ensure_positive(amount, "amount")?;
        let unit = required(input.unit, "unit")?;
        if let Some(pack_size) = input.pack_size {
            ensure_positive(pack_size, "packSize")?;
        }

        ensure_exists::<item::Entity, _>(&*self.db, item_id, "itemId", "item").await?;
        self.check_scope(input.branch_id, input.brand_id).await?;
        if let Some(parent_id) = input.parent_packaging_id {
            self.check_parent(item_id, None, parent_id).await?;
        }

        let now = Utc::now();
        let created = packaging::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item_id),
            packaging_type: Set(packaging_type),
            amount: Set(amount),
            unit: Set(unit),
            pack_size: Set(input.pack_size),
            pack_unit: Set(clean(input.pack_unit)),
            parent_packaging_id: Set(input.parent_packaging_id),
            branch_id: Set(input.branch_id),
            brand_id: Set(input.brand_id),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(packaging_id = %created.id, %item_id, "packaging created");
        self.events
            .emit(Event::PackagingCreated {
                packaging_id: created.id,
                item_id,
            })
            .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: PackagingInput) -> ServiceResult<packaging::Model> {
        let existing = self.get(id).await?;
        if input.item_id.is_some_and(|item_id| item_id != existing.item_id) {
            return Err(ServiceError::ValidationError(
                "itemId cannot be changed".into(),
            ));
        }
        let packaging_type = parse_packaging_type(input.packaging_type)?;
        if let Some(amount) = input.amount {
            ensure_positive(amount, "amount")?;
        }
        if let Some(pack_size) = input.pack_size {
            ensure_positive(pack_size, "packSize")?;
        }
        self.check_scope(input.branch_id, input.brand_id).await?;
        if let Some(parent_id) = input.parent_packaging_id {
            self.check_parent(existing.item_id, Some(id), parent_id).await?;
        }
        if !existing.is_active && input.is_active == Some(true) {
            self.check_reactivation(&existing, input.parent_packaging_id)
                .await?;
        }

        let mut active: packaging::ActiveModel = existing.into();
        if let Some(packaging_type) = packaging_type {
            active.packaging_type = Set(packaging_type);
        }
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if let Some(unit) = clean(input.unit) {
            active.unit = Set(unit);
        }
        if let Some(pack_size) = input.pack_size {
            active.pack_size = Set(Some(pack_size));
        }
        if let Some(pack_unit) = clean(input.pack_unit) {
            active.pack_unit = Set(Some(pack_unit));
        }
        if let Some(parent_id) = input.parent_packaging_id {
            active.parent_packaging_id = Set(Some(parent_id));
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        if let Some(brand_id) = input.brand_id {
            active.brand_id = Set(Some(brand_id));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Soft delete. Active descendants are deactivated in the same transaction.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> ServiceResult<PackagingDeactivation> {
        let target = self.get(id).await?;

        let txn = self.db.begin().await?;
        let rows = active_for_item(&txn, target.item_id).await?;
        let mut ids = vec![id];
        if target.is_active {
            ids.extend(chain_of(&rows)?.descendants(id));
        }
        packaging::Entity::update_many()
            .col_expr(packaging::Column::IsActive, Expr::value(false))
            .col_expr(packaging::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(packaging::Column::Id.is_in(ids.clone()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        let cascaded = ids.len() - 1;
        info!(packaging_id = %id, cascaded, "packaging deactivated");
        self.events
            .emit(Event::PackagingDeactivated {
                packaging_id: id,
                cascaded,
            })
            .await;
        Ok(PackagingDeactivation {
            message: "Packaging deactivated successfully".into(),
            deactivated_count: ids.len(),
        })
    }

    /// Depth-first view of the item's active packaging, priced with the item's tax.
    #[instrument(skip(self))]
    pub async fn hierarchy(&self, item_id: Uuid) -> ServiceResult<PackagingHierarchy> {
        let item = find_or_404::<item::Entity, _>(&*self.db, item_id, "Item").await?;
        let ctx = pricing_context(&*self.db, &item).await?;
        let chain = chain_of(&active_for_item(&*self.db, item_id).await?)?;
        Ok(PackagingHierarchy {
            item_id,
            entries: chain.hierarchy(&ctx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use crate::services::testing::seed_item;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn service(db: Arc<DatabaseConnection>) -> (PackagingService, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(32);
        (PackagingService::new(db, EventSender::new(tx)), rx)
    }

    fn level(item_id: Uuid, amount: Decimal, pack_size: Option<Decimal>, parent: Option<Uuid>) -> PackagingInput {
        PackagingInput {
            item_id: Some(item_id),
            packaging_type: Some("pack".into()),
            amount: Some(amount),
            unit: Some("kg".into()),
            pack_size,
            parent_packaging_id: parent,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn nested_levels_multiply() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(2)).await;
        let (service, _rx) = service(db);

        let outer = service.create(level(item.id, dec!(5), Some(dec!(2)), None)).await.unwrap();
        let inner = service
            .create(level(item.id, dec!(3), None, Some(outer.id)))
            .await
            .unwrap();

        let view = service.hierarchy(item.id).await.unwrap();
        assert_eq!(view.entries.len(), 2);
        let child = view
            .entries
            .iter()
            .find(|e| e.packaging_id == inner.id)
            .unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(child.total_units, dec!(30));
        assert_eq!(child.pricing.price, dec!(60));
    }

    #[tokio::test]
    async fn rejects_invalid_type_and_amount() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let (service, _rx) = service(db);

        let mut input = level(item.id, dec!(1), None, None);
        input.packaging_type = Some("crate".into());
        assert_eq!(
            service.create(input).await.unwrap_err().to_string(),
            crate::packaging::PACKAGING_TYPE_ERROR
        );

        let input = level(item.id, Decimal::ZERO, None, None);
        assert_eq!(
            service.create(input).await.unwrap_err().to_string(),
            "amount must be greater than 0"
        );
    }

    #[tokio::test]
    async fn rejects_cycles_and_foreign_parents() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let other = seed_item(&db, dec!(1)).await;
        let (service, _rx) = service(db);

        let a = service.create(level(item.id, dec!(2), None, None)).await.unwrap();
        let b = service.create(level(item.id, dec!(2), None, Some(a.id))).await.unwrap();
        let foreign = service.create(level(other.id, dec!(2), None, None)).await.unwrap();

        let err = service
            .update(
                a.id,
                PackagingInput {
                    parent_packaging_id: Some(b.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cycle"));

        let err = service
            .create(level(item.id, dec!(1), None, Some(foreign.id)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "parentPackagingId belongs to a different item");

        let err = service
            .update(
                b.id,
                PackagingInput {
                    parent_packaging_id: Some(b.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("its own parent"));
    }

    #[tokio::test]
    async fn deactivation_cascades_to_descendants() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let (service, mut rx) = service(db);

        let root = service.create(level(item.id, dec!(2), None, None)).await.unwrap();
        let mid = service.create(level(item.id, dec!(2), None, Some(root.id))).await.unwrap();
        let leaf = service.create(level(item.id, dec!(2), None, Some(mid.id))).await.unwrap();
        let sibling = service.create(level(item.id, dec!(2), None, None)).await.unwrap();

        let result = service.deactivate(mid.id).await.unwrap();
        assert_eq!(result.deactivated_count, 2);
        assert!(!service.get(leaf.id).await.unwrap().is_active);
        assert!(service.get(root.id).await.unwrap().is_active);
        assert!(service.get(sibling.id).await.unwrap().is_active);

        let mut saw_cascade = false;
        while let Ok(event) = rx.try_recv() {
            if let Event::PackagingDeactivated { cascaded, .. } = event {
                saw_cascade = cascaded == 1;
            }
        }
        assert!(saw_cascade);
    }

    #[tokio::test]
    async fn reactivation_cannot_close_a_loop() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let (service, _rx) = service(db);

        let a = service.create(level(item.id, dec!(2), None, None)).await.unwrap();
        let b = service.create(level(item.id, dec!(3), None, Some(a.id))).await.unwrap();
        let c = service.create(level(item.id, dec!(4), None, Some(b.id))).await.unwrap();
        assert_eq!(service.deactivate(b.id).await.unwrap().deactivated_count, 2);

        let reactivate = || PackagingInput {
            is_active: Some(true),
            ..Default::default()
        };
        service.update(c.id, reactivate()).await.unwrap();
        service
            .update(
                a.id,
                PackagingInput {
                    parent_packaging_id: Some(c.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service.update(b.id, reactivate()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref msg) if msg.contains("cycle")));
        assert!(!service.get(b.id).await.unwrap().is_active);
        assert_eq!(service.hierarchy(item.id).await.unwrap().entries.len(), 2);
    }
}
