//! Item catalogue: creation with generated codes, populated reads, cascading
//! delete and the pricing view.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::packaging::{active_for_item, chain_of, pricing_context};
use super::{
    clean, ensure_exists, ensure_non_negative, ensure_optional, ensure_positive, fetch_page,
    find_or_404, required, required_id, search_pattern, Page, PageRequest,
};
use crate::entities::{
    branch, brand, item, item_category, packaging, supplier_item, tax, unit, BaseUnit,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::packaging::{price_embedded_slots, EmbeddedPackaging, HierarchyEntry, SlotPricing};
use crate::storage::ImageStore;

pub const ITEM_CODE_PREFIX: &str = "ITM-";

/// `ITM-` followed by eight random digits.
pub fn generate_item_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..100_000_000);
    format!("{ITEM_CODE_PREFIX}{n:08}")
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub name_en: Option<String>,
    pub name_local: Option<String>,
    pub description: Option<String>,
    /// One of `kg`, `liter`, `pieces`
    pub base_unit: Option<String>,
    #[serde(alias = "unit")]
    pub unit_id: Option<Uuid>,
    #[serde(alias = "category")]
    pub category_id: Option<Uuid>,
    #[serde(alias = "subCategory")]
    pub sub_category_id: Option<Uuid>,
    #[serde(alias = "tax")]
    pub tax_id: Option<Uuid>,
    #[serde(alias = "brand")]
    pub brand_id: Option<Uuid>,
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    pub unit_price: Option<Decimal>,
    #[serde(rename = "priceIncludesVAT")]
    pub price_includes_vat: Option<bool>,
    pub base_packaging: Option<EmbeddedPackaging>,
    pub pack_packaging: Option<EmbeddedPackaging>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category: Option<Uuid>,
    pub sub_category: Option<Uuid>,
    pub branch: Option<Uuid>,
    pub brand: Option<Uuid>,
    pub search: Option<String>,
    pub active: Option<bool>,
}

/// An item with its references resolved. A dangling reference comes back as
/// `null` rather than failing the read.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: item::Model,
    pub unit: Option<unit::Model>,
    pub category: Option<item_category::Model>,
    pub sub_category: Option<item_category::Model>,
    pub tax: Option<tax::Model>,
    pub brand: Option<brand::Model>,
    pub branch: Option<branch::Model>,
    pub packaging: Vec<packaging::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDeletion {
    pub message: String,
    pub deleted_packaging_count: u64,
    pub deleted_supplier_item_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPricing {
    pub item_id: Uuid,
    pub item_code: String,
    pub unit_price: Decimal,
    pub tax_rate: Option<Decimal>,
    #[serde(rename = "priceIncludesVAT")]
    pub price_includes_vat: bool,
    pub embedded: Vec<SlotPricing>,
    pub hierarchy: Vec<HierarchyEntry>,
}

fn parse_base_unit(raw: Option<String>) -> ServiceResult<Option<BaseUnit>> {
    clean(raw)
        .map(|value| BaseUnit::parse(&value).map_err(ServiceError::ValidationError))
        .transpose()
}

/// Drops empty entries and checks the quantities of the rest.
fn check_embedded(
    packaging: Option<EmbeddedPackaging>,
    field: &str,
) -> ServiceResult<Option<EmbeddedPackaging>> {
    let Some(packaging) = packaging.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if let Some(amount) = packaging.amount {
        ensure_positive(amount, &format!("{field}.amount"))?;
    }
    if let Some(pack_size) = packaging.pack_size {
        ensure_positive(pack_size, &format!("{field}.packSize"))?;
    }
    Ok(Some(EmbeddedPackaging {
        unit: clean(packaging.unit),
        pack_unit: clean(packaging.pack_unit),
        ..packaging
    }))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct ItemService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
    images: Arc<dyn ImageStore>,
    code_attempts: u32,
    code_generator: fn() -> String,
}

impl ItemService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        events: EventSender,
        images: Arc<dyn ImageStore>,
        code_attempts: u32,
    ) -> Self {
        Self {
            db,
            events,
            images,
            code_attempts: code_attempts.max(1),
            code_generator: generate_item_code,
        }
    }

    pub fn with_code_generator(mut self, generator: fn() -> String) -> Self {
        self.code_generator = generator;
        self
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ItemFilter, page: PageRequest) -> ServiceResult<Page<item::Model>> {
        let mut query = item::Entity::find().order_by_asc(item::Column::NameEn);
        if let Some(category) = filter.category {
            query = query.filter(item::Column::CategoryId.eq(category));
        }
        if let Some(sub_category) = filter.sub_category {
            query = query.filter(item::Column::SubCategoryId.eq(sub_category));
        }
        if let Some(branch) = filter.branch {
            query = query.filter(item::Column::BranchId.eq(branch));
        }
        if let Some(brand) = filter.brand {
            query = query.filter(item::Column::BrandId.eq(brand));
        }
        if let Some(pattern) = search_pattern(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(item::Column::NameEn.like(pattern.clone()))
                    .add(item::Column::NameLocal.like(pattern.clone()))
                    .add(item::Column::ItemCode.like(pattern)),
            );
        }
        if let Some(active) = filter.active {
            query = query.filter(item::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<item::Model> {
        find_or_404::<item::Entity, _>(&*self.db, id, "Item").await
    }

    pub async fn get_detail(&self, id: Uuid) -> ServiceResult<ItemDetail> {
        let item = self.get(id).await?;
        let db = &*self.db;
        let unit = unit::Entity::find_by_id(item.unit_id).one(db).await?;
        let category = item_category::Entity::find_by_id(item.category_id).one(db).await?;
        let sub_category = item_category::Entity::find_by_id(item.sub_category_id)
            .one(db)
            .await?;
        let tax = match item.tax_id {
            Some(id) => tax::Entity::find_by_id(id).one(db).await?,
            None => None,
        };
        let brand = match item.brand_id {
            Some(id) => brand::Entity::find_by_id(id).one(db).await?,
            None => None,
        };
        let branch = match item.branch_id {
            Some(id) => branch::Entity::find_by_id(id).one(db).await?,
            None => None,
        };
        let packaging = active_for_item(db, item.id).await?;
        Ok(ItemDetail {
            item,
            unit,
            category,
            sub_category,
            tax,
            brand,
            branch,
            packaging,
        })
    }

    /// Category must be top-level. The sub-category is either a child of it or
    /// the category itself, which stands for "no distinct sub-category".
    async fn check_classification(&self, category_id: Uuid, sub_category_id: Uuid) -> ServiceResult<()> {
        let category = ensure_exists::<item_category::Entity, _>(
            &*self.db,
            category_id,
            "categoryId",
            "category",
        )
        .await?;
        if category.parent_id.is_some() {
            return Err(ServiceError::ValidationError(
                "categoryId must reference a top-level category".into(),
            ));
        }
        if sub_category_id == category_id {
            return Ok(());
        }
        let sub = ensure_exists::<item_category::Entity, _>(
            &*self.db,
            sub_category_id,
            "subCategoryId",
            "sub-category",
        )
        .await?;
        if sub.parent_id != Some(category_id) {
            return Err(ServiceError::ValidationError(
                "subCategoryId does not belong to categoryId".into(),
            ));
        }
        Ok(())
    }

    async fn check_optional_refs(&self, input: &ItemInput) -> ServiceResult<()> {
        let db = &*self.db;
        ensure_optional::<tax::Entity, _>(db, input.tax_id, "taxId", "tax").await?;
        ensure_optional::<brand::Entity, _>(db, input.brand_id, "brandId", "brand").await?;
        ensure_optional::<branch::Entity, _>(db, input.branch_id, "branchId", "branch").await
    }

    /// Validates everything before the first write; a rejected payload leaves
    /// no row behind.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ItemInput) -> ServiceResult<item::Model> {
        let name_en = required(input.name_en.clone(), "nameEn")?;
        let base_unit = parse_base_unit(input.base_unit.clone())?
            .ok_or_else(|| ServiceError::ValidationError("baseUnit is required".into()))?;
        let unit_id = required_id(input.unit_id, "unitId")?;
        let category_id = required_id(input.category_id, "categoryId")?;
        let sub_category_id = required_id(input.sub_category_id, "subCategoryId")?;
        let unit_price = input.unit_price.unwrap_or(Decimal::ZERO);
        ensure_non_negative(unit_price, "unitPrice")?;
        let base_packaging = check_embedded(input.base_packaging.clone(), "basePackaging")?;
        let pack_packaging = check_embedded(input.pack_packaging.clone(), "packPackaging")?;

        ensure_exists::<unit::Entity, _>(&*self.db, unit_id, "unitId", "unit").await?;
        self.check_classification(category_id, sub_category_id).await?;
        self.check_optional_refs(&input).await?;

        let now = Utc::now();
        let mut attempt = 0;
        let created = loop {
            attempt += 1;
            let row = item::ActiveModel {
                id: Set(Uuid::new_v4()),
                item_code: Set((self.code_generator)()),
                name_en: Set(name_en.clone()),
                name_local: Set(clean(input.name_local.clone())),
                description: Set(clean(input.description.clone())),
                base_unit: Set(base_unit),
                unit_id: Set(unit_id),
                category_id: Set(category_id),
                sub_category_id: Set(sub_category_id),
                tax_id: Set(input.tax_id),
                brand_id: Set(input.brand_id),
                branch_id: Set(input.branch_id),
                unit_price: Set(unit_price),
                price_includes_vat: Set(input.price_includes_vat.unwrap_or(false)),
                base_packaging: Set(base_packaging.clone()),
                pack_packaging: Set(pack_packaging.clone()),
                image_url: Set(clean(input.image_url.clone())),
                image_public_id: Set(clean(input.image_public_id.clone())),
                is_active: Set(input.is_active.unwrap_or(true)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            match row.insert(&*self.db).await {
                Ok(created) => break created,
                Err(e) if is_unique_violation(&e) && attempt < self.code_attempts => {
                    warn!(attempt, "item code collision, retrying");
                }
                Err(e) if is_unique_violation(&e) => {
                    return Err(ServiceError::InternalError(format!(
                        "could not allocate a unique item code after {attempt} attempts"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(item_id = %created.id, item_code = %created.item_code, "item created");
        self.events
            .emit(Event::ItemCreated {
                item_id: created.id,
                item_code: created.item_code.clone(),
            })
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: ItemInput) -> ServiceResult<item::Model> {
        let existing = self.get(id).await?;
        let base_unit = parse_base_unit(input.base_unit.clone())?;
        if let Some(unit_price) = input.unit_price {
            ensure_non_negative(unit_price, "unitPrice")?;
        }
        let base_packaging = check_embedded(input.base_packaging.clone(), "basePackaging")?;
        let pack_packaging = check_embedded(input.pack_packaging.clone(), "packPackaging")?;

        ensure_optional::<unit::Entity, _>(&*self.db, input.unit_id, "unitId", "unit").await?;
        if input.category_id.is_some() || input.sub_category_id.is_some() {
            self.check_classification(
                input.category_id.unwrap_or(existing.category_id),
                input.sub_category_id.unwrap_or(existing.sub_category_id),
            )
            .await?;
        }
        self.check_optional_refs(&input).await?;

        let mut active: item::ActiveModel = existing.into();
        if let Some(name_en) = clean(input.name_en) {
            active.name_en = Set(name_en);
        }
        if let Some(name_local) = clean(input.name_local) {
            active.name_local = Set(Some(name_local));
        }
        if let Some(description) = clean(input.description) {
            active.description = Set(Some(description));
        }
        if let Some(base_unit) = base_unit {
            active.base_unit = Set(base_unit);
        }
        if let Some(unit_id) = input.unit_id {
            active.unit_id = Set(unit_id);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(sub_category_id) = input.sub_category_id {
            active.sub_category_id = Set(sub_category_id);
        }
        if let Some(tax_id) = input.tax_id {
            active.tax_id = Set(Some(tax_id));
        }
        if let Some(brand_id) = input.brand_id {
            active.brand_id = Set(Some(brand_id));
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        if let Some(unit_price) = input.unit_price {
            active.unit_price = Set(unit_price);
        }
        if let Some(includes) = input.price_includes_vat {
            active.price_includes_vat = Set(includes);
        }
        if base_packaging.is_some() {
            active.base_packaging = Set(base_packaging);
        }
        if pack_packaging.is_some() {
            active.pack_packaging = Set(pack_packaging);
        }
        if let Some(image_url) = clean(input.image_url) {
            active.image_url = Set(Some(image_url));
        }
        if let Some(public_id) = clean(input.image_public_id) {
            active.image_public_id = Set(Some(public_id));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(&*self.db).await?;
        self.events.emit(Event::ItemUpdated(id)).await;
        Ok(updated)
    }

    /// Hard delete of the item with its packaging and supplier associations.
    /// The remote image is destroyed after commit; failing that only logs.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<ItemDeletion> {
        let txn = self.db.begin().await?;
        let item = item::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item", id))?;
        let packaging_removed = packaging::Entity::delete_many()
            .filter(packaging::Column::ItemId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        let supplier_items_removed = supplier_item::Entity::delete_many()
            .filter(supplier_item::Column::ItemId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        item::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if let Some(public_id) = item.image_public_id.as_deref() {
            if let Err(e) = self.images.destroy(public_id).await {
                warn!(error = %e, %public_id, "failed to destroy item image");
            }
        }

        info!(item_id = %id, packaging_removed, supplier_items_removed, "item deleted");
        self.events
            .emit(Event::ItemDeleted {
                item_id: id,
                packaging_removed,
                supplier_items_removed,
            })
            .await;
        Ok(ItemDeletion {
            message: "Item deleted successfully".into(),
            deleted_packaging_count: packaging_removed,
            deleted_supplier_item_count: supplier_items_removed,
        })
    }

    /// Embedded slots and the standalone hierarchy, priced with the item's tax.
    #[instrument(skip(self))]
    pub async fn pricing(&self, id: Uuid) -> ServiceResult<ItemPricing> {
        let item = self.get(id).await?;
        let ctx = pricing_context(&*self.db, &item).await?;
        let embedded = price_embedded_slots(
            item.base_packaging.as_ref(),
            item.pack_packaging.as_ref(),
            &ctx,
        );
        let hierarchy = chain_of(&active_for_item(&*self.db, id).await?)?.hierarchy(&ctx);
        Ok(ItemPricing {
            item_id: item.id,
            item_code: item.item_code,
            unit_price: item.unit_price,
            tax_rate: ctx.tax_rate,
            price_includes_vat: item.price_includes_vat,
            embedded,
            hierarchy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;
    use crate::services::testing::{seed_category, seed_item, seed_supplier, seed_unit};
    use crate::storage::InMemoryImageStore;
    use rust_decimal_macros::dec;
    use sea_orm::PaginatorTrait;
    use tokio::sync::mpsc;

    fn service(db: Arc<DatabaseConnection>) -> ItemService {
        let (tx, _rx) = mpsc::channel(64);
        ItemService::new(db, EventSender::new(tx), Arc::new(InMemoryImageStore::new()), 3)
    }

    async fn valid_input(db: &DatabaseConnection) -> ItemInput {
        let unit = seed_unit(db).await;
        let category = seed_category(db, "Produce", None).await;
        let sub = seed_category(db, "Herbs", Some(category.id)).await;
        ItemInput {
            name_en: Some("Basil".into()),
            base_unit: Some("kg".into()),
            unit_id: Some(unit.id),
            category_id: Some(category.id),
            sub_category_id: Some(sub.id),
            unit_price: Some(dec!(4)),
            ..Default::default()
        }
    }

    #[test]
    fn generated_codes_have_prefix_and_digits() {
        let code = generate_item_code();
        assert!(code.starts_with(ITEM_CODE_PREFIX));
        assert_eq!(code.len(), ITEM_CODE_PREFIX.len() + 8);
        assert!(code[ITEM_CODE_PREFIX.len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn aliases_accept_short_reference_names() {
        let id = Uuid::new_v4();
        let input: ItemInput = serde_json::from_value(serde_json::json!({
            "nameEn": "Salt",
            "category": id,
            "subCategory": id,
            "unit": id,
            "priceIncludesVAT": true
        }))
        .unwrap();
        assert_eq!(input.category_id, Some(id));
        assert_eq!(input.sub_category_id, Some(id));
        assert_eq!(input.unit_id, Some(id));
        assert_eq!(input.price_includes_vat, Some(true));
    }

    #[tokio::test]
    async fn missing_required_fields_persist_nothing() {
        let (db, _dir) = migrated_sqlite().await;
        let complete = valid_input(&db).await;
        let service = service(db.clone());

        let cases = [
            (ItemInput { name_en: None, ..complete.clone() }, "nameEn is required"),
            (ItemInput { base_unit: None, ..complete.clone() }, "baseUnit is required"),
            (ItemInput { unit_id: None, ..complete.clone() }, "unitId is required"),
            (ItemInput { category_id: None, ..complete.clone() }, "categoryId is required"),
            (
                ItemInput { sub_category_id: None, ..complete.clone() },
                "subCategoryId is required",
            ),
        ];
        for (input, message) in cases {
            assert_eq!(service.create(input).await.unwrap_err().to_string(), message);
        }
        assert_eq!(item::Entity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sub_category_may_equal_category() {
        let (db, _dir) = migrated_sqlite().await;
        let mut input = valid_input(&db).await;
        input.sub_category_id = input.category_id;
        let created = service(db).create(input).await.unwrap();
        assert_eq!(created.category_id, created.sub_category_id);
    }

    #[tokio::test]
    async fn foreign_sub_category_is_rejected() {
        let (db, _dir) = migrated_sqlite().await;
        let mut input = valid_input(&db).await;
        let other = seed_category(&db, "Meat", None).await;
        let stray = seed_category(&db, "Beef", Some(other.id)).await;
        input.sub_category_id = Some(stray.id);
        let err = service(db).create(input).await.unwrap_err();
        assert_eq!(err.to_string(), "subCategoryId does not belong to categoryId");
    }

    #[tokio::test]
    async fn code_collisions_retry_then_fail() {
        fn fixed() -> String {
            "ITM-00000001".into()
        }
        let (db, _dir) = migrated_sqlite().await;
        let input = valid_input(&db).await;
        let service = service(db).with_code_generator(fixed);

        let first = service.create(input.clone()).await.unwrap();
        assert_eq!(first.item_code, "ITM-00000001");
        let err = service.create(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::InternalError(_)));
    }

    #[tokio::test]
    async fn delete_cascades_packaging_and_supplier_items() {
        let (db, _dir) = migrated_sqlite().await;
        let item = seed_item(&db, dec!(1)).await;
        let supplier = seed_supplier(&db, "Acme").await;
        let (tx, _rx) = mpsc::channel(64);
        let events = EventSender::new(tx);
        let packaging = crate::services::packaging::PackagingService::new(db.clone(), events.clone());
        for _ in 0..3 {
            packaging
                .create(crate::services::packaging::PackagingInput {
                    item_id: Some(item.id),
                    packaging_type: Some("bulk".into()),
                    amount: Some(dec!(2)),
                    unit: Some("kg".into()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let suppliers = crate::services::supplier_items::SupplierItemService::new(db.clone(), events);
        suppliers
            .create(crate::services::supplier_items::SupplierItemInput {
                supplier_id: Some(supplier.id),
                item_id: Some(item.id),
                packaging_type: Some("base".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = service(db.clone()).delete(item.id).await.unwrap();
        assert_eq!(result.deleted_packaging_count, 3);
        assert_eq!(result.deleted_supplier_item_count, 1);
        assert_eq!(packaging::Entity::find().count(&*db).await.unwrap(), 0);
        assert!(item::Entity::find_by_id(item.id).one(&*db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pricing_without_tax_has_zero_vat() {
        let (db, _dir) = migrated_sqlite().await;
        let mut input = valid_input(&db).await;
        input.base_packaging = Some(EmbeddedPackaging {
            amount: Some(dec!(5)),
            unit: Some("kg".into()),
            pack_size: Some(dec!(2)),
            pack_unit: None,
        });
        input.pack_packaging = Some(EmbeddedPackaging {
            amount: Some(dec!(3)),
            unit: Some("box".into()),
            pack_size: None,
            pack_unit: None,
        });
        let service = service(db);
        let item = service.create(input).await.unwrap();

        let pricing = service.pricing(item.id).await.unwrap();
        assert_eq!(pricing.tax_rate, None);
        assert_eq!(pricing.embedded.len(), 2);
        assert_eq!(pricing.embedded[0].pricing.price, dec!(40));
        assert_eq!(pricing.embedded[1].total_units, dec!(30));
        assert_eq!(pricing.embedded[1].pricing.vat_amount, Decimal::ZERO);
        assert!(pricing.hierarchy.is_empty());
    }
}
