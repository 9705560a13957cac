//! Business logic over the database, one service per resource.
//!
//! Services validate input, check references, and persist through sea-orm. They
//! return [`ServiceError`] so handlers can map failures straight onto responses.

use rust_decimal::Decimal;
use sea_orm::{
    ConnectionTrait, EntityTrait, PaginatorTrait, PrimaryKeyTrait, Select,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};

pub mod branches;
pub mod brands;
pub mod categories;
pub mod currencies;
pub mod departments;
pub mod gallery;
pub mod items;
pub mod orders;
pub mod packaging;
pub mod recipes;
pub mod roles;
pub mod sections;
pub mod supplier_items;
pub mod suppliers;
pub mod taxes;
pub mod units;
pub mod users;
pub mod wastage;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// One-based page request, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub async fn fetch_page<E, C>(
    select: Select<E>,
    db: &C,
    request: PageRequest,
) -> ServiceResult<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let paginator = select.paginate(db, request.per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(request.page - 1).await?;
    Ok(Page {
        items,
        total,
        page: request.page,
        per_page: request.per_page,
    })
}

/// Trims a string input; blank means absent.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required(value: Option<String>, field: &str) -> ServiceResult<String> {
    clean(value).ok_or_else(|| ServiceError::ValidationError(format!("{field} is required")))
}

pub fn required_id(value: Option<Uuid>, field: &str) -> ServiceResult<Uuid> {
    value.ok_or_else(|| ServiceError::ValidationError(format!("{field} is required")))
}

pub fn ensure_positive(value: Decimal, field: &str) -> ServiceResult<()> {
    if value <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

pub fn ensure_non_negative(value: Decimal, field: &str) -> ServiceResult<()> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not be negative"
        )));
    }
    Ok(())
}

/// Row by id or 404.
pub async fn find_or_404<E, C>(db: &C, id: Uuid, entity: &str) -> ServiceResult<E::Model>
where
    E: EntityTrait,
    C: ConnectionTrait,
    Uuid: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found(entity, id))
}

/// Referenced row by id, or a 400 naming the offending field.
pub async fn ensure_exists<E, C>(
    db: &C,
    id: Uuid,
    field: &str,
    entity: &str,
) -> ServiceResult<E::Model>
where
    E: EntityTrait,
    C: ConnectionTrait,
    Uuid: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    E::find_by_id(id).one(db).await?.ok_or_else(|| {
        ServiceError::ValidationError(format!("{field} references a missing {entity}"))
    })
}

pub async fn ensure_optional<E, C>(
    db: &C,
    id: Option<Uuid>,
    field: &str,
    entity: &str,
) -> ServiceResult<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
    Uuid: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    if let Some(id) = id {
        ensure_exists::<E, C>(db, id, field, entity).await?;
    }
    Ok(())
}

/// `%term%` for LIKE filters, `None` for blank search input.
pub fn search_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture rows written straight through the entities.

    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
    use uuid::Uuid;

    use crate::entities::{item, item_category, supplier, unit, BaseUnit};

    pub async fn seed_category(db: &DatabaseConnection, name: &str, parent: Option<Uuid>) -> item_category::Model {
        let now = Utc::now();
        item_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name_en: Set(name.to_string()),
            name_local: Set(None),
            description: Set(None),
            parent_id: Set(parent),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("category")
    }

    pub async fn seed_unit(db: &DatabaseConnection) -> unit::Model {
        let now = Utc::now();
        unit::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Kilogram".into()),
            symbol: Set(Some("kg".into())),
            base_unit: Set(BaseUnit::Kg),
            unit_type: Set("Standard Unit".into()),
            conversion_factor: Set(Decimal::ONE),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("unit")
    }

    pub async fn seed_item(db: &DatabaseConnection, unit_price: Decimal) -> item::Model {
        let unit = seed_unit(db).await;
        let category = seed_category(db, "Dry goods", None).await;
        let sub = seed_category(db, "Flour", Some(category.id)).await;
        let now = Utc::now();
        item::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_code: Set(format!("ITM-{}", Uuid::new_v4().simple())),
            name_en: Set("Flour".into()),
            name_local: Set(None),
            description: Set(None),
            base_unit: Set(BaseUnit::Kg),
            unit_id: Set(unit.id),
            category_id: Set(category.id),
            sub_category_id: Set(sub.id),
            tax_id: Set(None),
            brand_id: Set(None),
            branch_id: Set(None),
            unit_price: Set(unit_price),
            price_includes_vat: Set(false),
            base_packaging: Set(None),
            pack_packaging: Set(None),
            image_url: Set(None),
            image_public_id: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("item")
    }

    pub async fn seed_supplier(db: &DatabaseConnection, name: &str) -> supplier::Model {
        let now = Utc::now();
        supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            contact_name: Set(None),
            email: Set(None),
            phone: Set(None),
            address: Set(None),
            tax_number: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("supplier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(clean(Some("  Flour ".into())), Some("Flour".into()));
        assert_eq!(clean(Some("   ".into())), None);
        assert_eq!(clean(None), None);
    }

    #[test]
    fn required_field_messages_name_the_field() {
        let err = required(Some(" ".into()), "nameEn").unwrap_err();
        assert_eq!(err.to_string(), "nameEn is required");
        let err = required_id(None, "categoryId").unwrap_err();
        assert_eq!(err.to_string(), "categoryId is required");
    }

    #[test]
    fn decimal_guards() {
        assert!(ensure_positive(dec!(0.5), "amount").is_ok());
        assert_eq!(
            ensure_positive(Decimal::ZERO, "amount").unwrap_err().to_string(),
            "amount must be greater than 0"
        );
        assert!(ensure_non_negative(Decimal::ZERO, "unitPrice").is_ok());
        assert!(ensure_non_negative(dec!(-1), "unitPrice").is_err());
    }

    #[test]
    fn page_requests_are_clamped() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(3, 1000).per_page, MAX_PER_PAGE);
        assert_eq!(search_pattern(Some(" rice ")), Some("%rice%".into()));
        assert_eq!(search_pattern(Some("  ")), None);
    }
}
