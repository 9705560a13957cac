use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{clean, fetch_page, find_or_404, required, search_pattern, Page, PageRequest};
use crate::entities::supplier;
use crate::errors::ServiceResult;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists suppliers; `search` matches name, contact name or email.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: SupplierFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<supplier::Model>> {
        let mut query = supplier::Entity::find().order_by_asc(supplier::Column::Name);
        if let Some(pattern) = search_pattern(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(supplier::Column::Name.like(pattern.clone()))
                    .add(supplier::Column::ContactName.like(pattern.clone()))
                    .add(supplier::Column::Email.like(pattern)),
            );
        }
        if let Some(active) = filter.active {
            query = query.filter(supplier::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<supplier::Model> {
        find_or_404::<supplier::Entity, _>(&*self.db, id, "Supplier").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: SupplierInput) -> ServiceResult<supplier::Model> {
        input.validate()?;
        let now = Utc::now();
        let created = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(input.name, "name")?),
            contact_name: Set(clean(input.contact_name)),
            email: Set(clean(input.email).map(|e| e.to_lowercase())),
            phone: Set(clean(input.phone)),
            address: Set(clean(input.address)),
            tax_number: Set(clean(input.tax_number)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(supplier_id = %created.id, "supplier created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: SupplierInput) -> ServiceResult<supplier::Model> {
        input.validate()?;
        let mut active: supplier::ActiveModel = self.get(id).await?.into();
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(contact_name) = clean(input.contact_name) {
            active.contact_name = Set(Some(contact_name));
        }
        if let Some(email) = clean(input.email) {
            active.email = Set(Some(email.to_lowercase()));
        }
        if let Some(phone) = clean(input.phone) {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = clean(input.address) {
            active.address = Set(Some(address));
        }
        if let Some(tax_number) = clean(input.tax_number) {
            active.tax_number = Set(Some(tax_number));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Soft delete: the supplier stays referenced by history.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> ServiceResult<supplier::Model> {
        let mut active: supplier::ActiveModel = self.get(id).await?.into();
        active.is_active = Set(false);
        let updated = active.update(&*self.db).await?;
        info!(supplier_id = %id, "supplier deactivated");
        Ok(updated)
    }
}
