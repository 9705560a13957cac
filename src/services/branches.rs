use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{clean, fetch_page, find_or_404, required, search_pattern, Page, PageRequest};
use crate::entities::branch;
use crate::errors::ServiceResult;

/// Create and update payload. On update, absent or blank fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchInput {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub code: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct BranchService {
    db: Arc<DatabaseConnection>,
}

impl BranchService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: BranchFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<branch::Model>> {
        let mut query = branch::Entity::find().order_by_asc(branch::Column::Name);
        if let Some(pattern) = search_pattern(filter.search.as_deref()) {
            query = query.filter(branch::Column::Name.like(pattern));
        }
        if let Some(active) = filter.active {
            query = query.filter(branch::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<branch::Model> {
        find_or_404::<branch::Entity, _>(&*self.db, id, "Branch").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: BranchInput) -> ServiceResult<branch::Model> {
        input.validate()?;
        let now = Utc::now();
        let created = branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(input.name, "name")?),
            code: Set(clean(input.code)),
            address: Set(clean(input.address)),
            phone: Set(clean(input.phone)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(branch_id = %created.id, "branch created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: BranchInput) -> ServiceResult<branch::Model> {
        input.validate()?;
        let mut active: branch::ActiveModel = self.get(id).await?.into();
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(code) = clean(input.code) {
            active.code = Set(Some(code));
        }
        if let Some(address) = clean(input.address) {
            active.address = Set(Some(address));
        }
        if let Some(phone) = clean(input.phone) {
            active.phone = Set(Some(phone));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let existing = self.get(id).await?;
        existing.delete(&*self.db).await?;
        info!(branch_id = %id, "branch deleted");
        Ok(())
    }
}
