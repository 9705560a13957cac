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

use super::{clean, ensure_optional, fetch_page, find_or_404, required, Page, PageRequest};
use crate::entities::{branch, department};
use crate::errors::ServiceResult;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    pub name: Option<String>,
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct DepartmentService {
    db: Arc<DatabaseConnection>,
}

impl DepartmentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        branch_id: Option<Uuid>,
        page: PageRequest,
    ) -> ServiceResult<Page<department::Model>> {
        let mut query = department::Entity::find().order_by_asc(department::Column::Name);
        if let Some(branch_id) = branch_id {
            query = query.filter(department::Column::BranchId.eq(branch_id));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<department::Model> {
        find_or_404::<department::Entity, _>(&*self.db, id, "Department").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: DepartmentInput) -> ServiceResult<department::Model> {
        let name = required(input.name, "name")?;
        ensure_optional::<branch::Entity, _>(&*self.db, input.branch_id, "branchId", "branch")
            .await?;

        let now = Utc::now();
        let created = department::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            branch_id: Set(input.branch_id),
            description: Set(clean(input.description)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(department_id = %created.id, "department created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: DepartmentInput,
    ) -> ServiceResult<department::Model> {
        let mut active: department::ActiveModel = self.get(id).await?.into();
        ensure_optional::<branch::Entity, _>(&*self.db, input.branch_id, "branchId", "branch")
            .await?;
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
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
        info!(department_id = %id, "department deleted");
        Ok(())
    }
}
