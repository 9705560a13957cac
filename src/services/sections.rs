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
use crate::entities::{branch, department, section};
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub name: Option<String>,
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    #[serde(alias = "department")]
    pub department_id: Option<Uuid>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct SectionService {
    db: Arc<DatabaseConnection>,
}

impl SectionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        branch_id: Option<Uuid>,
        page: PageRequest,
    ) -> ServiceResult<Page<section::Model>> {
        let mut query = section::Entity::find().order_by_asc(section::Column::Name);
        if let Some(branch_id) = branch_id {
            query = query.filter(section::Column::BranchId.eq(branch_id));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<section::Model> {
        find_or_404::<section::Entity, _>(&*self.db, id, "Section").await
    }

    /// References must exist, and a department given alongside a branch must
    /// belong to that branch.
    async fn check_references(
        &self,
        branch_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        ensure_optional::<branch::Entity, _>(&*self.db, branch_id, "branchId", "branch").await?;
        if let Some(department_id) = department_id {
            let dept = super::ensure_exists::<department::Entity, _>(
                &*self.db,
                department_id,
                "departmentId",
                "department",
            )
            .await?;
            if let (Some(branch_id), Some(dept_branch)) = (branch_id, dept.branch_id) {
                if branch_id != dept_branch {
                    return Err(ServiceError::ValidationError(
                        "departmentId belongs to a different branch".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: SectionInput) -> ServiceResult<section::Model> {
        let name = required(input.name, "name")?;
        self.check_references(input.branch_id, input.department_id)
            .await?;

        let now = Utc::now();
        let created = section::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            branch_id: Set(input.branch_id),
            department_id: Set(input.department_id),
            description: Set(clean(input.description)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(section_id = %created.id, "section created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: SectionInput) -> ServiceResult<section::Model> {
        let existing = self.get(id).await?;
        self.check_references(
            input.branch_id.or(existing.branch_id),
            input.department_id,
        )
        .await?;

        let mut active: section::ActiveModel = existing.into();
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        if let Some(department_id) = input.department_id {
            active.department_id = Set(Some(department_id));
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
        info!(section_id = %id, "section deleted");
        Ok(())
    }
}
