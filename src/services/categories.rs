use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clean, fetch_page, find_or_404, required, required_id, Page, PageRequest};
use crate::entities::{item, item_category};
use crate::errors::{ServiceError, ServiceResult};

/// Body for both categories and sub-categories; `parentId` is only read on
/// the sub-category surface.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name_en: Option<String>,
    pub name_local: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "category", alias = "parent")]
    pub parent_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Categories form a single level of nesting: a top-level row may own
/// sub-categories, and a sub-category never owns anything.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_categories(
        &self,
        active: Option<bool>,
        page: PageRequest,
    ) -> ServiceResult<Page<item_category::Model>> {
        let mut query = item_category::Entity::find()
            .filter(item_category::Column::ParentId.is_null())
            .order_by_asc(item_category::Column::NameEn);
        if let Some(active) = active {
            query = query.filter(item_category::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn list_sub_categories(
        &self,
        category: Option<Uuid>,
        page: PageRequest,
    ) -> ServiceResult<Page<item_category::Model>> {
        let mut query = item_category::Entity::find()
            .filter(item_category::Column::ParentId.is_not_null())
            .order_by_asc(item_category::Column::NameEn);
        if let Some(category) = category {
            query = query.filter(item_category::Column::ParentId.eq(category));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get_category(&self, id: Uuid) -> ServiceResult<item_category::Model> {
        let row = find_or_404::<item_category::Entity, _>(&*self.db, id, "Category").await?;
        if row.parent_id.is_some() {
            return Err(ServiceError::not_found("Category", id));
        }
        Ok(row)
    }

    pub async fn get_sub_category(&self, id: Uuid) -> ServiceResult<item_category::Model> {
        let row = find_or_404::<item_category::Entity, _>(&*self.db, id, "SubCategory").await?;
        if row.parent_id.is_none() {
            return Err(ServiceError::not_found("SubCategory", id));
        }
        Ok(row)
    }

    /// The parent of a sub-category must exist and be top-level.
    async fn check_parent(&self, parent_id: Uuid) -> ServiceResult<()> {
        let parent = super::ensure_exists::<item_category::Entity, _>(
            &*self.db, parent_id, "parentId", "category",
        )
        .await?;
        if parent.parent_id.is_some() {
            return Err(ServiceError::ValidationError(
                "parentId must reference a top-level category".into(),
            ));
        }
        Ok(())
    }

    async fn insert(
        &self,
        input: CategoryInput,
        parent_id: Option<Uuid>,
    ) -> ServiceResult<item_category::Model> {
        let now = Utc::now();
        let created = item_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name_en: Set(required(input.name_en, "nameEn")?),
            name_local: Set(clean(input.name_local)),
            description: Set(clean(input.description)),
            parent_id: Set(parent_id),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(category_id = %created.id, parent_id = ?parent_id, "category created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CategoryInput,
    ) -> ServiceResult<item_category::Model> {
        self.insert(input, None).await
    }

    #[instrument(skip(self))]
    pub async fn create_sub_category(
        &self,
        input: CategoryInput,
    ) -> ServiceResult<item_category::Model> {
        let parent_id = required_id(input.parent_id, "parentId")?;
        self.check_parent(parent_id).await?;
        self.insert(input, Some(parent_id)).await
    }

    fn merge(active: &mut item_category::ActiveModel, input: CategoryInput) {
        if let Some(name_en) = clean(input.name_en) {
            active.name_en = Set(name_en);
        }
        if let Some(name_local) = clean(input.name_local) {
            active.name_local = Set(Some(name_local));
        }
        if let Some(description) = clean(input.description) {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> ServiceResult<item_category::Model> {
        let mut active: item_category::ActiveModel = self.get_category(id).await?.into();
        Self::merge(&mut active, input);
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn update_sub_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> ServiceResult<item_category::Model> {
        let existing = self.get_sub_category(id).await?;
        if let Some(parent_id) = input.parent_id {
            if parent_id == id {
                return Err(ServiceError::ValidationError(
                    "parentId cannot reference the sub-category itself".into(),
                ));
            }
            self.check_parent(parent_id).await?;
        }
        let parent_id = input.parent_id;
        let mut active: item_category::ActiveModel = existing.into();
        Self::merge(&mut active, input);
        if let Some(parent_id) = parent_id {
            active.parent_id = Set(Some(parent_id));
        }
        Ok(active.update(&*self.db).await?)
    }

    async fn items_referencing(&self, id: Uuid) -> ServiceResult<u64> {
        Ok(item::Entity::find()
            .filter(
                Condition::any()
                    .add(item::Column::CategoryId.eq(id))
                    .add(item::Column::SubCategoryId.eq(id)),
            )
            .count(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> ServiceResult<()> {
        let category = self.get_category(id).await?;
        let children = item_category::Entity::find()
            .filter(item_category::Column::ParentId.eq(id))
            .count(&*self.db)
            .await?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category has {children} sub-categories"
            )));
        }
        let items = self.items_referencing(id).await?;
        if items > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category is used by {items} item(s)"
            )));
        }
        category.delete(&*self.db).await?;
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_sub_category(&self, id: Uuid) -> ServiceResult<()> {
        let sub = self.get_sub_category(id).await?;
        let items = self.items_referencing(id).await?;
        if items > 0 {
            return Err(ServiceError::Conflict(format!(
                "Sub-category is used by {items} item(s)"
            )));
        }
        sub.delete(&*self.db).await?;
        info!(sub_category_id = %id, "sub-category deleted");
        Ok(())
    }
}
