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
use crate::entities::brand;
use crate::errors::ServiceResult;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrandInput {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BrandFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct BrandService {
    db: Arc<DatabaseConnection>,
}

impl BrandService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: BrandFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<brand::Model>> {
        let mut query = brand::Entity::find().order_by_asc(brand::Column::Name);
        if let Some(pattern) = search_pattern(filter.search.as_deref()) {
            query = query.filter(brand::Column::Name.like(pattern));
        }
        if let Some(active) = filter.active {
            query = query.filter(brand::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<brand::Model> {
        find_or_404::<brand::Entity, _>(&*self.db, id, "Brand").await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: BrandInput) -> ServiceResult<brand::Model> {
        input.validate()?;
        let now = Utc::now();
        let created = brand::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(input.name, "name")?),
            description: Set(clean(input.description)),
            logo_url: Set(clean(input.logo_url)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(brand_id = %created.id, "brand created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: BrandInput) -> ServiceResult<brand::Model> {
        input.validate()?;
        let mut active: brand::ActiveModel = self.get(id).await?.into();
        if let Some(name) = clean(input.name) {
            active.name = Set(name);
        }
        if let Some(description) = clean(input.description) {
            active.description = Set(Some(description));
        }
        if let Some(logo_url) = clean(input.logo_url) {
            active.logo_url = Set(Some(logo_url));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?.delete(&*self.db).await?;
        info!(brand_id = %id, "brand deleted");
        Ok(())
    }
}
