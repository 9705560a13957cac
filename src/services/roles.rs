use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clean, fetch_page, find_or_404, required, Page, PageRequest};
use crate::auth::is_builtin_role;
use crate::auth::permissions::is_well_formed;
use crate::entities::role::{self, PermissionList};
use crate::entities::user;
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `resource:action` grants, e.g. `items:read` or `orders:*`
    pub permissions: Option<Vec<String>>,
}

fn normalize_permissions(raw: Vec<String>) -> ServiceResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for permission in raw {
        let permission = permission.trim().to_string();
        if !is_well_formed(&permission) {
            return Err(ServiceError::ValidationError(format!(
                "invalid permission '{permission}'"
            )));
        }
        if !out.contains(&permission) {
            out.push(permission);
        }
    }
    Ok(out)
}

/// Custom roles. Built-in role names are reserved and never stored.
#[derive(Clone)]
pub struct RoleService {
    db: Arc<DatabaseConnection>,
}

impl RoleService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, page: PageRequest) -> ServiceResult<Page<role::Model>> {
        fetch_page(
            role::Entity::find().order_by_asc(role::Column::Name),
            &*self.db,
            page,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<role::Model> {
        find_or_404::<role::Entity, _>(&*self.db, id, "Role").await
    }

    async fn check_name(&self, name: &str, except: Option<Uuid>) -> ServiceResult<()> {
        if is_builtin_role(name) {
            return Err(ServiceError::Conflict(format!(
                "Role name {name} is reserved"
            )));
        }
        let mut query = role::Entity::find().filter(role::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(role::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!("Role {name} already exists")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: RoleInput) -> ServiceResult<role::Model> {
        let name = required(input.name, "name")?;
        let permissions = normalize_permissions(input.permissions.unwrap_or_default())?;
        self.check_name(&name, None).await?;

        let now = Utc::now();
        let created = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(clean(input.description)),
            permissions: Set(PermissionList(permissions)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(role = %created.name, "role created");
        Ok(created)
    }

    /// Renaming is refused while users hold the old name.
    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: RoleInput) -> ServiceResult<role::Model> {
        let existing = self.get(id).await?;
        let rename = clean(input.name).filter(|name| *name != existing.name);
        if let Some(name) = &rename {
            self.check_name(name, Some(id)).await?;
            if self.holders(&existing.name).await? > 0 {
                return Err(ServiceError::Conflict(
                    "Cannot rename a role that is assigned to users".into(),
                ));
            }
        }
        let permissions = input.permissions.map(normalize_permissions).transpose()?;

        let mut active: role::ActiveModel = existing.into();
        if let Some(name) = rename {
            active.name = Set(name);
        }
        if let Some(description) = clean(input.description) {
            active.description = Set(Some(description));
        }
        if let Some(permissions) = permissions {
            active.permissions = Set(PermissionList(permissions));
        }
        Ok(active.update(&*self.db).await?)
    }

    async fn holders(&self, name: &str) -> ServiceResult<u64> {
        Ok(user::Entity::find()
            .filter(user::Column::Role.eq(name))
            .count(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let role = self.get(id).await?;
        let holders = self.holders(&role.name).await?;
        if holders > 0 {
            return Err(ServiceError::Conflict(format!(
                "Role is assigned to {holders} user(s)"
            )));
        }
        role.delete(&*self.db).await?;
        info!(role_id = %id, "role deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_sqlite;

    #[tokio::test]
    async fn builtin_names_are_reserved() {
        let (db, _dir) = migrated_sqlite().await;
        let service = RoleService::new(db);
        let err = service
            .create(RoleInput {
                name: Some("admin".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Role name admin is reserved");
    }

    #[tokio::test]
    async fn permissions_are_checked_and_deduplicated() {
        let (db, _dir) = migrated_sqlite().await;
        let service = RoleService::new(db);

        let err = service
            .create(RoleInput {
                name: Some("auditor".into()),
                permissions: Some(vec!["items".into()]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid permission 'items'");

        let role = service
            .create(RoleInput {
                name: Some("auditor".into()),
                permissions: Some(vec!["items:read".into(), " items:read ".into(), "orders:*".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(role.permissions.0, vec!["items:read", "orders:*"]);

        let dup = service
            .create(RoleInput {
                name: Some("auditor".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));
    }
}
