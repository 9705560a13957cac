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

use super::{clean, ensure_optional, fetch_page, find_or_404, required, search_pattern, Page, PageRequest};
use crate::auth::rbac::USER;
use crate::auth::{hash_password, is_builtin_role, validate_password_strength, MASTER_ADMIN};
use crate::entities::{branch, role, user};
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    /// Never echoed back
    pub password: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "branch")]
    pub branch_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

/// Account management. Users are deactivated, never removed.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: UserFilter, page: PageRequest) -> ServiceResult<Page<user::Model>> {
        let mut query = user::Entity::find().order_by_asc(user::Column::Username);
        if let Some(pattern) = search_pattern(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(user::Column::Username.like(pattern.clone()))
                    .add(user::Column::Email.like(pattern)),
            );
        }
        if let Some(role) = clean(filter.role) {
            query = query.filter(user::Column::Role.eq(role));
        }
        if let Some(active) = filter.active {
            query = query.filter(user::Column::IsActive.eq(active));
        }
        fetch_page(query, &*self.db, page).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<user::Model> {
        find_or_404::<user::Entity, _>(&*self.db, id, "User").await
    }

    async fn check_role(&self, name: &str) -> ServiceResult<()> {
        if is_builtin_role(name) {
            return Ok(());
        }
        let custom = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        if custom.is_none() {
            return Err(ServiceError::ValidationError(
                "role references a missing role".into(),
            ));
        }
        Ok(())
    }

    async fn check_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<Uuid>,
    ) -> ServiceResult<()> {
        let mut any = Condition::any();
        if let Some(username) = username {
            any = any.add(user::Column::Username.eq(username));
        }
        if let Some(email) = email {
            any = any.add(user::Column::Email.eq(email));
        }
        if any.is_empty() {
            return Ok(());
        }
        let mut query = user::Entity::find().filter(any);
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        if let Some(clash) = query.one(&*self.db).await? {
            let field = if Some(clash.username.as_str()) == username {
                "username"
            } else {
                "email"
            };
            return Err(ServiceError::Conflict(format!("A user with this {field} already exists")));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(username = ?input.username))]
    pub async fn create(&self, input: UserInput) -> ServiceResult<user::Model> {
        input.validate()?;
        let username = required(input.username, "username")?;
        let email = required(input.email, "email")?.to_lowercase();
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::ValidationError("password is required".into()))?;
        validate_password_strength(&password)?;
        let role = clean(input.role).unwrap_or_else(|| USER.to_string());
        self.check_role(&role).await?;
        ensure_optional::<branch::Entity, _>(&*self.db, input.branch_id, "branchId", "branch")
            .await?;
        self.check_unique(Some(&username), Some(&email), None).await?;

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(email),
            password_hash: Set(hash_password(&password)?),
            role: Set(role),
            branch_id: Set(input.branch_id),
            is_active: Set(input.is_active.unwrap_or(true)),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = %created.id, role = %created.role, "user created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UserInput) -> ServiceResult<user::Model> {
        input.validate()?;
        let existing = self.get(id).await?;
        let username = clean(input.username);
        let email = clean(input.email).map(|e| e.to_lowercase());
        self.check_unique(username.as_deref(), email.as_deref(), Some(id))
            .await?;
        let role = clean(input.role);
        if let Some(role) = &role {
            self.check_role(role).await?;
        }
        ensure_optional::<branch::Entity, _>(&*self.db, input.branch_id, "branchId", "branch")
            .await?;
        let password_hash = match input.password.filter(|p| !p.is_empty()) {
            Some(password) => {
                validate_password_strength(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        let mut active: user::ActiveModel = existing.into();
        if let Some(username) = username {
            active.username = Set(username);
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = role {
            active.role = Set(role);
        }
        if let Some(branch_id) = input.branch_id {
            active.branch_id = Set(Some(branch_id));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> ServiceResult<user::Model> {
        let mut active: user::ActiveModel = self.get(id).await?.into();
        active.is_active = Set(false);
        let updated = active.update(&*self.db).await?;
        info!(user_id = %id, "user deactivated");
        Ok(updated)
    }

    /// Creates the first master admin unless an active one already exists.
    /// Returns the new account, or `None` when nothing was done.
    #[instrument(skip(self, password))]
    pub async fn ensure_master_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<Option<user::Model>> {
        let existing = user::Entity::find()
            .filter(user::Column::Role.eq(MASTER_ADMIN))
            .filter(user::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }
        let created = self
            .create(UserInput {
                username: Some(username.to_string()),
                email: Some(email.to_string()),
                password: Some(password.to_string()),
                role: Some(MASTER_ADMIN.to_string()),
                ..Default::default()
            })
            .await?;
        info!(user_id = %created.id, "bootstrap master admin created");
        Ok(Some(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::db::testing::migrated_sqlite;

    fn input(username: &str, email: &str) -> UserInput {
        UserInput {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some("Sup3rSecret!".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_hashes_and_defaults_role() {
        let (db, _dir) = migrated_sqlite().await;
        let service = UserService::new(db);

        let user = service.create(input("chef", "Chef@Example.com")).await.unwrap();
        assert_eq!(user.role, USER);
        assert_eq!(user.email, "chef@example.com");
        assert_ne!(user.password_hash, "Sup3rSecret!");
        assert!(verify_password("Sup3rSecret!", &user.password_hash));

        let err = service.create(input("chef", "other@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "A user with this username already exists");
        let err = service.create(input("sous", "CHEF@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "A user with this email already exists");
    }

    #[tokio::test]
    async fn unknown_role_and_weak_password_are_rejected() {
        let (db, _dir) = migrated_sqlite().await;
        let service = UserService::new(db);

        let mut bad_role = input("waiter", "waiter@example.com");
        bad_role.role = Some("captain".into());
        assert_eq!(
            service.create(bad_role).await.unwrap_err().to_string(),
            "role references a missing role"
        );

        let mut weak = input("waiter", "waiter@example.com");
        weak.password = Some("short".into());
        assert!(matches!(
            service.create(weak).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_created_once() {
        let (db, _dir) = migrated_sqlite().await;
        let service = UserService::new(db);

        let first = service
            .ensure_master_admin("root", "root@example.com", "B00tstrap!pass")
            .await
            .unwrap();
        assert_eq!(first.map(|u| u.role), Some(MASTER_ADMIN.to_string()));
        let second = service
            .ensure_master_admin("root2", "root2@example.com", "B00tstrap!pass")
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn deactivate_keeps_the_row() {
        let (db, _dir) = migrated_sqlite().await;
        let service = UserService::new(db);
        let user = service.create(input("porter", "porter@example.com")).await.unwrap();
        service.deactivate(user.id).await.unwrap();
        assert!(!service.get(user.id).await.unwrap().is_active);
    }
}
