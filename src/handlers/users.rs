use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::user;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::users::{UserFilter, UserInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Matches username or email
    pub search: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(UserQuery, PaginationParams),
    responses(
        (status = 200, description = "Users", body = PaginatedResponse<user::Model>),
        (status = 403, description = "Master admin only", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<user::Model>>, ServiceError> {
    let filter = UserFilter {
        search: query.search,
        role: query.role,
        active: query.active,
    };
    Ok(Json(state.services.users.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = user::Model),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<user::Model>, ServiceError> {
    Ok(Json(state.services.users.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = UserInput,
    responses(
        (status = 201, description = "User created", body = user::Model),
        (status = 400, description = "Invalid input or weak password", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(input): AppJson<UserInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.users.create(input).await?;
    info!(user_id = %created.id, created_by = %caller.user_id, "user created via api");
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserInput,
    responses(
        (status = 200, description = "User updated", body = user::Model),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<UserInput>,
) -> Result<Json<user::Model>, ServiceError> {
    Ok(Json(state.services.users.update(id, input).await?))
}

/// Deactivates the account; a master admin cannot deactivate themselves.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Cannot deactivate your own account", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    if caller.user_id == id {
        return Err(ServiceError::Conflict(
            "You cannot deactivate your own account".into(),
        ));
    }
    state.services.users.deactivate(id).await?;
    Ok(Json(MessageResponse::new("User deactivated successfully")))
}
