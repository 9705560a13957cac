use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::entities::role;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::roles::RoleInput;

#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "roles",
    params(PaginationParams),
    responses(
        (status = 200, description = "Custom roles", body = PaginatedResponse<role::Model>),
        (status = 403, description = "Master admin only", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<role::Model>>, ServiceError> {
    Ok(Json(state.services.roles.list(page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = role::Model),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<role::Model>, ServiceError> {
    Ok(Json(state.services.roles.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "roles",
    request_body = RoleInput,
    responses(
        (status = 201, description = "Role created", body = role::Model),
        (status = 400, description = "Reserved name or malformed permission", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    AppJson(input): AppJson<RoleInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.roles.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = RoleInput,
    responses(
        (status = 200, description = "Role updated", body = role::Model),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Renaming a role that is still assigned", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<RoleInput>,
) -> Result<Json<role::Model>, ServiceError> {
    Ok(Json(state.services.roles.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 409, description = "Role still assigned to users", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.roles.delete(id).await?;
    Ok(Json(MessageResponse::new("Role deleted successfully")))
}
