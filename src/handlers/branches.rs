use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::entities::branch;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::branches::{BranchFilter, BranchInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/branches",
    tag = "branches",
    params(BranchQuery, PaginationParams),
    responses((status = 200, description = "Branches", body = PaginatedResponse<branch::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_branches(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<branch::Model>>, ServiceError> {
    let filter = BranchFilter {
        search: query.search,
        active: query.active,
    };
    Ok(Json(state.services.branches.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/branches/{id}",
    tag = "branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch", body = branch::Model),
        (status = 404, description = "Branch not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<branch::Model>, ServiceError> {
    Ok(Json(state.services.branches.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/branches",
    tag = "branches",
    request_body = BranchInput,
    responses(
        (status = 201, description = "Branch created", body = branch::Model),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_branch(
    State(state): State<AppState>,
    AppJson(input): AppJson<BranchInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.branches.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/branches/{id}",
    tag = "branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    request_body = BranchInput,
    responses(
        (status = 200, description = "Branch updated", body = branch::Model),
        (status = 404, description = "Branch not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<BranchInput>,
) -> Result<Json<branch::Model>, ServiceError> {
    Ok(Json(state.services.branches.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/branches/{id}",
    tag = "branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch deleted", body = MessageResponse),
        (status = 404, description = "Branch not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.branches.delete(id).await?;
    Ok(Json(MessageResponse::new("Branch deleted successfully")))
}
