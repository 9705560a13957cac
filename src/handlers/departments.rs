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
use crate::entities::department;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::departments::DepartmentInput;

/// Shared by the department and section listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchScopedQuery {
    pub branch: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "departments",
    params(BranchScopedQuery, PaginationParams),
    responses((status = 200, description = "Departments", body = PaginatedResponse<department::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_departments(
    State(state): State<AppState>,
    Query(query): Query<BranchScopedQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<department::Model>>, ServiceError> {
    let rows = state
        .services
        .departments
        .list(query.branch, page.into())
        .await?;
    Ok(Json(rows.into()))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department", body = department::Model),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<department::Model>, ServiceError> {
    Ok(Json(state.services.departments.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    tag = "departments",
    request_body = DepartmentInput,
    responses(
        (status = 201, description = "Department created", body = department::Model),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_department(
    State(state): State<AppState>,
    AppJson(input): AppJson<DepartmentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.departments.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department id")),
    request_body = DepartmentInput,
    responses(
        (status = 200, description = "Department updated", body = department::Model),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<DepartmentInput>,
) -> Result<Json<department::Model>, ServiceError> {
    Ok(Json(state.services.departments.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department deleted", body = MessageResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.departments.delete(id).await?;
    Ok(Json(MessageResponse::new("Department deleted successfully")))
}
