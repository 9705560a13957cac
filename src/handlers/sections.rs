use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use super::departments::BranchScopedQuery;
use crate::entities::section;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::sections::SectionInput;

#[utoipa::path(
    get,
    path = "/api/sections",
    tag = "sections",
    params(BranchScopedQuery, PaginationParams),
    responses((status = 200, description = "Sections", body = PaginatedResponse<section::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_sections(
    State(state): State<AppState>,
    Query(query): Query<BranchScopedQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<section::Model>>, ServiceError> {
    let rows = state.services.sections.list(query.branch, page.into()).await?;
    Ok(Json(rows.into()))
}

#[utoipa::path(
    get,
    path = "/api/sections/{id}",
    tag = "sections",
    params(("id" = Uuid, Path, description = "Section id")),
    responses(
        (status = 200, description = "Section", body = section::Model),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<section::Model>, ServiceError> {
    Ok(Json(state.services.sections.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/sections",
    tag = "sections",
    request_body = SectionInput,
    responses(
        (status = 201, description = "Section created", body = section::Model),
        (status = 400, description = "Invalid input, or the department belongs to another branch", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_section(
    State(state): State<AppState>,
    AppJson(input): AppJson<SectionInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.sections.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/sections/{id}",
    tag = "sections",
    params(("id" = Uuid, Path, description = "Section id")),
    request_body = SectionInput,
    responses(
        (status = 200, description = "Section updated", body = section::Model),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<SectionInput>,
) -> Result<Json<section::Model>, ServiceError> {
    Ok(Json(state.services.sections.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/sections/{id}",
    tag = "sections",
    params(("id" = Uuid, Path, description = "Section id")),
    responses(
        (status = 200, description = "Section deleted", body = MessageResponse),
        (status = 404, description = "Section not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.sections.delete(id).await?;
    Ok(Json(MessageResponse::new("Section deleted successfully")))
}
