use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, AppJson, PaginatedResponse, PaginationParams};
use crate::entities::packaging;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::packaging::{
    PackagingDeactivation, PackagingFilter, PackagingHierarchy, PackagingInput,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PackagingQuery {
    pub item: Option<Uuid>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/packaging",
    tag = "packaging",
    params(PackagingQuery, PaginationParams),
    responses((status = 200, description = "Packaging rows", body = PaginatedResponse<packaging::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_packaging(
    State(state): State<AppState>,
    Query(query): Query<PackagingQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<packaging::Model>>, ServiceError> {
    let filter = PackagingFilter {
        item: query.item,
        active: query.active,
    };
    let rows = state.services.packaging.list(filter, page.into()).await?;
    Ok(Json(rows.into()))
}

#[utoipa::path(
    get,
    path = "/api/packaging/{id}",
    tag = "packaging",
    params(("id" = Uuid, Path, description = "Packaging id")),
    responses(
        (status = 200, description = "Packaging", body = packaging::Model),
        (status = 404, description = "Packaging not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_packaging(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<packaging::Model>, ServiceError> {
    Ok(Json(state.services.packaging.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/packaging",
    tag = "packaging",
    request_body = PackagingInput,
    responses(
        (status = 201, description = "Packaging created", body = packaging::Model),
        (status = 400, description = "Invalid fields or parent", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_packaging(
    State(state): State<AppState>,
    AppJson(input): AppJson<PackagingInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.packaging.create(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/packaging/{id}",
    tag = "packaging",
    params(("id" = Uuid, Path, description = "Packaging id")),
    request_body = PackagingInput,
    responses(
        (status = 200, description = "Packaging updated", body = packaging::Model),
        (status = 400, description = "Invalid fields, or the new parent would form a cycle", body = ErrorResponse),
        (status = 404, description = "Packaging not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_packaging(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<PackagingInput>,
) -> Result<Json<packaging::Model>, ServiceError> {
    Ok(Json(state.services.packaging.update(id, input).await?))
}

/// Soft delete; active descendants are deactivated with it.
#[utoipa::path(
    delete,
    path = "/api/packaging/{id}",
    tag = "packaging",
    params(("id" = Uuid, Path, description = "Packaging id")),
    responses(
        (status = 200, description = "Packaging deactivated", body = PackagingDeactivation),
        (status = 404, description = "Packaging not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_packaging(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackagingDeactivation>, ServiceError> {
    Ok(Json(state.services.packaging.deactivate(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/packaging/item/{itemId}/hierarchy",
    tag = "packaging",
    params(("itemId" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Active packaging in depth-first order with cumulative quantities", body = PackagingHierarchy),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn packaging_hierarchy(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<PackagingHierarchy>, ServiceError> {
    Ok(Json(state.services.packaging.hierarchy(item_id).await?))
}
