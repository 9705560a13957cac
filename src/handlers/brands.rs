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
use crate::entities::brand;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::brands::{BrandFilter, BrandInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BrandQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/brands",
    tag = "brands",
    params(BrandQuery, PaginationParams),
    responses((status = 200, description = "Brands", body = PaginatedResponse<brand::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_brands(
    State(state): State<AppState>,
    Query(query): Query<BrandQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<brand::Model>>, ServiceError> {
    let filter = BrandFilter {
        search: query.search,
        active: query.active,
    };
    Ok(Json(state.services.brands.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/brands/{id}",
    tag = "brands",
    params(("id" = Uuid, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Brand", body = brand::Model),
        (status = 404, description = "Brand not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<brand::Model>, ServiceError> {
    Ok(Json(state.services.brands.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/brands",
    tag = "brands",
    request_body = BrandInput,
    responses(
        (status = 201, description = "Brand created", body = brand::Model),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_brand(
    State(state): State<AppState>,
    AppJson(input): AppJson<BrandInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.brands.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/brands/{id}",
    tag = "brands",
    params(("id" = Uuid, Path, description = "Brand id")),
    request_body = BrandInput,
    responses(
        (status = 200, description = "Brand updated", body = brand::Model),
        (status = 404, description = "Brand not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<BrandInput>,
) -> Result<Json<brand::Model>, ServiceError> {
    Ok(Json(state.services.brands.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/brands/{id}",
    tag = "brands",
    params(("id" = Uuid, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Brand deleted", body = MessageResponse),
        (status = 404, description = "Brand not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.brands.delete(id).await?;
    Ok(Json(MessageResponse::new("Brand deleted successfully")))
}
