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
use crate::entities::tax;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::taxes::TaxInput;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaxQuery {
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/taxes",
    tag = "taxes",
    params(TaxQuery, PaginationParams),
    responses((status = 200, description = "Taxes", body = PaginatedResponse<tax::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_taxes(
    State(state): State<AppState>,
    Query(query): Query<TaxQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<tax::Model>>, ServiceError> {
    Ok(Json(state.services.taxes.list(query.active, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/taxes/{id}",
    tag = "taxes",
    params(("id" = Uuid, Path, description = "Tax id")),
    responses(
        (status = 200, description = "Tax", body = tax::Model),
        (status = 404, description = "Tax not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_tax(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<tax::Model>, ServiceError> {
    Ok(Json(state.services.taxes.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/taxes",
    tag = "taxes",
    request_body = TaxInput,
    responses(
        (status = 201, description = "Tax created", body = tax::Model),
        (status = 400, description = "Missing name or rate outside 0..=100", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_tax(
    State(state): State<AppState>,
    AppJson(input): AppJson<TaxInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.taxes.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/taxes/{id}",
    tag = "taxes",
    params(("id" = Uuid, Path, description = "Tax id")),
    request_body = TaxInput,
    responses(
        (status = 200, description = "Tax updated", body = tax::Model),
        (status = 404, description = "Tax not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_tax(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<TaxInput>,
) -> Result<Json<tax::Model>, ServiceError> {
    Ok(Json(state.services.taxes.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/taxes/{id}",
    tag = "taxes",
    params(("id" = Uuid, Path, description = "Tax id")),
    responses(
        (status = 200, description = "Tax deleted", body = MessageResponse),
        (status = 404, description = "Tax not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_tax(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.taxes.delete(id).await?;
    Ok(Json(MessageResponse::new("Tax deleted successfully")))
}
