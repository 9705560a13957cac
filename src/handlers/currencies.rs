use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::entities::currency;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::currencies::CurrencyInput;

#[utoipa::path(
    get,
    path = "/api/currencies",
    tag = "currencies",
    params(PaginationParams),
    responses((status = 200, description = "Currencies", body = PaginatedResponse<currency::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_currencies(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<currency::Model>>, ServiceError> {
    Ok(Json(state.services.currencies.list(page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/currencies/{id}",
    tag = "currencies",
    params(("id" = Uuid, Path, description = "Currency id")),
    responses(
        (status = 200, description = "Currency", body = currency::Model),
        (status = 404, description = "Currency not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_currency(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<currency::Model>, ServiceError> {
    Ok(Json(state.services.currencies.get(id).await?))
}

/// Creating a default currency clears the flag on every other currency.
#[utoipa::path(
    post,
    path = "/api/currencies",
    tag = "currencies",
    request_body = CurrencyInput,
    responses(
        (status = 201, description = "Currency created", body = currency::Model),
        (status = 400, description = "Invalid code or rate", body = ErrorResponse),
        (status = 409, description = "Code already exists", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_currency(
    State(state): State<AppState>,
    AppJson(input): AppJson<CurrencyInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.currencies.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/currencies/{id}",
    tag = "currencies",
    params(("id" = Uuid, Path, description = "Currency id")),
    request_body = CurrencyInput,
    responses(
        (status = 200, description = "Currency updated", body = currency::Model),
        (status = 404, description = "Currency not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_currency(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<CurrencyInput>,
) -> Result<Json<currency::Model>, ServiceError> {
    Ok(Json(state.services.currencies.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/currencies/{id}",
    tag = "currencies",
    params(("id" = Uuid, Path, description = "Currency id")),
    responses(
        (status = 200, description = "Currency deleted", body = MessageResponse),
        (status = 404, description = "Currency not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_currency(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.currencies.delete(id).await?;
    Ok(Json(MessageResponse::new("Currency deleted successfully")))
}
