use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::wastage;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::wastage::{WastageFilter, WastageInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WastageQuery {
    pub item: Option<Uuid>,
    pub branch: Option<Uuid>,
    /// RFC 3339 lower bound on `wastedAt`
    pub from: Option<DateTime<Utc>>,
    /// RFC 3339 upper bound on `wastedAt`
    pub to: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/wastage",
    tag = "wastage",
    params(WastageQuery, PaginationParams),
    responses((status = 200, description = "Wastage records, newest first", body = PaginatedResponse<wastage::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_wastage(
    State(state): State<AppState>,
    Query(query): Query<WastageQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<wastage::Model>>, ServiceError> {
    let filter = WastageFilter {
        item: query.item,
        branch: query.branch,
        from: query.from,
        to: query.to,
    };
    Ok(Json(state.services.wastage.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/wastage/{id}",
    tag = "wastage",
    params(("id" = Uuid, Path, description = "Wastage id")),
    responses(
        (status = 200, description = "Wastage record", body = wastage::Model),
        (status = 404, description = "Wastage not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_wastage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<wastage::Model>, ServiceError> {
    Ok(Json(state.services.wastage.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/wastage",
    tag = "wastage",
    request_body = WastageInput,
    responses(
        (status = 201, description = "Wastage recorded and costed", body = wastage::Model),
        (status = 400, description = "Missing item or quantity", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_wastage(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<WastageInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .wastage
        .create(input, Some(user.user_id))
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/wastage/{id}",
    tag = "wastage",
    params(("id" = Uuid, Path, description = "Wastage id")),
    request_body = WastageInput,
    responses(
        (status = 200, description = "Wastage updated", body = wastage::Model),
        (status = 404, description = "Wastage not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_wastage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<WastageInput>,
) -> Result<Json<wastage::Model>, ServiceError> {
    Ok(Json(state.services.wastage.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/wastage/{id}",
    tag = "wastage",
    params(("id" = Uuid, Path, description = "Wastage id")),
    responses(
        (status = 200, description = "Wastage deleted", body = MessageResponse),
        (status = 404, description = "Wastage not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_wastage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.wastage.delete(id).await?;
    Ok(Json(MessageResponse::new("Wastage deleted successfully")))
}
