
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
use crate::entities::{unit, BaseUnit};
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::units::{UnitFilter, UnitInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct UnitQuery {
    /// `kg`, `liter` or `pieces`
    pub base_unit: Option<String>,
    pub active: Option<bool>,
}

impl TryFrom<UnitQuery> for UnitFilter {
    type Error = ServiceError;

    fn try_from(query: UnitQuery) -> Result<Self, Self::Error> {
        let base_unit = query
            .base_unit
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| BaseUnit::parse(&raw).map_err(ServiceError::ValidationError))
            .transpose()?;
        Ok(Self {
            base_unit,
            active: query.active,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/units",
    tag = "units",
    params(UnitQuery, PaginationParams),
    responses(
        (status = 200, description = "Units", body = PaginatedResponse<unit::Model>),
        (status = 400, description = "Unknown base unit filter", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_units(
    State(state): State<AppState>,
    Query(query): Query<UnitQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<unit::Model>>, ServiceError> {
    let filter = UnitFilter::try_from(query)?;
    Ok(Json(state.services.units.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/units/{id}",
    tag = "units",
    params(("id" = Uuid, Path, description = "Unit id")),
    responses(
        (status = 200, description = "Unit", body = unit::Model),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<unit::Model>, ServiceError> {
    Ok(Json(state.services.units.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/units",
    tag = "units",
    request_body = UnitInput,
    responses(
        (status = 201, description = "Unit created", body = unit::Model),
        (status = 400, description = "Missing name or invalid base unit", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_unit(
    State(state): State<AppState>,
    AppJson(input): AppJson<UnitInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.units.create(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/units/{id}",
    tag = "units",
    params(("id" = Uuid, Path, description = "Unit id")),
    request_body = UnitInput,
    responses(
        (status = 200, description = "Unit updated", body = unit::Model),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<UnitInput>,
) -> Result<Json<unit::Model>, ServiceError> {
    Ok(Json(state.services.units.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/units/{id}",
    tag = "units",
    params(("id" = Uuid, Path, description = "Unit id")),
    responses(
        (status = 200, description = "Unit deleted", body = MessageResponse),
        (status = 409, description = "Items still reference it", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.units.delete(id).await?;
    Ok(Json(MessageResponse::new("Unit deleted successfully")))
}
