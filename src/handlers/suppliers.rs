use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{
    created_response, AppJson, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::entities::supplier;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::suppliers::{SupplierFilter, SupplierInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupplierQuery {
    /// Matches name, contact name or email
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "suppliers",
    params(SupplierQuery, PaginationParams),
    responses((status = 200, description = "Suppliers", body = PaginatedResponse<supplier::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<supplier::Model>>, ServiceError> {
    let filter = SupplierFilter {
        search: query.search,
        active: query.active,
    };
    Ok(Json(state.services.suppliers.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier", body = supplier::Model),
        (status = 404, description = "Supplier not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<supplier::Model>, ServiceError> {
    Ok(Json(state.services.suppliers.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "suppliers",
    request_body = SupplierInput,
    responses(
        (status = 201, description = "Supplier created", body = supplier::Model),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    AppJson(input): AppJson<SupplierInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.suppliers.create(input).await?;
    info!(supplier_id = %created.id, "supplier created via api");
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier id")),
    request_body = SupplierInput,
    responses(
        (status = 200, description = "Supplier updated", body = supplier::Model),
        (status = 404, description = "Supplier not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<SupplierInput>,
) -> Result<Json<supplier::Model>, ServiceError> {
    Ok(Json(state.services.suppliers.update(id, input).await?))
}

/// Suppliers are deactivated, never removed, so order history keeps resolving.
#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier deactivated", body = MessageResponse),
        (status = 404, description = "Supplier not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.suppliers.deactivate(id).await?;
    Ok(Json(MessageResponse::new("Supplier deactivated successfully")))
}
