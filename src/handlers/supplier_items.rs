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
use crate::entities::supplier_item;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::supplier_items::{SupplierItemFilter, SupplierItemInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupplierItemQuery {
    pub item: Option<Uuid>,
    pub supplier: Option<Uuid>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/supplier-items",
    tag = "supplier-items",
    params(SupplierItemQuery, PaginationParams),
    responses((status = 200, description = "Supplier associations", body = PaginatedResponse<supplier_item::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_supplier_items(
    State(state): State<AppState>,
    Query(query): Query<SupplierItemQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<supplier_item::Model>>, ServiceError> {
    let filter = SupplierItemFilter {
        item: query.item,
        supplier: query.supplier,
        active: query.active,
    };
    let rows = state.services.supplier_items.list(filter, page.into()).await?;
    Ok(Json(rows.into()))
}

#[utoipa::path(
    get,
    path = "/api/supplier-items/{id}",
    tag = "supplier-items",
    params(("id" = Uuid, Path, description = "Supplier item id")),
    responses(
        (status = 200, description = "Supplier association", body = supplier_item::Model),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_supplier_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<supplier_item::Model>, ServiceError> {
    Ok(Json(state.services.supplier_items.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/supplier-items",
    tag = "supplier-items",
    request_body = SupplierItemInput,
    responses(
        (status = 201, description = "Association created", body = supplier_item::Model),
        (status = 400, description = "Missing fields or unknown references", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_supplier_item(
    State(state): State<AppState>,
    AppJson(input): AppJson<SupplierItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.supplier_items.create(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/supplier-items/{id}",
    tag = "supplier-items",
    params(("id" = Uuid, Path, description = "Supplier item id")),
    request_body = SupplierItemInput,
    responses(
        (status = 200, description = "Association updated", body = supplier_item::Model),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_supplier_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<SupplierItemInput>,
) -> Result<Json<supplier_item::Model>, ServiceError> {
    Ok(Json(state.services.supplier_items.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/supplier-items/{id}",
    tag = "supplier-items",
    params(("id" = Uuid, Path, description = "Supplier item id")),
    responses(
        (status = 200, description = "Association removed", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_supplier_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.supplier_items.delete(id).await?;
    Ok(Json(MessageResponse::new("Supplier item deleted successfully")))
}
