use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, AppJson, PaginatedResponse, PaginationParams};
use crate::entities::item;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::items::{ItemDeletion, ItemDetail, ItemFilter, ItemInput, ItemPricing};
use crate::services::supplier_items::{SelectionsReplaced, SupplierSelections};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ItemQuery {
    pub category: Option<Uuid>,
    pub sub_category: Option<Uuid>,
    pub branch: Option<Uuid>,
    pub brand: Option<Uuid>,
    /// Matches English name, local name or item code
    pub search: Option<String>,
    pub active: Option<bool>,
}

impl From<ItemQuery> for ItemFilter {
    fn from(query: ItemQuery) -> Self {
        Self {
            category: query.category,
            sub_category: query.sub_category,
            branch: query.branch,
            brand: query.brand,
            search: query.search,
            active: query.active,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/items",
    tag = "items",
    params(ItemQuery, PaginationParams),
    responses(
        (status = 200, description = "Items", body = PaginatedResponse<item::Model>),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<item::Model>>, ServiceError> {
    let items = state
        .services
        .items
        .list(filter.into(), page.into())
        .await?;
    Ok(Json(items.into()))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "items",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item with its references populated", body = ItemDetail),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemDetail>, ServiceError> {
    Ok(Json(state.services.items.get_detail(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "items",
    request_body = ItemInput,
    responses(
        (status = 201, description = "Item created", body = item::Model),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_item(
    State(state): State<AppState>,
    AppJson(input): AppJson<ItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.items.create(input).await?;
    info!(item_id = %created.id, item_code = %created.item_code, "item created via api");
    Ok(created_response(created))
}

/// `PUT` and `PATCH` both merge the provided fields.
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    tag = "items",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = ItemInput,
    responses(
        (status = 200, description = "Item updated", body = item::Model),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<ItemInput>,
) -> Result<Json<item::Model>, ServiceError> {
    Ok(Json(state.services.items.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "items",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item, its packaging and supplier links removed", body = ItemDeletion),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemDeletion>, ServiceError> {
    Ok(Json(state.services.items.delete(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}/pricing",
    tag = "items",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Per-unit and per-package prices with VAT", body = ItemPricing),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn item_pricing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemPricing>, ServiceError> {
    Ok(Json(state.services.items.pricing(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}/suppliers",
    tag = "items",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Active supplier selections by slot key", body = SupplierSelections),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_item_suppliers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SupplierSelections>, ServiceError> {
    Ok(Json(state.services.supplier_items.selections(id).await?))
}

/// Replaces every active supplier association of the item in one transaction.
#[utoipa::path(
    put,
    path = "/api/items/{id}/suppliers",
    tag = "items",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = SupplierSelections,
    responses(
        (status = 200, description = "Selections replaced", body = SelectionsReplaced),
        (status = 400, description = "Unknown slot, supplier or packaging", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn replace_item_suppliers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(selections): AppJson<SupplierSelections>,
) -> Result<Json<SelectionsReplaced>, ServiceError> {
    Ok(Json(
        state
            .services
            .supplier_items
            .replace_selections(id, selections)
            .await?,
    ))
}
