//! Top-level categories under `/api/categories` and their children under
//! `/api/sub-categories`. Both live in the same table.

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
use crate::entities::item_category;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::categories::CategoryInput;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubCategoryQuery {
    /// Parent category id
    pub category: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    params(CategoryQuery, PaginationParams),
    responses((status = 200, description = "Top-level categories", body = PaginatedResponse<item_category::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<item_category::Model>>, ServiceError> {
    let rows = state
        .services
        .categories
        .list_categories(query.active, page.into())
        .await?;
    Ok(Json(rows.into()))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = item_category::Model),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<item_category::Model>, ServiceError> {
    Ok(Json(state.services.categories.get_category(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = item_category::Model),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.categories.create_category(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = item_category::Model),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<Json<item_category::Model>, ServiceError> {
    Ok(Json(state.services.categories.update_category(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Sub-categories or items still reference it", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.categories.delete_category(id).await?;
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/sub-categories",
    tag = "categories",
    params(SubCategoryQuery, PaginationParams),
    responses((status = 200, description = "Sub-categories", body = PaginatedResponse<item_category::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_sub_categories(
    State(state): State<AppState>,
    Query(query): Query<SubCategoryQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<item_category::Model>>, ServiceError> {
    let rows = state
        .services
        .categories
        .list_sub_categories(query.category, page.into())
        .await?;
    Ok(Json(rows.into()))
}

#[utoipa::path(
    get,
    path = "/api/sub-categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Sub-category id")),
    responses(
        (status = 200, description = "Sub-category", body = item_category::Model),
        (status = 404, description = "Sub-category not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_sub_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<item_category::Model>, ServiceError> {
    Ok(Json(state.services.categories.get_sub_category(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/sub-categories",
    tag = "categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Sub-category created", body = item_category::Model),
        (status = 400, description = "Missing or invalid parentId", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_sub_category(
    State(state): State<AppState>,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.categories.create_sub_category(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/sub-categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Sub-category id")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Sub-category updated", body = item_category::Model),
        (status = 404, description = "Sub-category not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_sub_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<Json<item_category::Model>, ServiceError> {
    Ok(Json(
        state
            .services
            .categories
            .update_sub_category(id, input)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/sub-categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Sub-category id")),
    responses(
        (status = 200, description = "Sub-category deleted", body = MessageResponse),
        (status = 409, description = "Items still reference it", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_sub_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.categories.delete_sub_category(id).await?;
    Ok(Json(MessageResponse::new("Sub-category deleted successfully")))
}
