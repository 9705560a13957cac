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
use crate::entities::recipe_expert;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::recipes::{RecipeCost, RecipeInput};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeQuery {
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/recipe-experts",
    tag = "recipes",
    params(RecipeQuery, PaginationParams),
    responses((status = 200, description = "Recipes", body = PaginatedResponse<recipe_expert::Model>)),
    security(("Bearer" = []))
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<recipe_expert::Model>>, ServiceError> {
    Ok(Json(state.services.recipes.list(query.search, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/recipe-experts/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe", body = recipe_expert::Model),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<recipe_expert::Model>, ServiceError> {
    Ok(Json(state.services.recipes.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/recipe-experts",
    tag = "recipes",
    request_body = RecipeInput,
    responses(
        (status = 201, description = "Recipe created", body = recipe_expert::Model),
        (status = 400, description = "Missing name or unknown ingredient item", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_recipe(
    State(state): State<AppState>,
    AppJson(input): AppJson<RecipeInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.recipes.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/recipe-experts/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    request_body = RecipeInput,
    responses(
        (status = 200, description = "Recipe updated", body = recipe_expert::Model),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<RecipeInput>,
) -> Result<Json<recipe_expert::Model>, ServiceError> {
    Ok(Json(state.services.recipes.update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/recipe-experts/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe deleted", body = MessageResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.recipes.delete(id).await?;
    Ok(Json(MessageResponse::new("Recipe deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/recipe-experts/{id}/cost",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Ingredient cost at current item prices", body = RecipeCost),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn recipe_cost(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeCost>, ServiceError> {
    Ok(Json(state.services.recipes.cost(id).await?))
}
