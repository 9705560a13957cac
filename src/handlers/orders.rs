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
use crate::auth::AuthUser;
use crate::entities::order;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;
use crate::services::orders::{
    parse_status, OrderFilter, OrderInput, OrderStatusUpdate, OrderWithLines,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderQuery {
    /// `draft`, `submitted`, `received` or `cancelled`
    pub status: Option<String>,
    pub branch: Option<Uuid>,
    pub supplier: Option<Uuid>,
}

impl TryFrom<OrderQuery> for OrderFilter {
    type Error = ServiceError;

    fn try_from(query: OrderQuery) -> Result<Self, Self::Error> {
        let status = query
            .status
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_status(&raw))
            .transpose()?;
        Ok(Self {
            status,
            branch: query.branch,
            supplier: query.supplier,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "orders",
    params(OrderQuery, PaginationParams),
    responses(
        (status = 200, description = "Orders, newest first", body = PaginatedResponse<order::Model>),
        (status = 400, description = "Unknown status filter", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<order::Model>>, ServiceError> {
    let filter = OrderFilter::try_from(query)?;
    Ok(Json(state.services.orders.list(filter, page.into()).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines", body = OrderWithLines),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithLines>, ServiceError> {
    Ok(Json(state.services.orders.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "orders",
    request_body = OrderInput,
    responses(
        (status = 201, description = "Draft order created", body = OrderWithLines),
        (status = 400, description = "Missing fields or unknown references", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<OrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .orders
        .create(input, Some(user.user_id))
        .await?;
    info!(order_id = %created.order.id, order_number = %created.order.order_number, "order created via api");
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderInput,
    responses(
        (status = 200, description = "Order updated", body = OrderWithLines),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Only draft orders can be modified", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<OrderInput>,
) -> Result<Json<OrderWithLines>, ServiceError> {
    Ok(Json(state.services.orders.update(id, input).await?))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = order::Model),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(update): AppJson<OrderStatusUpdate>,
) -> Result<Json<order::Model>, ServiceError> {
    Ok(Json(state.services.orders.update_status(id, update).await?))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = MessageResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Only draft or cancelled orders can be deleted", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.orders.delete(id).await?;
    Ok(Json(MessageResponse::new("Order deleted successfully")))
}
