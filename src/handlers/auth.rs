use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::AppJson;
use crate::auth::{AuthError, AuthUser, LoginRequest, LoginResponse};
use crate::entities::user;
use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::AppState;

/// The caller's account and the permissions its role currently grants.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user: user::Model,
    pub permissions: Vec<String>,
}

/// Exchange a username or email plus password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let response = state.auth.login(&request.login, &request.password).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<CurrentUser>, ServiceError> {
    let user = state.services.users.get(caller.user_id).await?;
    Ok(Json(CurrentUser {
        user,
        permissions: caller.permissions,
    }))
}
