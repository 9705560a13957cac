//! Back-office API library
//!
//! Item catalog with packaging hierarchies and VAT pricing, supplier
//! associations, purchase orders, wastage, recipes and an image gallery,
//! served over axum with role-based access control.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod packaging;
pub mod rate_limiter;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthConfig, AuthRouterExt, AuthService, MASTER_ADMIN};
use crate::events::EventSender;
use crate::storage::ImageStore;

/// Headroom for multipart framing on top of the largest accepted image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
    pub image_store: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: EventSender,
        image_store: Arc<dyn ImageStore>,
    ) -> Self {
        let services =
            handlers::AppServices::new(db.clone(), event_sender.clone(), image_store.clone(), &config);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));
        Self {
            db,
            config,
            event_sender,
            services,
            auth,
            image_store,
        }
    }
}

/// All `/api` routes with their permission gates.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    use handlers::*;

    let auth_public = Router::new().route("/auth/login", post(auth::login));
    let auth_me = Router::new().route("/auth/me", get(auth::me)).with_auth();

    // Items and their packaging
    let items_read = Router::new()
        .route("/items", get(items::list_items))
        .route("/items/{id}", get(items::get_item))
        .route("/items/{id}/pricing", get(items::item_pricing))
        .route("/items/{id}/suppliers", get(items::get_item_suppliers))
        .route("/packaging", get(packaging::list_packaging))
        .route("/packaging/{id}", get(packaging::get_packaging))
        .route(
            "/packaging/item/{itemId}/hierarchy",
            get(packaging::packaging_hierarchy),
        )
        .with_permission(perm::ITEMS_READ);

    let items_write = Router::new()
        .route("/items", post(items::create_item))
        .route(
            "/items/{id}",
            put(items::update_item).patch(items::update_item),
        )
        .route("/items/{id}/suppliers", put(items::replace_item_suppliers))
        .route("/packaging", post(packaging::create_packaging))
        .route(
            "/packaging/{id}",
            put(packaging::update_packaging)
                .patch(packaging::update_packaging)
                .delete(packaging::delete_packaging),
        )
        .with_permission(perm::ITEMS_WRITE);

    let items_delete = Router::new()
        .route("/items/{id}", axum::routing::delete(items::delete_item))
        .with_permission(perm::ITEMS_DELETE);

    // Suppliers and supplier associations
    let suppliers_read = Router::new()
        .route("/suppliers", get(suppliers::list_suppliers))
        .route("/suppliers/{id}", get(suppliers::get_supplier))
        .route("/supplier-items", get(supplier_items::list_supplier_items))
        .route("/supplier-items/{id}", get(supplier_items::get_supplier_item))
        .with_permission(perm::SUPPLIERS_READ);

    let suppliers_write = Router::new()
        .route("/suppliers", post(suppliers::create_supplier))
        .route(
            "/suppliers/{id}",
            put(suppliers::update_supplier)
                .patch(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route("/supplier-items", post(supplier_items::create_supplier_item))
        .route(
            "/supplier-items/{id}",
            put(supplier_items::update_supplier_item)
                .patch(supplier_items::update_supplier_item)
                .delete(supplier_items::delete_supplier_item),
        )
        .with_permission(perm::SUPPLIERS_WRITE);

    // Reference data
    let catalog_read = Router::new()
        .route("/categories", get(categories::list_categories))
        .route("/categories/{id}", get(categories::get_category))
        .route("/sub-categories", get(categories::list_sub_categories))
        .route("/sub-categories/{id}", get(categories::get_sub_category))
        .route("/units", get(units::list_units))
        .route("/units/{id}", get(units::get_unit))
        .route("/taxes", get(taxes::list_taxes))
        .route("/taxes/{id}", get(taxes::get_tax))
        .route("/branches", get(branches::list_branches))
        .route("/branches/{id}", get(branches::get_branch))
        .route("/brands", get(brands::list_brands))
        .route("/brands/{id}", get(brands::get_brand))
        .route("/currencies", get(currencies::list_currencies))
        .route("/currencies/{id}", get(currencies::get_currency))
        .route("/departments", get(departments::list_departments))
        .route("/departments/{id}", get(departments::get_department))
        .route("/sections", get(sections::list_sections))
        .route("/sections/{id}", get(sections::get_section))
        .route("/recipe-experts", get(recipes::list_recipes))
        .route("/recipe-experts/{id}", get(recipes::get_recipe))
        .route("/recipe-experts/{id}/cost", get(recipes::recipe_cost))
        .with_permission(perm::CATALOG_READ);

    let catalog_write = Router::new()
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/{id}",
            put(categories::update_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/sub-categories", post(categories::create_sub_category))
        .route(
            "/sub-categories/{id}",
            put(categories::update_sub_category)
                .patch(categories::update_sub_category)
                .delete(categories::delete_sub_category),
        )
        .route("/units", post(units::create_unit))
        .route(
            "/units/{id}",
            put(units::update_unit)
                .patch(units::update_unit)
                .delete(units::delete_unit),
        )
        .route("/taxes", post(taxes::create_tax))
        .route(
            "/taxes/{id}",
            put(taxes::update_tax)
                .patch(taxes::update_tax)
                .delete(taxes::delete_tax),
        )
        .route("/branches", post(branches::create_branch))
        .route(
            "/branches/{id}",
            put(branches::update_branch)
                .patch(branches::update_branch)
                .delete(branches::delete_branch),
        )
        .route("/brands", post(brands::create_brand))
        .route(
            "/brands/{id}",
            put(brands::update_brand)
                .patch(brands::update_brand)
                .delete(brands::delete_brand),
        )
        .route("/currencies", post(currencies::create_currency))
        .route(
            "/currencies/{id}",
            put(currencies::update_currency)
                .patch(currencies::update_currency)
                .delete(currencies::delete_currency),
        )
        .route("/departments", post(departments::create_department))
        .route(
            "/departments/{id}",
            put(departments::update_department)
                .patch(departments::update_department)
                .delete(departments::delete_department),
        )
        .route("/sections", post(sections::create_section))
        .route(
            "/sections/{id}",
            put(sections::update_section)
                .patch(sections::update_section)
                .delete(sections::delete_section),
        )
        .route("/recipe-experts", post(recipes::create_recipe))
        .route(
            "/recipe-experts/{id}",
            put(recipes::update_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .with_permission(perm::CATALOG_WRITE);

    // Operations
    let orders_read = Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .with_permission(perm::ORDERS_READ);

    let orders_write = Router::new()
        .route("/orders", post(orders::create_order))
        .route(
            "/orders/{id}",
            put(orders::update_order)
                .patch(orders::update_order)
                .delete(orders::delete_order),
        )
        .route(
            "/orders/{id}/status",
            axum::routing::patch(orders::update_order_status),
        )
        .with_permission(perm::ORDERS_WRITE);

    let wastage_read = Router::new()
        .route("/wastage", get(wastage::list_wastage))
        .route("/wastage/{id}", get(wastage::get_wastage))
        .with_permission(perm::WASTAGE_READ);

    let wastage_write = Router::new()
        .route("/wastage", post(wastage::create_wastage))
        .route(
            "/wastage/{id}",
            put(wastage::update_wastage)
                .patch(wastage::update_wastage)
                .delete(wastage::delete_wastage),
        )
        .with_permission(perm::WASTAGE_WRITE);

    let gallery_read = Router::new()
        .route("/gallery", get(gallery::list_images))
        .route("/gallery/{id}", get(gallery::get_image))
        .with_permission(perm::GALLERY_READ);

    let gallery_write = Router::new()
        .route(
            "/gallery",
            post(gallery::upload_image)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD_BYTES)),
        )
        .route(
            "/gallery/{id}",
            put(gallery::update_image)
                .patch(gallery::update_image)
                .delete(gallery::delete_image),
        )
        .with_permission(perm::GALLERY_WRITE);

    // Account administration
    let admin = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/roles/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .patch(roles::update_role)
                .delete(roles::delete_role),
        )
        .with_role(MASTER_ADMIN);

    Router::new()
        .merge(auth_public)
        .merge(auth_me)
        .merge(items_read)
        .merge(items_write)
        .merge(items_delete)
        .merge(suppliers_read)
        .merge(suppliers_write)
        .merge(catalog_read)
        .merge(catalog_write)
        .merge(orders_read)
        .merge(orders_write)
        .merge(wastage_read)
        .merge(wastage_write)
        .merge(gallery_read)
        .merge(gallery_write)
        .merge(admin)
}

/// Router with every route, docs, auth injection, request ids, HTTP tracing and
/// rate limiting. Transport concerns (CORS, compression, timeouts) are added
/// by the binary.
pub fn build_router(state: AppState, rate_limit: rate_limiter::RateLimitLayer) -> Router {
    let auth = state.auth.clone();
    let config = state.config.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(config.max_upload_bytes))
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(Extension(auth))
        .layer(tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .layer(rate_limit)
        .with_state(state)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    /// `healthy` or `unhealthy`
    pub status: String,
    pub database: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness plus a database ping.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and database reachable", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = HealthStatus)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let (status, database) = match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(err) => {
            ::tracing::warn!(error = %err, "health check database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let body = HealthStatus {
        status: database.to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    (status, Json(body))
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::openapi::*;
    pub use crate::rate_limiter::*;
    pub use crate::services::{Page, PageRequest};
    pub use crate::tracing::*;
    pub use crate::{build_router, AppState};
}
