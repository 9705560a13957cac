use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";
pub const SWAGGER_UI_PATH: &str = "/swagger-ui";

/// Registers the `Bearer` JWT scheme referenced by the secured paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Back-office API",
        version = "1.0.0",
        description = r#"
Back-office API for restaurants and shops: the item catalog with multi-level
packaging and VAT pricing, supplier associations, purchase orders, wastage,
recipes and an image gallery.

## Authentication

Every endpoint except `/api/auth/login` and `/health` needs a bearer token:

```
Authorization: Bearer <jwt>
```

## Rate Limiting

Responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
`X-RateLimit-Reset`. A request over the limit gets `429` with `Retry-After`.

## Errors

Failures share one body: `{"error": "...", "code": "...", "requestId": "...", "timestamp": "..."}`.
"#
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "items", description = "Catalog items, pricing and supplier selections"),
        (name = "packaging", description = "Standalone packaging hierarchies"),
        (name = "supplier-items", description = "Supplier to item associations"),
        (name = "suppliers", description = "Suppliers"),
        (name = "categories", description = "Categories and sub-categories"),
        (name = "units", description = "Units of measure"),
        (name = "taxes", description = "VAT rates"),
        (name = "branches", description = "Branches"),
        (name = "brands", description = "Brands"),
        (name = "currencies", description = "Currencies"),
        (name = "departments", description = "Departments"),
        (name = "sections", description = "Sections"),
        (name = "orders", description = "Purchase orders"),
        (name = "wastage", description = "Wastage records"),
        (name = "recipes", description = "Recipe experts"),
        (name = "gallery", description = "Image gallery"),
        (name = "roles", description = "Custom roles (master admin)"),
        (name = "users", description = "User accounts (master admin)"),
        (name = "auth", description = "Login and current user"),
        (name = "health", description = "Liveness")
    ),
    paths(
        crate::health_check,
        handlers::auth::login,
        handlers::auth::me,
        handlers::items::list_items,
        handlers::items::get_item,
        handlers::items::create_item,
        handlers::items::update_item,
        handlers::items::delete_item,
        handlers::items::item_pricing,
        handlers::items::get_item_suppliers,
        handlers::items::replace_item_suppliers,
        handlers::packaging::list_packaging,
        handlers::packaging::get_packaging,
        handlers::packaging::create_packaging,
        handlers::packaging::update_packaging,
        handlers::packaging::delete_packaging,
        handlers::packaging::packaging_hierarchy,
        handlers::supplier_items::list_supplier_items,
        handlers::supplier_items::get_supplier_item,
        handlers::supplier_items::create_supplier_item,
        handlers::supplier_items::update_supplier_item,
        handlers::supplier_items::delete_supplier_item,
        handlers::suppliers::list_suppliers,
        handlers::suppliers::get_supplier,
        handlers::suppliers::create_supplier,
        handlers::suppliers::update_supplier,
        handlers::suppliers::delete_supplier,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::categories::list_sub_categories,
        handlers::categories::get_sub_category,
        handlers::categories::create_sub_category,
        handlers::categories::update_sub_category,
        handlers::categories::delete_sub_category,
        handlers::units::list_units,
        handlers::units::get_unit,
        handlers::units::create_unit,
        handlers::units::update_unit,
        handlers::units::delete_unit,
        handlers::taxes::list_taxes,
        handlers::taxes::get_tax,
        handlers::taxes::create_tax,
        handlers::taxes::update_tax,
        handlers::taxes::delete_tax,
        handlers::branches::list_branches,
        handlers::branches::get_branch,
        handlers::branches::create_branch,
        handlers::branches::update_branch,
        handlers::branches::delete_branch,
        handlers::brands::list_brands,
        handlers::brands::get_brand,
        handlers::brands::create_brand,
        handlers::brands::update_brand,
        handlers::brands::delete_brand,
        handlers::currencies::list_currencies,
        handlers::currencies::get_currency,
        handlers::currencies::create_currency,
        handlers::currencies::update_currency,
        handlers::currencies::delete_currency,
        handlers::departments::list_departments,
        handlers::departments::get_department,
        handlers::departments::create_department,
        handlers::departments::update_department,
        handlers::departments::delete_department,
        handlers::sections::list_sections,
        handlers::sections::get_section,
        handlers::sections::create_section,
        handlers::sections::update_section,
        handlers::sections::delete_section,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::create_order,
        handlers::orders::update_order,
        handlers::orders::update_order_status,
        handlers::orders::delete_order,
        handlers::wastage::list_wastage,
        handlers::wastage::get_wastage,
        handlers::wastage::create_wastage,
        handlers::wastage::update_wastage,
        handlers::wastage::delete_wastage,
        handlers::recipes::list_recipes,
        handlers::recipes::get_recipe,
        handlers::recipes::create_recipe,
        handlers::recipes::update_recipe,
        handlers::recipes::delete_recipe,
        handlers::recipes::recipe_cost,
        handlers::gallery::list_images,
        handlers::gallery::get_image,
        handlers::gallery::upload_image,
        handlers::gallery::update_image,
        handlers::gallery::delete_image,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::create_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        handlers::common::MessageResponse,
        handlers::common::PaginationMeta,
        crate::HealthStatus,
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new(SWAGGER_UI_PATH)
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH).try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_resources_and_bearer_scheme() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Back-office API"));
        assert!(json.contains("/api/items/{id}/pricing"));
        assert!(json.contains("/api/packaging/item/{itemId}/hierarchy"));
        assert!(json.contains("\"Bearer\""));
    }
}
