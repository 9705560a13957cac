pub mod auth;
pub mod branches;
pub mod brands;
pub mod categories;
pub mod common;
pub mod currencies;
pub mod departments;
pub mod gallery;
pub mod items;
pub mod orders;
pub mod packaging;
pub mod recipes;
pub mod roles;
pub mod sections;
pub mod supplier_items;
pub mod suppliers;
pub mod taxes;
pub mod units;
pub mod users;
pub mod wastage;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services;
use crate::storage::ImageStore;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<services::items::ItemService>,
    pub packaging: Arc<services::packaging::PackagingService>,
    pub supplier_items: Arc<services::supplier_items::SupplierItemService>,
    pub suppliers: Arc<services::suppliers::SupplierService>,
    pub categories: Arc<services::categories::CategoryService>,
    pub units: Arc<services::units::UnitService>,
    pub taxes: Arc<services::taxes::TaxService>,
    pub branches: Arc<services::branches::BranchService>,
    pub brands: Arc<services::brands::BrandService>,
    pub currencies: Arc<services::currencies::CurrencyService>,
    pub departments: Arc<services::departments::DepartmentService>,
    pub sections: Arc<services::sections::SectionService>,
    pub orders: Arc<services::orders::OrderService>,
    pub wastage: Arc<services::wastage::WastageService>,
    pub recipes: Arc<services::recipes::RecipeService>,
    pub gallery: Arc<services::gallery::GalleryService>,
    pub roles: Arc<services::roles::RoleService>,
    pub users: Arc<services::users::UserService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        events: EventSender,
        images: Arc<dyn ImageStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            items: Arc::new(services::items::ItemService::new(
                db.clone(),
                events.clone(),
                images.clone(),
                config.item_code_max_attempts,
            )),
            packaging: Arc::new(services::packaging::PackagingService::new(
                db.clone(),
                events.clone(),
            )),
            supplier_items: Arc::new(services::supplier_items::SupplierItemService::new(
                db.clone(),
                events.clone(),
            )),
            suppliers: Arc::new(services::suppliers::SupplierService::new(db.clone())),
            categories: Arc::new(services::categories::CategoryService::new(db.clone())),
            units: Arc::new(services::units::UnitService::new(db.clone())),
            taxes: Arc::new(services::taxes::TaxService::new(db.clone())),
            branches: Arc::new(services::branches::BranchService::new(db.clone())),
            brands: Arc::new(services::brands::BrandService::new(db.clone())),
            currencies: Arc::new(services::currencies::CurrencyService::new(db.clone())),
            departments: Arc::new(services::departments::DepartmentService::new(db.clone())),
            sections: Arc::new(services::sections::SectionService::new(db.clone())),
            orders: Arc::new(services::orders::OrderService::new(db.clone(), events.clone())),
            wastage: Arc::new(services::wastage::WastageService::new(
                db.clone(),
                events.clone(),
            )),
            recipes: Arc::new(services::recipes::RecipeService::new(db.clone())),
            gallery: Arc::new(services::gallery::GalleryService::new(
                db.clone(),
                images,
                events,
                config.max_upload_bytes,
            )),
            roles: Arc::new(services::roles::RoleService::new(db.clone())),
            users: Arc::new(services::users::UserService::new(db)),
        }
    }
}
