//! sea-orm entities. Identifiers reference other tables by value only; existence
//! is checked by the services before every write.

pub mod branch;
pub mod brand;
pub mod currency;
pub mod department;
pub mod gallery_image;
pub mod item;
pub mod item_category;
pub mod order;
pub mod order_line;
pub mod packaging;
pub mod recipe_expert;
pub mod role;
pub mod section;
pub mod supplier;
pub mod supplier_item;
pub mod tax;
pub mod unit;
pub mod user;
pub mod wastage;

pub use order::OrderStatus;
pub use unit::{BaseUnit, BASE_UNIT_ERROR};
