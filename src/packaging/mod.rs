//! Packaging domain: kinds, supplier slots, hierarchy arena and pricing.

pub mod chain;
pub mod embedded;
pub mod kind;
pub mod pricing;
pub mod slot;

pub use chain::{ChainError, HierarchyEntry, PackagingChain, PackagingNode};
pub use embedded::{price_embedded_slots, EmbeddedPackaging, SlotPricing};
pub use kind::{PackagingType, PACKAGING_TYPE_ERROR};
pub use pricing::{PriceBreakdown, PricingContext};
pub use slot::SupplierSlot;
