use rust_decimal::Decimal;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::pricing::{self, PriceBreakdown, PricingContext};
use super::slot::SupplierSlot;

/// Packaging level stored inline on an item (`basePackaging` / `packPackaging`).
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedPackaging {
    pub amount: Option<Decimal>,
    pub unit: Option<String>,
    pub pack_size: Option<Decimal>,
    pub pack_unit: Option<String>,
}

impl EmbeddedPackaging {
    pub fn base_units(&self) -> Decimal {
        pricing::base_units(self.amount, self.pack_size)
    }

    /// An entry with no amount carries no packaging information.
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotPricing {
    pub slot: String,
    pub packaging: EmbeddedPackaging,
    pub base_units: Decimal,
    pub multiplier: Decimal,
    pub total_units: Decimal,
    pub pricing: PriceBreakdown,
}

/// Prices the item's inline slots. `pack` nests under `base` when both exist.
pub fn price_embedded_slots(
    base: Option<&EmbeddedPackaging>,
    pack: Option<&EmbeddedPackaging>,
    ctx: &PricingContext,
) -> Vec<SlotPricing> {
    let base = base.filter(|p| !p.is_empty());
    let pack = pack.filter(|p| !p.is_empty());
    let mut out = Vec::with_capacity(2);

    let base_multiplier = Decimal::ONE;
    if let Some(base) = base {
        out.push(slot_pricing(SupplierSlot::Base, base, base_multiplier, ctx));
    }
    if let Some(pack) = pack {
        let multiplier = base.map(|b| b.base_units()).unwrap_or(Decimal::ONE);
        out.push(slot_pricing(SupplierSlot::Pack, pack, multiplier, ctx));
    }
    out
}

fn slot_pricing(
    slot: SupplierSlot,
    packaging: &EmbeddedPackaging,
    multiplier: Decimal,
    ctx: &PricingContext,
) -> SlotPricing {
    let base_units = packaging.base_units();
    let total_units = base_units.checked_mul(multiplier).unwrap_or(Decimal::ZERO);
    SlotPricing {
        slot: slot.key(),
        packaging: packaging.clone(),
        base_units,
        multiplier,
        total_units,
        pricing: ctx.quote(total_units).rounded(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(amount: Decimal, pack_size: Option<Decimal>) -> EmbeddedPackaging {
        EmbeddedPackaging {
            amount: Some(amount),
            unit: Some("kg".into()),
            pack_size,
            pack_unit: None,
        }
    }

    #[test]
    fn pack_nests_under_base() {
        let ctx = PricingContext {
            unit_price: Some(dec!(2)),
            tax_rate: None,
            price_includes_vat: false,
        };
        let base = level(dec!(5), Some(dec!(2)));
        let pack = level(dec!(3), None);

        let slots = price_embedded_slots(Some(&base), Some(&pack), &ctx);

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].slot, "base");
        assert_eq!(slots[0].total_units, dec!(10));
        assert_eq!(slots[1].slot, "pack");
        assert_eq!(slots[1].total_units, dec!(30));
        assert_eq!(slots[1].pricing.price, dec!(60));
        assert_eq!(slots[1].pricing.vat_amount, Decimal::ZERO);
    }

    #[test]
    fn lone_pack_is_a_root() {
        let ctx = PricingContext::default();
        let pack = level(dec!(4), None);
        let slots = price_embedded_slots(None, Some(&pack), &ctx);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].multiplier, Decimal::ONE);
        assert_eq!(slots[0].pricing.price, Decimal::ZERO);
    }

    #[test]
    fn empty_levels_are_skipped() {
        let ctx = PricingContext::default();
        let empty = EmbeddedPackaging::default();
        assert!(price_embedded_slots(Some(&empty), Some(&empty), &ctx).is_empty());
    }
}
