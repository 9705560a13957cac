//! Unit and price arithmetic for packaging levels.
//!
//! Every function degrades to zero when a required input is missing instead of
//! failing. Overflow and division by zero degrade the same way, so no input can
//! make a pricing request panic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const HUNDRED: Decimal = dec!(100);

/// Base units held by one packaging level: `pack_size × amount`, or `amount`
/// when there is no pack size.
pub fn base_units(amount: Option<Decimal>, pack_size: Option<Decimal>) -> Decimal {
    let Some(amount) = amount else {
        return Decimal::ZERO;
    };
    match pack_size {
        Some(size) => size.checked_mul(amount).unwrap_or(Decimal::ZERO),
        None => amount,
    }
}

/// Monetary price of `total_units` at `unit_price`.
pub fn price_for_units(unit_price: Option<Decimal>, total_units: Decimal) -> Decimal {
    unit_price
        .and_then(|price| price.checked_mul(total_units))
        .unwrap_or(Decimal::ZERO)
}

/// Price split into its VAT components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub price: Decimal,
    pub vat_amount: Decimal,
    #[serde(rename = "priceExclVAT")]
    pub price_excl_vat: Decimal,
    #[serde(rename = "priceInclVAT")]
    pub price_incl_vat: Decimal,
}

impl PriceBreakdown {
    pub fn zero() -> Self {
        Self {
            price: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            price_excl_vat: Decimal::ZERO,
            price_incl_vat: Decimal::ZERO,
        }
    }

    /// Display copy rounded to two decimal places.
    pub fn rounded(&self) -> Self {
        Self {
            price: self.price.round_dp(2),
            vat_amount: self.vat_amount.round_dp(2),
            price_excl_vat: self.price_excl_vat.round_dp(2),
            price_incl_vat: self.price_incl_vat.round_dp(2),
        }
    }
}

/// VAT amount contained in (inclusive) or added to (exclusive) `price`.
pub fn vat_amount(price: Decimal, rate: Option<Decimal>, includes_vat: bool) -> Decimal {
    let Some(rate) = rate else {
        return Decimal::ZERO;
    };
    let taxed = price.checked_mul(rate);
    let divisor = if includes_vat {
        HUNDRED.checked_add(rate)
    } else {
        Some(HUNDRED)
    };
    taxed
        .zip(divisor)
        .and_then(|(taxed, divisor)| taxed.checked_div(divisor))
        .unwrap_or(Decimal::ZERO)
}

/// Net price before VAT. Exclusive prices are already net.
pub fn price_excl_vat(price: Decimal, rate: Option<Decimal>, includes_vat: bool) -> Decimal {
    let Some(rate) = rate else {
        return Decimal::ZERO;
    };
    if !includes_vat {
        return price;
    }
    rate.checked_div(HUNDRED)
        .and_then(|fraction| Decimal::ONE.checked_add(fraction))
        .and_then(|factor| price.checked_div(factor))
        .unwrap_or(Decimal::ZERO)
}

/// Full VAT decomposition of `price`.
pub fn vat_breakdown(price: Decimal, rate: Option<Decimal>, includes_vat: bool) -> PriceBreakdown {
    if rate.is_none() {
        return PriceBreakdown {
            price,
            ..PriceBreakdown::zero()
        };
    }
    let vat = vat_amount(price, rate, includes_vat);
    let net = price_excl_vat(price, rate, includes_vat);
    PriceBreakdown {
        price,
        vat_amount: vat,
        price_excl_vat: net,
        price_incl_vat: net.checked_add(vat).unwrap_or(Decimal::ZERO),
    }
}

/// Item-level inputs shared by every packaging level of one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingContext {
    pub unit_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub price_includes_vat: bool,
}

impl PricingContext {
    pub fn quote(&self, total_units: Decimal) -> PriceBreakdown {
        let price = price_for_units(self.unit_price, total_units);
        vat_breakdown(price, self.tax_rate, self.price_includes_vat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn base_units_uses_pack_size_when_present() {
        assert_eq!(base_units(Some(dec!(5)), Some(dec!(2))), dec!(10));
        assert_eq!(base_units(Some(dec!(3)), None), dec!(3));
        assert_eq!(base_units(None, Some(dec!(2))), Decimal::ZERO);
    }

    #[test]
    fn missing_inputs_degrade_to_zero() {
        assert_eq!(price_for_units(None, dec!(30)), Decimal::ZERO);
        assert_eq!(vat_amount(dec!(100), None, true), Decimal::ZERO);
        assert_eq!(price_excl_vat(dec!(100), None, false), Decimal::ZERO);

        let breakdown = vat_breakdown(dec!(50), None, true);
        assert_eq!(breakdown.price, dec!(50));
        assert_eq!(breakdown.vat_amount, Decimal::ZERO);
        assert_eq!(breakdown.price_excl_vat, Decimal::ZERO);
    }

    #[test]
    fn inclusive_price_splits_out_vat() {
        let breakdown = vat_breakdown(dec!(115), Some(dec!(15)), true);
        assert_eq!(breakdown.vat_amount, dec!(15));
        assert_eq!(breakdown.price_excl_vat, dec!(100));
        assert_eq!(breakdown.price_incl_vat, dec!(115));
    }

    #[test]
    fn exclusive_price_adds_vat() {
        let breakdown = vat_breakdown(dec!(200), Some(dec!(5)), false);
        assert_eq!(breakdown.vat_amount, dec!(10));
        assert_eq!(breakdown.price_excl_vat, dec!(200));
        assert_eq!(breakdown.price_incl_vat, dec!(210));
    }

    #[test]
    fn degenerate_rate_does_not_panic() {
        assert_eq!(vat_amount(dec!(10), Some(dec!(-100)), true), Decimal::ZERO);
        assert_eq!(price_excl_vat(dec!(10), Some(dec!(-100)), true), Decimal::ZERO);
    }

    #[test]
    fn rounding_is_display_only() {
        let breakdown = vat_breakdown(dec!(10), Some(dec!(15)), true);
        assert_ne!(breakdown.vat_amount, breakdown.vat_amount.round_dp(2));
        assert_eq!(breakdown.rounded().vat_amount, dec!(1.30));
    }

    #[test]
    fn context_quotes_total_units() {
        let ctx = PricingContext {
            unit_price: Some(dec!(1.5)),
            tax_rate: Some(dec!(10)),
            price_includes_vat: false,
        };
        let quote = ctx.quote(dec!(30));
        assert_eq!(quote.price, dec!(45));
        assert_eq!(quote.vat_amount, dec!(4.5));
    }

    fn money() -> impl Strategy<Value = Decimal> {
        (0u64..10_000_000).prop_map(|cents| Decimal::new(cents as i64, 2))
    }

    fn rate() -> impl Strategy<Value = Decimal> {
        (0u32..=100).prop_map(Decimal::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn inclusive_net_price_round_trips(price in money(), rate in rate()) {
            let net = price_excl_vat(price, Some(rate), true);
            let rebuilt = net * (Decimal::ONE + rate / HUNDRED);
            prop_assert!((rebuilt - price).abs() < dec!(0.01), "{} vs {}", rebuilt, price);
        }

        #[test]
        fn exclusive_vat_is_exact(price in money(), rate in rate()) {
            prop_assert_eq!(vat_amount(price, Some(rate), false), price * rate / HUNDRED);
            prop_assert_eq!(price_excl_vat(price, Some(rate), false), price);
        }

        #[test]
        fn inclusive_components_sum_to_price(price in money(), rate in rate()) {
            let breakdown = vat_breakdown(price, Some(rate), true);
            let sum = breakdown.price_excl_vat + breakdown.vat_amount;
            prop_assert!((sum - price).abs() < dec!(0.01));
        }
    }
}
