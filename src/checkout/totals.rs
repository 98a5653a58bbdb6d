//! Checkout Totals

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::cart::CartLineItem;

/// Pricing rules applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPolicy {
    /// Item totals strictly above this ship free
    pub free_shipping_threshold: Decimal,

    /// Shipping charged at or below the threshold
    pub flat_shipping: Decimal,

    /// Tax rate applied to the items total
    pub tax_rate: Decimal,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(5000),
            flat_shipping: Decimal::from(100),
            tax_rate: Decimal::new(18, 2),
        }
    }
}

/// Totals derived from cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    /// `Σ unit_price * quantity`
    pub items_total: Decimal,

    /// Shipping charge
    pub shipping: Decimal,

    /// Tax, rounded to 2 dp half away from zero
    pub tax: Decimal,

    /// `items_total + shipping + tax`
    pub grand_total: Decimal,
}

/// Compute totals under the default [`CheckoutPolicy`].
pub fn compute_totals(items: &[CartLineItem]) -> CheckoutTotals {
    compute_totals_with(items, &CheckoutPolicy::default())
}

/// Compute totals under `policy`.
///
/// An empty cart is all zeros; shipping is only charged when there is
/// something to ship.
pub fn compute_totals_with(items: &[CartLineItem], policy: &CheckoutPolicy) -> CheckoutTotals {
    if items.is_empty() {
        return CheckoutTotals::default();
    }

    let items_total = items
        .iter()
        .map(CartLineItem::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add);

    let shipping = if items_total > policy.free_shipping_threshold {
        Decimal::ZERO
    } else {
        policy.flat_shipping
    };

    let tax = items_total
        .saturating_mul(policy.tax_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    CheckoutTotals {
        items_total,
        shipping,
        tax,
        grand_total: items_total.saturating_add(shipping).saturating_add(tax),
    }
}
