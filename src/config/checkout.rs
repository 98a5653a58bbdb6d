//! Checkout Config

use clap::Args;
use rust_decimal::Decimal;

use crate::checkout::CheckoutPolicy;

/// Pricing rules applied at checkout.
#[derive(Debug, Clone, Args)]
pub struct CheckoutConfig {
    /// Item totals strictly above this ship free
    #[arg(long, env = "FREE_SHIPPING_THRESHOLD", default_value = "5000")]
    pub free_shipping_threshold: Decimal,

    /// Flat shipping charge at or below the threshold
    #[arg(long, env = "FLAT_SHIPPING", default_value = "100")]
    pub flat_shipping: Decimal,

    /// Tax rate as a fraction (0.18 is 18%)
    #[arg(long, env = "TAX_RATE", default_value = "0.18")]
    pub tax_rate: Decimal,
}

impl From<&CheckoutConfig> for CheckoutPolicy {
    fn from(config: &CheckoutConfig) -> Self {
        Self {
            free_shipping_threshold: config.free_shipping_threshold,
            flat_shipping: config.flat_shipping,
            tax_rate: config.tax_rate,
        }
    }
}
