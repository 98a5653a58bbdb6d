//! Stock
//!
//! Resolves the authoritative stock figure for a product and an optional
//! variant selector. Every view that shows stock (product card, product
//! detail, cart row) goes through [`resolve_stock`], so the thresholds below
//! are applied identically everywhere.
//!
//! Stock figures are advisory snapshots. Nothing here reserves or holds
//! units; the order service performs the only authoritative check, at
//! submission.

use serde::{Deserialize, Serialize};

use crate::{products::Product, variants::VariantSelection};

/// Below this many units stock is reported as [`StockLevel::Low`].
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Below this many units stock is reported as [`StockLevel::Medium`].
pub const HIGH_STOCK_THRESHOLD: u32 = 10;

/// Most units of one line a shopper may pick, regardless of stock.
pub const MAX_QUANTITY_PER_LINE: u32 = 10;

/// Coarse stock classification used for UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLevel {
    /// Nothing available; add-to-cart is disabled.
    Out,

    /// `1..5` units.
    Low,

    /// `5..10` units.
    Medium,

    /// Ten or more units.
    High,
}

impl StockLevel {
    /// Classify an available count.
    pub fn from_available(available: u32) -> Self {
        match available {
            0 => Self::Out,
            n if n < LOW_STOCK_THRESHOLD => Self::Low,
            n if n < HIGH_STOCK_THRESHOLD => Self::Medium,
            _ => Self::High,
        }
    }

    /// Wire name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Out => "OUT",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// How the supplied selector related to the product's variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectorMatch {
    /// Single-SKU product; any selector is ignored.
    NotApplicable,

    /// The selector named a known variant.
    Matched,

    /// The selector named no known variant (stale or invalid selection).
    Unmatched,

    /// Variation product with no selector; never purchasable.
    Missing,
}

/// Resolved availability for a product or one of its variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockStatus {
    /// Units available
    pub available: u32,

    /// Classification of `available`
    pub level: StockLevel,

    /// How the selector matched
    pub selector: SelectorMatch,
}

impl StockStatus {
    fn new(available: u32, selector: SelectorMatch) -> Self {
        Self {
            available,
            level: StockLevel::from_available(available),
            selector,
        }
    }

    /// Returns `true` if at least one unit is available.
    pub fn is_in_stock(&self) -> bool {
        self.available > 0
    }

    /// Upper bound of the quantity picker: `min(available, 10)`.
    pub fn max_quantity(&self) -> u32 {
        self.available.min(MAX_QUANTITY_PER_LINE)
    }

    /// Returns `true` if `quantity` is within `1..=max_quantity()`.
    pub fn allows(&self, quantity: u32) -> bool {
        (1..=self.max_quantity()).contains(&quantity)
    }
}

/// Resolve available stock for `product` under an optional variant selector.
///
/// - Single-SKU products report their root `count_in_stock`, whatever
///   selector is passed.
/// - Variation products report the stock of the exactly matching variant,
///   or zero when the selector matches nothing.
/// - Variation products without a selector always report zero; there is no
///   fallback to the first variant.
pub fn resolve_stock(product: &Product, selector: Option<&VariantSelection>) -> StockStatus {
    if !product.has_variations {
        return StockStatus::new(product.count_in_stock, SelectorMatch::NotApplicable);
    }

    match selector {
        None | Some(VariantSelection::None) => StockStatus::new(0, SelectorMatch::Missing),
        Some(selection) => match product.variant_stock(selection) {
            Some(available) => StockStatus::new(available, SelectorMatch::Matched),
            None => StockStatus::new(0, SelectorMatch::Unmatched),
        },
    }
}
