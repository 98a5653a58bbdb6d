//! Variants
//!
//! A variant is a concrete purchasable configuration of a product. The
//! selection a shopper makes is modelled as a sum type so that cart item
//! identity and stock lookups match exhaustively on its shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::products::{Product, ProductId};

/// Footwear size pair, the key of a footwear variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootwearSize {
    /// UK size (string typed to allow half sizes)
    pub uk_size: String,

    /// US size (string typed to allow half sizes)
    pub us_size: String,
}

impl FootwearSize {
    /// Create a new footwear size pair.
    pub fn new(uk_size: impl Into<String>, us_size: impl Into<String>) -> Self {
        Self {
            uk_size: uk_size.into(),
            us_size: us_size.into(),
        }
    }
}

/// Smartphone specification, the key of a phone variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSpec {
    /// Model name
    pub model: String,

    /// Storage capacity, e.g. `128GB`
    pub storage: String,

    /// Memory, e.g. `8GB`
    pub ram: String,
}

impl PhoneSpec {
    /// Create a new phone specification.
    pub fn new(
        model: impl Into<String>,
        storage: impl Into<String>,
        ram: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            storage: storage.into(),
            ram: ram.into(),
        }
    }
}

/// The variant a shopper selected for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VariantSelection {
    /// The product is sold as a single SKU, or nothing was selected.
    #[default]
    None,

    /// A footwear size pair.
    Footwear(FootwearSize),

    /// A smartphone storage/RAM combination.
    Phone(PhoneSpec),
}

impl VariantSelection {
    /// Select a footwear size.
    pub fn footwear(uk_size: impl Into<String>, us_size: impl Into<String>) -> Self {
        Self::Footwear(FootwearSize::new(uk_size, us_size))
    }

    /// Select a phone specification.
    pub fn phone(
        model: impl Into<String>,
        storage: impl Into<String>,
        ram: impl Into<String>,
    ) -> Self {
        Self::Phone(PhoneSpec::new(model, storage, ram))
    }

    /// Returns `true` when no variant was selected.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for VariantSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("-"),
            Self::Footwear(size) => write!(f, "UK {} / US {}", size.uk_size, size.us_size),
            Self::Phone(spec) => write!(f, "{} {} / {} RAM", spec.model, spec.storage, spec.ram),
        }
    }
}

/// Identity of a cart line: the product plus the exact variant.
///
/// Two variants of the same product never share a key, so they never merge
/// into one line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItemKey(String);

impl CartItemKey {
    /// Derive the key for a product and selection.
    pub fn derive(product: &ProductId, selection: &VariantSelection) -> Self {
        let key = match selection {
            VariantSelection::None => product.as_str().to_string(),
            VariantSelection::Footwear(size) => {
                format!("{product}_uk{}_us{}", size.uk_size, size.us_size)
            }
            VariantSelection::Phone(spec) => {
                format!("{product}_{}_{}_{}", spec.model, spec.storage, spec.ram)
            }
        };

        Self(key)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the key was never set (legacy persisted lines).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CartItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CartItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Variant pre-selected when a product page first renders.
///
/// Picks the first variant, in listing order, that has stock. Returns `None`
/// for single-SKU products and for variation products where nothing is in
/// stock; no variant is pre-selected in either case.
pub fn default_selection(product: &Product) -> Option<VariantSelection> {
    if !product.has_variations {
        return None;
    }

    product
        .variants()
        .find(|(_, stock)| *stock > 0)
        .map(|(selection, _)| selection)
}
