//! Products

use std::fmt;

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::variants::{FootwearSize, PhoneSpec, VariantSelection};

/// Separator between segments of a product category path.
pub const CATEGORY_DELIMITER: char = '/';

/// Catalog product identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Largest unit price, in whole currency units, a catalog product may carry.
pub const MAX_PRICE_UNITS: i64 = 1_000_000_000_000;

/// Errors raised for malformed catalog products.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    /// Price is below zero.
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),

    /// Price is above [`MAX_PRICE_UNITS`].
    #[error("product {0} is priced above the catalog ceiling")]
    PriceTooLarge(ProductId),

    /// `has_variations` is set but no variant is listed.
    #[error("product {0} declares variations but lists none")]
    NoVariants(ProductId),

    /// Both footwear sizes and smartphone specs are populated.
    #[error("product {0} mixes footwear sizes and smartphone specs")]
    MixedVariants(ProductId),

    /// Two variants share the same key tuple.
    #[error("product {product} lists variant {variant} more than once")]
    DuplicateVariant {
        /// Offending product
        product: ProductId,

        /// Human readable variant key
        variant: String,
    },
}

/// A footwear variant and its stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootwearVariant {
    /// UK size
    pub uk_size: String,

    /// US size
    pub us_size: String,

    /// Units in stock
    #[serde(default)]
    pub count_in_stock: u32,
}

impl FootwearVariant {
    /// Create a footwear variant.
    pub fn new(uk_size: impl Into<String>, us_size: impl Into<String>, count_in_stock: u32) -> Self {
        Self {
            uk_size: uk_size.into(),
            us_size: us_size.into(),
            count_in_stock,
        }
    }

    /// The key tuple identifying this variant.
    pub fn size(&self) -> FootwearSize {
        FootwearSize::new(self.uk_size.clone(), self.us_size.clone())
    }

    fn matches(&self, size: &FootwearSize) -> bool {
        self.uk_size == size.uk_size && self.us_size == size.us_size
    }
}

/// A smartphone variant and its stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneVariant {
    /// Model name
    pub model: String,

    /// Storage capacity
    pub storage: String,

    /// Memory
    pub ram: String,

    /// Units in stock
    #[serde(default)]
    pub count_in_stock: u32,
}

impl PhoneVariant {
    /// Create a phone variant.
    pub fn new(
        model: impl Into<String>,
        storage: impl Into<String>,
        ram: impl Into<String>,
        count_in_stock: u32,
    ) -> Self {
        Self {
            model: model.into(),
            storage: storage.into(),
            ram: ram.into(),
            count_in_stock,
        }
    }

    /// The key tuple identifying this variant.
    pub fn spec(&self) -> PhoneSpec {
        PhoneSpec::new(self.model.clone(), self.storage.clone(), self.ram.clone())
    }

    fn matches(&self, spec: &PhoneSpec) -> bool {
        self.model == spec.model && self.storage == spec.storage && self.ram == spec.ram
    }
}

/// Catalog product, as returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Primary image
    #[serde(default)]
    pub image_url: String,

    /// Unit price
    pub price: Decimal,

    /// Hierarchical category path, segments joined by [`CATEGORY_DELIMITER`]
    #[serde(default)]
    pub category: String,

    /// Stock of a single-SKU product. Ignored when `has_variations` is set.
    #[serde(default)]
    pub count_in_stock: u32,

    /// Whether stock is partitioned across variants
    #[serde(default)]
    pub has_variations: bool,

    /// Footwear variants
    #[serde(default)]
    pub footwear_sizes: Vec<FootwearVariant>,

    /// Smartphone variants
    #[serde(default)]
    pub smartphone_specs: Vec<PhoneVariant>,
}

impl Product {
    /// Create a single-SKU product with no stock.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: String::new(),
            price,
            category: String::new(),
            count_in_stock: 0,
            has_variations: false,
            footwear_sizes: Vec::new(),
            smartphone_specs: Vec::new(),
        }
    }

    /// Set the root stock count.
    #[must_use]
    pub fn with_stock(mut self, count_in_stock: u32) -> Self {
        self.count_in_stock = count_in_stock;
        self
    }

    /// Set the category path.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    /// Partition stock by footwear size.
    #[must_use]
    pub fn with_footwear_sizes(mut self, sizes: Vec<FootwearVariant>) -> Self {
        self.has_variations = true;
        self.footwear_sizes = sizes;
        self
    }

    /// Partition stock by smartphone specification.
    #[must_use]
    pub fn with_smartphone_specs(mut self, specs: Vec<PhoneVariant>) -> Self {
        self.has_variations = true;
        self.smartphone_specs = specs;
        self
    }

    /// Category path split into its non-empty segments.
    pub fn category_segments(&self) -> SmallVec<[&str; 4]> {
        self.category
            .split(CATEGORY_DELIMITER)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Every variant in listing order, footwear first, with its stock.
    pub fn variants(&self) -> impl Iterator<Item = (VariantSelection, u32)> + '_ {
        let footwear = self
            .footwear_sizes
            .iter()
            .map(|variant| (VariantSelection::Footwear(variant.size()), variant.count_in_stock));

        let phones = self
            .smartphone_specs
            .iter()
            .map(|variant| (VariantSelection::Phone(variant.spec()), variant.count_in_stock));

        footwear.chain(phones)
    }

    /// Stock of the variant exactly matching `selection`, if one exists.
    pub fn variant_stock(&self, selection: &VariantSelection) -> Option<u32> {
        match selection {
            VariantSelection::None => None,
            VariantSelection::Footwear(size) => self
                .footwear_sizes
                .iter()
                .find(|variant| variant.matches(size))
                .map(|variant| variant.count_in_stock),
            VariantSelection::Phone(spec) => self
                .smartphone_specs
                .iter()
                .find(|variant| variant.matches(spec))
                .map(|variant| variant.count_in_stock),
        }
    }

    /// Check the catalog invariants of this product.
    ///
    /// # Errors
    ///
    /// - [`ProductError::NegativePrice`]: the price is below zero.
    /// - [`ProductError::PriceTooLarge`]: the price is above [`MAX_PRICE_UNITS`].
    /// - [`ProductError::NoVariants`]: variations are declared but none are listed.
    /// - [`ProductError::MixedVariants`]: both variant kinds are populated.
    /// - [`ProductError::DuplicateVariant`]: a variant key tuple repeats.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.price < Decimal::ZERO {
            return Err(ProductError::NegativePrice(self.id.clone()));
        }

        if self.price > Decimal::from(MAX_PRICE_UNITS) {
            return Err(ProductError::PriceTooLarge(self.id.clone()));
        }

        if !self.footwear_sizes.is_empty() && !self.smartphone_specs.is_empty() {
            return Err(ProductError::MixedVariants(self.id.clone()));
        }

        if !self.has_variations {
            return Ok(());
        }

        if self.footwear_sizes.is_empty() && self.smartphone_specs.is_empty() {
            return Err(ProductError::NoVariants(self.id.clone()));
        }

        let mut seen = FxHashSet::default();

        for (selection, _) in self.variants() {
            if !seen.insert(selection.clone()) {
                return Err(ProductError::DuplicateVariant {
                    product: self.id.clone(),
                    variant: selection.to_string(),
                });
            }
        }

        Ok(())
    }
}
