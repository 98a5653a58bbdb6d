//! Catalog
//!
//! The catalog service is the sole source of truth for price and stock. It is
//! queried at add-to-cart time and again when a cart is reviewed for checkout.

use std::{fs, io, path::Path};

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::products::{Product, ProductError, ProductId};

/// Errors raised by a catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product with the given id.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The catalog cannot currently serve requests.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// A product violates catalog invariants.
    #[error(transparent)]
    InvalidProduct(#[from] ProductError),

    /// A fixture file could not be read.
    #[error("failed to read catalog fixture: {0}")]
    Io(#[from] io::Error),

    /// A YAML fixture could not be parsed.
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A JSON fixture could not be parsed.
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read access to the product catalog.
#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch a product with its current price and stock.
    async fn get_product(&self, product: &ProductId) -> Result<Product, CatalogError>;
}

/// Fixture file shape: `products: [...]`.
#[derive(Debug, Deserialize)]
struct CatalogFixture {
    products: Vec<Product>,
}

/// Catalog held in memory, typically loaded from a fixture file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: FxHashMap<ProductId, Product>,
}

impl InMemoryCatalog {
    /// Build a catalog, validating every product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidProduct`] for the first invalid product.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for product in products {
            product.validate()?;
            catalog.products.insert(product.id.clone(), product);
        }

        Ok(catalog)
    }

    /// Parse a YAML fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a product is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_norway::from_str(yaml)?;

        Self::from_products(fixture.products)
    }

    /// Parse a JSON fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a product is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_json::from_str(json)?;

        Self::from_products(fixture.products)
    }

    /// Load a fixture file; `.json` files are parsed as JSON, anything else
    /// as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

        let catalog = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_yaml_str(&contents)?
        };

        debug!(path = %path.display(), products = catalog.len(), "loaded catalog fixture");

        Ok(catalog)
    }

    /// Insert or replace a product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidProduct`] if the product is invalid.
    pub fn insert(&mut self, product: Product) -> Result<(), CatalogError> {
        product.validate()?;
        self.products.insert(product.id.clone(), product);

        Ok(())
    }

    /// All products, in no particular order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn get_product(&self, product: &ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(product)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(product.clone()))
    }
}
