//! Cart Line Items

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    products::{Product, ProductId},
    stock::{StockStatus, resolve_stock},
    variants::{CartItemKey, VariantSelection},
};

/// One line of the cart: a product plus the exact variant chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Catalog product
    pub product_id: ProductId,

    /// Line identity. Empty on lines persisted before keys existed.
    #[serde(default)]
    pub cart_item_key: CartItemKey,

    /// Product name at add-time
    pub name: String,

    /// Product image at add-time
    #[serde(default)]
    pub image_url: String,

    /// Price snapshot taken at add-time
    pub unit_price: Decimal,

    /// Requested units
    pub quantity: u32,

    /// Stock snapshot taken at add-time (advisory only)
    #[serde(default)]
    pub available_stock: u32,

    /// Whether the product partitions stock by variant
    #[serde(default)]
    pub has_variations: bool,

    /// Chosen variant
    #[serde(default)]
    pub variant_selection: VariantSelection,
}

impl CartLineItem {
    /// Build a line from a catalog product, snapshotting price and stock.
    ///
    /// Single-SKU products always key on the product id; any selection
    /// passed for them is dropped.
    pub fn new(product: &Product, quantity: u32, selection: VariantSelection) -> Self {
        let selection = if product.has_variations {
            selection
        } else {
            VariantSelection::None
        };

        let stock = resolve_stock(product, Some(&selection));

        Self {
            product_id: product.id.clone(),
            cart_item_key: CartItemKey::derive(&product.id, &selection),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            unit_price: product.price,
            quantity,
            available_stock: stock.available,
            has_variations: product.has_variations,
            variant_selection: selection,
        }
    }

    /// Identity used for merging and removal.
    ///
    /// The derived key when present, otherwise the product id.
    pub fn identity(&self) -> &str {
        if self.cart_item_key.is_empty() {
            self.product_id.as_str()
        } else {
            self.cart_item_key.as_str()
        }
    }

    /// `unit_price * quantity`
    ///
    /// Saturates at [`Decimal::MAX`] instead of overflowing.
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Returns `true` if the requested quantity exceeds live stock and the
    /// shopper must confirm the line again before checkout.
    pub fn needs_reconfirmation(&self, live: &StockStatus) -> bool {
        self.quantity > live.available
    }
}
