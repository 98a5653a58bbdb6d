//! Order Drafts
//!
//! An [`OrderDraft`] is the immutable payload handed to the order service. It
//! owns copies of every cart line, so mutating the cart afterwards cannot
//! alter an order that has already been built.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cart::CartLineItem,
    checkout::{
        address::{AddressField, ShippingAddress},
        totals::{CheckoutPolicy, CheckoutTotals, compute_totals_with},
    },
    payments::PaymentMethod,
    products::ProductId,
    uuids::TypedUuid,
    variants::{CartItemKey, VariantSelection},
};

/// Draft UUID
pub type OrderDraftUuid = TypedUuid<OrderDraft>;

/// Validation failures while building a draft. Each is recoverable: the
/// shopper fixes the input and the cart is untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftError {
    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// A required address field is blank.
    #[error("shipping address is missing {0}")]
    IncompleteAddress(AddressField),

    /// A variation product line has no variant chosen.
    #[error("product {0} requires a variant selection")]
    MissingVariantSelection(ProductId),
}

/// Frozen copy of one cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineSnapshot {
    /// Catalog product
    pub product_id: ProductId,

    /// Line identity
    pub cart_item_key: CartItemKey,

    /// Product name
    pub name: String,

    /// Product image
    pub image_url: String,

    /// Price the shopper saw
    pub unit_price: Decimal,

    /// Units ordered
    pub quantity: u32,

    /// Chosen variant
    pub variant_selection: VariantSelection,
}

impl OrderLineSnapshot {
    /// `unit_price * quantity`
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

impl From<&CartLineItem> for OrderLineSnapshot {
    fn from(item: &CartLineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            cart_item_key: CartItemKey::from(item.identity()),
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            variant_selection: item.variant_selection.clone(),
        }
    }
}

/// Order submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    uuid: OrderDraftUuid,
    items: Vec<OrderLineSnapshot>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    totals: CheckoutTotals,
}

impl OrderDraft {
    /// Client-side draft id, used to correlate logs.
    pub fn uuid(&self) -> OrderDraftUuid {
        self.uuid
    }

    /// Frozen lines.
    pub fn items(&self) -> &[OrderLineSnapshot] {
        &self.items
    }

    /// Destination.
    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    /// How the shopper pays.
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// Totals computed when the draft was built.
    pub fn totals(&self) -> &CheckoutTotals {
        &self.totals
    }

    /// Grand total to charge.
    pub fn total_price(&self) -> Decimal {
        self.totals.grand_total
    }

    /// Total units across lines.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// Build a draft under the default [`CheckoutPolicy`].
///
/// # Errors
///
/// See [`build_order_draft_with`].
pub fn build_order_draft(
    items: &[CartLineItem],
    address: &ShippingAddress,
    method: PaymentMethod,
) -> Result<OrderDraft, DraftError> {
    build_order_draft_with(items, address, method, &CheckoutPolicy::default())
}

/// Build a draft, validating in order:
///
/// 1. the cart is not empty,
/// 2. every address field is filled in,
/// 3. every variation product line has a variant selected.
///
/// # Errors
///
/// Returns the first [`DraftError`] encountered.
pub fn build_order_draft_with(
    items: &[CartLineItem],
    address: &ShippingAddress,
    method: PaymentMethod,
    policy: &CheckoutPolicy,
) -> Result<OrderDraft, DraftError> {
    if items.is_empty() {
        return Err(DraftError::EmptyCart);
    }

    if let Some(field) = address.first_missing_field() {
        return Err(DraftError::IncompleteAddress(field));
    }

    if let Some(item) = items
        .iter()
        .find(|item| item.has_variations && item.variant_selection.is_none())
    {
        return Err(DraftError::MissingVariantSelection(item.product_id.clone()));
    }

    Ok(OrderDraft {
        uuid: OrderDraftUuid::new(),
        items: items.iter().map(OrderLineSnapshot::from).collect(),
        shipping_address: address.clone(),
        payment_method: method,
        totals: compute_totals_with(items, policy),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use testresult::TestResult;

    use crate::{
        cart::{CartStore, MemoryStorage},
        products::{FootwearVariant, Product},
    };

    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            address_line: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            pin_code: "560001".to_string(),
            phone: "9800000000".to_string(),
        }
    }

    fn shoe() -> Product {
        Product::new("shoe", "Runner", Decimal::from(3000)).with_footwear_sizes(vec![
            FootwearVariant::new("8", "9", 0),
            FootwearVariant::new("9", "10", 3),
        ])
    }

    #[test]
    fn empty_cart_is_rejected_first() {
        let result = build_order_draft(&[], &ShippingAddress::default(), PaymentMethod::Card);

        assert_eq!(result, Err(DraftError::EmptyCart));
    }

    #[test]
    fn incomplete_address_names_the_field() {
        let items = [CartLineItem::new(&shoe(), 1, VariantSelection::footwear("9", "10"))];
        let address = ShippingAddress {
            pin_code: String::new(),
            ..address()
        };

        let result = build_order_draft(&items, &address, PaymentMethod::Upi);

        assert_eq!(result, Err(DraftError::IncompleteAddress(AddressField::PinCode)));
    }

    #[test]
    fn variation_line_without_selection_is_rejected() {
        let items = [CartLineItem::new(&shoe(), 1, VariantSelection::None)];

        let result = build_order_draft(&items, &address(), PaymentMethod::CashOnDelivery);

        assert_eq!(
            result,
            Err(DraftError::MissingVariantSelection(ProductId::new("shoe")))
        );
    }

    #[test]
    fn single_sku_line_needs_no_selection() -> TestResult {
        let socks = Product::new("socks", "Socks", Decimal::from(200)).with_stock(5);
        let items = [CartLineItem::new(&socks, 2, VariantSelection::None)];

        let draft = build_order_draft(&items, &address(), PaymentMethod::PayPal)?;

        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.payment_method(), PaymentMethod::PayPal);
        // 400 + 100 shipping + 72 tax
        assert_eq!(draft.total_price(), Decimal::from(572));

        Ok(())
    }

    #[test]
    fn draft_is_isolated_from_later_cart_mutation() -> TestResult {
        let mut cart = CartStore::open(Arc::new(MemoryStorage::new()))?;
        cart.add_item(&shoe(), 2, VariantSelection::footwear("9", "10"))?;

        let draft = build_order_draft(cart.list_items(), &address(), PaymentMethod::Card)?;
        let frozen = draft.clone();

        cart.update_quantity("shoe_uk9_us10", 1)?;
        cart.add_item(&shoe(), 1, VariantSelection::footwear("8", "9"))?;
        cart.clear()?;

        assert_eq!(draft, frozen);
        assert_eq!(draft.items().first().map(|line| line.quantity), Some(2));
        assert_eq!(draft.unit_count(), 2);

        Ok(())
    }
}
