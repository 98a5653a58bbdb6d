//! Checkout
//!
//! Pure totals and draft construction, plus the [`CheckoutService`] that
//! drives them against the catalog and order collaborators.

pub mod address;
pub mod draft;
pub mod errors;
pub mod service;
pub mod totals;

pub use address::{AddressField, ShippingAddress};
pub use draft::{
    DraftError, OrderDraft, OrderDraftUuid, OrderLineSnapshot, build_order_draft,
    build_order_draft_with,
};
pub use errors::CheckoutError;
pub use service::{
    CartReview, CheckoutService, DEFAULT_SERVICE_TIMEOUT, LineReview, PlacedCheckout,
};
pub use totals::{CheckoutPolicy, CheckoutTotals, compute_totals, compute_totals_with};

pub use crate::payments::PaymentMethod;
