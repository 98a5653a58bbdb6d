//! Storefront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{CartError, CartLineItem, CartStorage, CartStore, FileStorage, MemoryStorage},
    catalog::{CatalogError, CatalogService, InMemoryCatalog},
    checkout::{
        CheckoutError, CheckoutPolicy, CheckoutService, CheckoutTotals, DraftError, OrderDraft,
        ShippingAddress, build_order_draft, compute_totals,
    },
    orders::{InMemoryOrderService, OrderService, OrderServiceError, OrderUuid, PlacedOrder},
    payments::{
        PaymentConfirmation, PaymentEvent, PaymentMethod, PaymentState, PaymentTracker,
        Transition,
    },
    products::{FootwearVariant, PhoneVariant, Product, ProductId},
    stock::{StockLevel, StockStatus, resolve_stock},
    variants::{CartItemKey, VariantSelection, default_selection},
};
