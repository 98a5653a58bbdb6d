//! Checkout Errors

use std::time::Duration;

use thiserror::Error;

use crate::{
    cart::CartError,
    catalog::CatalogError,
    checkout::draft::DraftError,
    orders::OrderServiceError,
    payments::PaymentError,
    products::ProductId,
    variants::CartItemKey,
};

/// Errors raised while checking out.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Draft validation failed; fix the input and retry.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// The order service ran out of stock for a line. Terminal for this
    /// draft.
    #[error("{message}")]
    StockExhausted {
        /// Line that ran out
        key: CartItemKey,

        /// Message from the order service
        message: String,
    },

    /// The payment was declined or cancelled. Terminal for this draft.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// A collaborator did not answer in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out
        operation: &'static str,

        /// Configured limit
        after: Duration,
    },

    /// The requested quantity is outside `1..=max`.
    #[error("cannot add {requested} of {product}; at most {max} available")]
    QuantityUnavailable {
        /// Product requested
        product: ProductId,

        /// Quantity requested
        requested: u32,

        /// Largest quantity allowed
        max: u32,
    },

    /// Some cart lines ask for more than the catalog now has. The shopper
    /// must confirm those lines again before the order can be submitted.
    #[error("{} cart line(s) exceed live stock: {}", .0.len(), join_keys(.0))]
    NeedsReconfirmation(Vec<CartItemKey>),

    /// Catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Cart persistence failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Payment state machine rejected an event.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Any other order service failure.
    #[error(transparent)]
    OrderService(OrderServiceError),
}

impl CheckoutError {
    /// Returns `true` if the shopper can fix the input and retry the same
    /// checkout without restarting it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Draft(_) | Self::QuantityUnavailable { .. } | Self::NeedsReconfirmation(_)
        )
    }
}

fn join_keys(keys: &[CartItemKey]) -> String {
    keys.iter()
        .map(CartItemKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<OrderServiceError> for CheckoutError {
    fn from(error: OrderServiceError) -> Self {
        match error {
            OrderServiceError::StockExhausted { key, message } => {
                Self::StockExhausted { key, message }
            }
            OrderServiceError::PaymentFailed(reason) => Self::PaymentFailed(reason),
            OrderServiceError::Payment(error) => Self::Payment(error),
            other => Self::OrderService(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_exhausted_is_surfaced_verbatim() {
        let error = CheckoutError::from(OrderServiceError::StockExhausted {
            key: CartItemKey::from("shoe_uk9_us10"),
            message: "only 0 of Runner left in stock".to_string(),
        });

        assert_eq!(error.to_string(), "only 0 of Runner left in stock");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn draft_errors_are_recoverable() {
        assert!(CheckoutError::from(DraftError::EmptyCart).is_recoverable());
    }

    #[test]
    fn reconfirmation_lists_stale_lines() {
        let error = CheckoutError::NeedsReconfirmation(vec![
            CartItemKey::from("shoe_uk8_us9"),
            CartItemKey::from("socks"),
        ]);

        assert_eq!(
            error.to_string(),
            "2 cart line(s) exceed live stock: shoe_uk8_us9, socks"
        );
        assert!(error.is_recoverable());
    }

    #[test]
    fn payment_failure_maps_to_payment_failed() {
        let error = CheckoutError::from(OrderServiceError::PaymentFailed("declined".to_string()));

        assert!(matches!(error, CheckoutError::PaymentFailed(ref reason) if reason == "declined"));
    }
}
