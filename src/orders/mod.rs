//! Orders
//!
//! The order service is the external collaborator that accepts drafts and
//! performs the only authoritative stock check. Nothing is reserved at
//! add-to-cart time, so two shoppers can both hold the last unit in their
//! carts; whichever submits second is rejected with
//! [`OrderServiceError::StockExhausted`].

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    checkout::OrderDraft,
    payments::{PaymentConfirmation, PaymentError, PaymentMethod, PaymentState},
    uuids::TypedUuid,
    variants::CartItemKey,
};

pub mod memory;

pub use memory::InMemoryOrderService;

/// Order UUID
pub type OrderUuid = TypedUuid<PlacedOrder>;

/// An order accepted by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    /// Server-assigned id
    pub uuid: OrderUuid,

    /// How the order is paid
    pub payment_method: PaymentMethod,

    /// Current payment state
    pub payment_state: PaymentState,

    /// Amount charged
    pub total_price: Decimal,
}

/// Errors reported by the order service.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// A line cannot be fulfilled from remaining stock.
    #[error("{message}")]
    StockExhausted {
        /// Line that ran out
        key: CartItemKey,

        /// Message from the service, surfaced verbatim
        message: String,
    },

    /// The payment provider rejected the payment.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// No such order.
    #[error("order {0} not found")]
    NotFound(OrderUuid),

    /// The confirmation is not valid for the order's payment state.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The service cannot currently handle requests.
    #[error("order service unavailable: {0}")]
    Unavailable(String),
}

/// Order submission and payment confirmation.
#[automock]
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Submit a draft; stock is checked and decremented atomically.
    async fn submit_order(&self, draft: &OrderDraft) -> Result<PlacedOrder, OrderServiceError>;

    /// Record a payment confirmation from the provider.
    async fn confirm_payment(
        &self,
        order: OrderUuid,
        confirmation: &PaymentConfirmation,
    ) -> Result<PlacedOrder, OrderServiceError>;
}
