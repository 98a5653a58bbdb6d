//! Payments
//!
//! Payment lifecycle of a submitted order. The initial state depends only on
//! the payment method:
//!
//! ```text
//! card / paypal / upi:  AWAITING_PAYMENT --confirmed--> PAID
//!                        AWAITING_PAYMENT --failed/cancelled--> FAILED
//!                        FAILED --retry--> AWAITING_PAYMENT
//! cod:                  COD_PENDING --delivered--> PAID
//! ```
//!
//! A [`PaymentTracker`] is plain data. Events can be applied whenever they
//! arrive, independent of whichever UI started the payment, and duplicate
//! provider callbacks are absorbed without error.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// How the shopper pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card payment through the provider.
    Card,

    /// `PayPal` checkout.
    #[serde(rename = "paypal")]
    PayPal,

    /// UPI collect/intent.
    Upi,

    /// Cash on delivery.
    #[serde(rename = "cod")]
    CashOnDelivery,
}

impl PaymentMethod {
    /// Wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::PayPal => "paypal",
            Self::Upi => "upi",
            Self::CashOnDelivery => "cod",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::PayPal),
            "upi" => Ok(Self::Upi),
            "cod" => Ok(Self::CashOnDelivery),
            _ => Err(PaymentError::UnknownMethod(value.to_string())),
        }
    }
}

/// Payment status of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    /// Waiting for the provider to confirm.
    AwaitingPayment,

    /// Settled.
    Paid,

    /// Cash on delivery; settled when the parcel is delivered.
    CodPending,

    /// The provider reported an error or the shopper cancelled.
    Failed,
}

impl PaymentState {
    /// State an order enters on submission.
    pub fn initial(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => Self::CodPending,
            PaymentMethod::Card | PaymentMethod::PayPal | PaymentMethod::Upi => {
                Self::AwaitingPayment
            }
        }
    }

    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::Paid => "PAID",
            Self::CodPending => "COD_PENDING",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    /// Funds captured.
    Completed,

    /// Provider declined or errored.
    Failed,
}

/// Who paid, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerIdentity {
    /// Provider-side payer id
    pub payer_id: String,

    /// Payer email, when shared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Payment confirmation callback from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Provider transaction id
    pub transaction_id: String,

    /// Reported outcome
    pub status: ConfirmationStatus,

    /// When the provider processed the payment
    pub timestamp: Timestamp,

    /// Who paid
    pub payer: PayerIdentity,
}

/// Something that happened to an order's payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Provider confirmed payment.
    Confirmed(PaymentConfirmation),

    /// Provider reported an error.
    Failed {
        /// Provider's reason
        reason: String,
    },

    /// Shopper abandoned the payment widget.
    Cancelled,

    /// Shopper re-attempts payment on the same order.
    Retry,

    /// Cash collected on delivery.
    Delivered,
}

impl PaymentEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
            Self::Retry => "retry",
            Self::Delivered => "delivered",
        }
    }
}

impl From<PaymentConfirmation> for PaymentEvent {
    fn from(confirmation: PaymentConfirmation) -> Self {
        match confirmation.status {
            ConfirmationStatus::Completed => Self::Confirmed(confirmation),
            ConfirmationStatus::Failed => Self::Failed {
                reason: format!(
                    "provider declined transaction {}",
                    confirmation.transaction_id
                ),
            },
        }
    }
}

/// Errors raised by the payment state machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The event is not valid in the current state.
    #[error("cannot apply {event} while payment is {state}")]
    InvalidTransition {
        /// Current state
        state: PaymentState,

        /// Rejected event
        event: &'static str,
    },

    /// A second, different transaction claims to have paid the order.
    #[error("order already paid by {existing}; rejected confirmation {attempted}")]
    ConflictingConfirmation {
        /// Transaction that paid the order
        existing: String,

        /// Transaction that was rejected
        attempted: String,
    },

    /// Unrecognised payment method name.
    #[error("unknown payment method {0:?}")]
    UnknownMethod(String),
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed to the contained state.
    Applied(PaymentState),

    /// The event was a duplicate; the state is unchanged.
    Unchanged(PaymentState),
}

impl Transition {
    /// State after the event.
    pub fn state(self) -> PaymentState {
        match self {
            Self::Applied(state) | Self::Unchanged(state) => state,
        }
    }
}

/// Payment state of one order plus what drove it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTracker {
    method: PaymentMethod,
    state: PaymentState,
    confirmation: Option<PaymentConfirmation>,
    failure: Option<String>,
    attempts: u32,
}

impl PaymentTracker {
    /// Start tracking an order paid with `method`.
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            state: PaymentState::initial(method),
            confirmation: None,
            failure: None,
            attempts: 1,
        }
    }

    /// Payment method.
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    /// Current state.
    pub fn state(&self) -> PaymentState {
        self.state
    }

    /// Confirmation that settled the order, if any.
    pub fn confirmation(&self) -> Option<&PaymentConfirmation> {
        self.confirmation.as_ref()
    }

    /// Reason of the most recent failure, while failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Payment attempts made, including the first.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Apply an event.
    ///
    /// Duplicate confirmations and duplicate failure reports return
    /// [`Transition::Unchanged`] instead of an error.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidTransition`]: the event is not valid in the
    ///   current state (for example, failing a cash-on-delivery order).
    /// - [`PaymentError::ConflictingConfirmation`]: the order is already paid
    ///   by a different transaction.
    pub fn apply(&mut self, event: PaymentEvent) -> Result<Transition, PaymentError> {
        let name = event.name();

        let transition = match (self.state, event) {
            (PaymentState::AwaitingPayment, PaymentEvent::Confirmed(confirmation)) => {
                self.confirmation = Some(confirmation);
                self.failure = None;
                self.enter(PaymentState::Paid)
            }
            (PaymentState::Paid, PaymentEvent::Confirmed(confirmation)) => {
                match &self.confirmation {
                    Some(existing) if existing.transaction_id == confirmation.transaction_id => {
                        debug!(
                            transaction_id = %confirmation.transaction_id,
                            "ignoring duplicate payment confirmation"
                        );
                        Transition::Unchanged(self.state)
                    }
                    Some(existing) => {
                        warn!(
                            existing = %existing.transaction_id,
                            attempted = %confirmation.transaction_id,
                            "conflicting payment confirmation"
                        );
                        return Err(PaymentError::ConflictingConfirmation {
                            existing: existing.transaction_id.clone(),
                            attempted: confirmation.transaction_id,
                        });
                    }
                    None => return Err(self.invalid(name)),
                }
            }
            (PaymentState::AwaitingPayment, PaymentEvent::Failed { reason }) => {
                self.failure = Some(reason);
                self.enter(PaymentState::Failed)
            }
            (PaymentState::AwaitingPayment, PaymentEvent::Cancelled) => {
                self.failure = Some("cancelled by shopper".to_string());
                self.enter(PaymentState::Failed)
            }
            (PaymentState::Failed, PaymentEvent::Failed { .. } | PaymentEvent::Cancelled) => {
                Transition::Unchanged(self.state)
            }
            (PaymentState::Failed, PaymentEvent::Retry) => {
                self.attempts = self.attempts.saturating_add(1);
                self.failure = None;
                self.enter(PaymentState::AwaitingPayment)
            }
            (PaymentState::CodPending, PaymentEvent::Delivered) => {
                self.enter(PaymentState::Paid)
            }
            (PaymentState::Paid, PaymentEvent::Delivered)
                if self.method == PaymentMethod::CashOnDelivery =>
            {
                Transition::Unchanged(self.state)
            }
            _ => return Err(self.invalid(name)),
        };

        Ok(transition)
    }

    fn enter(&mut self, state: PaymentState) -> Transition {
        debug!(from = %self.state, to = %state, method = %self.method, "payment transition");
        self.state = state;
        Transition::Applied(state)
    }

    fn invalid(&self, event: &'static str) -> PaymentError {
        PaymentError::InvalidTransition {
            state: self.state,
            event,
        }
    }
}
