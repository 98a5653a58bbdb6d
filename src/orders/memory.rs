//! In-memory Order Service

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::{
    catalog::InMemoryCatalog,
    checkout::OrderDraft,
    orders::{OrderService, OrderServiceError, OrderUuid, PlacedOrder},
    payments::{PaymentConfirmation, PaymentEvent, PaymentState, PaymentTracker, Transition},
    variants::CartItemKey,
};

#[derive(Debug)]
struct OrderRecord {
    draft: OrderDraft,
    tracker: PaymentTracker,
}

impl OrderRecord {
    fn placed(&self, uuid: OrderUuid) -> PlacedOrder {
        PlacedOrder {
            uuid,
            payment_method: self.tracker.method(),
            payment_state: self.tracker.state(),
            total_price: self.draft.total_price(),
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    stock: FxHashMap<CartItemKey, u32>,
    orders: FxHashMap<OrderUuid, OrderRecord>,
}

/// Order service backed by an in-process stock ledger.
///
/// The whole check-then-decrement of a submission runs under one lock, so
/// concurrent submissions for the last unit resolve to exactly one winner.
#[derive(Debug, Default)]
pub struct InMemoryOrderService {
    ledger: Mutex<Ledger>,
}

impl InMemoryOrderService {
    /// Empty ledger; every line is out of stock until seeded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger from every product and variant in `catalog`.
    pub fn from_catalog(catalog: &InMemoryCatalog) -> Self {
        let mut stock = FxHashMap::default();

        for product in catalog.products() {
            if product.has_variations {
                for (selection, count) in product.variants() {
                    stock.insert(CartItemKey::derive(&product.id, &selection), count);
                }
            } else {
                stock.insert(CartItemKey::from(product.id.as_str()), product.count_in_stock);
            }
        }

        Self {
            ledger: Mutex::new(Ledger {
                stock,
                orders: FxHashMap::default(),
            }),
        }
    }

    /// Set the remaining stock of one line.
    #[must_use]
    pub fn with_stock(mut self, key: impl Into<CartItemKey>, count: u32) -> Self {
        self.ledger
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .stock
            .insert(key.into(), count);

        self
    }

    /// Units left for `key`, if the line is known.
    pub fn remaining(&self, key: &str) -> Option<u32> {
        let ledger = self.ledger.lock().ok()?;

        ledger.stock.get(&CartItemKey::from(key)).copied()
    }

    /// Payment state of a submitted order.
    pub fn payment_state(&self, order: OrderUuid) -> Option<PaymentState> {
        let ledger = self.ledger.lock().ok()?;

        ledger.orders.get(&order).map(|record| record.tracker.state())
    }

    /// Apply any payment event to a submitted order, e.g. a retry after a
    /// failed attempt or delivery of a cash-on-delivery parcel.
    ///
    /// # Errors
    ///
    /// - [`OrderServiceError::NotFound`]: unknown order.
    /// - [`OrderServiceError::Payment`]: the event is invalid in the current
    ///   payment state.
    pub fn apply_event(
        &self,
        order: OrderUuid,
        event: PaymentEvent,
    ) -> Result<PlacedOrder, OrderServiceError> {
        let mut ledger = self.lock()?;

        let record = ledger
            .orders
            .get_mut(&order)
            .ok_or(OrderServiceError::NotFound(order))?;

        if let Transition::Applied(state) = record.tracker.apply(event)? {
            info!(order = %order, state = %state, "order payment state changed");
        }

        Ok(record.placed(order))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, OrderServiceError> {
        self.ledger
            .lock()
            .map_err(|error| OrderServiceError::Unavailable(error.to_string()))
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<PlacedOrder, OrderServiceError> {
        let mut ledger = self.lock()?;

        for line in draft.items() {
            let available = ledger.stock.get(&line.cart_item_key).copied().unwrap_or(0);

            if line.quantity > available {
                warn!(
                    key = %line.cart_item_key,
                    requested = line.quantity,
                    available,
                    "rejecting order: stock exhausted"
                );

                return Err(OrderServiceError::StockExhausted {
                    key: line.cart_item_key.clone(),
                    message: format!(
                        "only {available} of {} left in stock",
                        line.name
                    ),
                });
            }
        }

        for line in draft.items() {
            if let Some(count) = ledger.stock.get_mut(&line.cart_item_key) {
                *count = count.saturating_sub(line.quantity);
            }
        }

        let uuid = OrderUuid::new();
        let record = OrderRecord {
            draft: draft.clone(),
            tracker: PaymentTracker::new(draft.payment_method()),
        };
        let placed = record.placed(uuid);

        ledger.orders.insert(uuid, record);

        info!(
            order = %uuid,
            draft = %draft.uuid(),
            state = %placed.payment_state,
            "order placed"
        );

        Ok(placed)
    }

    async fn confirm_payment(
        &self,
        order: OrderUuid,
        confirmation: &PaymentConfirmation,
    ) -> Result<PlacedOrder, OrderServiceError> {
        self.apply_event(order, PaymentEvent::from(confirmation.clone()))
    }
}
