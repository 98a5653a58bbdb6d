//! Checkout Service
//!
//! Ties the cart to the catalog and order collaborators. Cart mutations stay
//! synchronous; every call to a collaborator is bounded by the configured
//! timeout and fails with [`CheckoutError::Timeout`] rather than hanging.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{Span, debug, info, warn};

use crate::{
    cart::{CartLineItem, CartStore},
    catalog::CatalogService,
    checkout::{
        address::ShippingAddress,
        draft::{OrderDraft, build_order_draft_with},
        errors::CheckoutError,
        totals::{CheckoutPolicy, CheckoutTotals, compute_totals_with},
    },
    orders::{OrderService, OrderUuid, PlacedOrder},
    payments::{PaymentConfirmation, PaymentEvent, PaymentMethod, PaymentState, PaymentTracker, Transition},
    products::{Product, ProductId},
    stock::{StockStatus, resolve_stock},
    variants::{CartItemKey, VariantSelection},
};

/// Default bound on collaborator calls.
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(15);

/// Live stock for one cart line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineReview {
    /// Line identity
    pub key: CartItemKey,

    /// Catalog product
    pub product_id: ProductId,

    /// Quantity in the cart
    pub requested: u32,

    /// Price snapshotted in the cart
    pub cart_price: Decimal,

    /// Current catalog price
    pub live_price: Decimal,

    /// Current stock
    pub live: StockStatus,
}

impl LineReview {
    /// Returns `true` if the shopper must confirm this line again.
    pub fn needs_reconfirmation(&self) -> bool {
        self.requested > self.live.available
    }

    /// Returns `true` if the catalog price moved since the line was added.
    pub fn price_changed(&self) -> bool {
        self.cart_price != self.live_price
    }
}

/// Result of re-validating a cart against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartReview {
    /// One entry per cart line, in cart order
    pub lines: Vec<LineReview>,
}

impl CartReview {
    /// Lines whose quantity exceeds live stock.
    pub fn stale(&self) -> impl Iterator<Item = &LineReview> {
        self.lines.iter().filter(|line| line.needs_reconfirmation())
    }

    /// Returns `true` if no line needs re-confirmation.
    pub fn is_ready(&self) -> bool {
        self.stale().next().is_none()
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct PlacedCheckout {
    /// Order as accepted by the order service
    pub order: PlacedOrder,

    /// The draft that was submitted
    pub draft: OrderDraft,

    /// Local payment tracker, seeded with the initial state
    pub payment: PaymentTracker,

    /// `false` if the order went through but the cart could not be emptied
    pub cart_cleared: bool,
}

/// Checkout orchestration.
pub struct CheckoutService {
    catalog: Arc<dyn CatalogService>,
    orders: Arc<dyn OrderService>,
    policy: CheckoutPolicy,
    timeout: Duration,
}

impl fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutService")
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CheckoutService {
    /// Create a service with the default policy and timeout.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>, orders: Arc<dyn OrderService>) -> Self {
        Self {
            catalog,
            orders,
            policy: CheckoutPolicy::default(),
            timeout: DEFAULT_SERVICE_TIMEOUT,
        }
    }

    /// Use a different pricing policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different collaborator timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pricing policy in use.
    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    /// Totals of `items` under this service's policy.
    pub fn totals(&self, items: &[CartLineItem]) -> CheckoutTotals {
        compute_totals_with(items, &self.policy)
    }

    /// Fetch a product and resolve its live stock.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Catalog`] or [`CheckoutError::Timeout`] if
    /// the catalog lookup fails.
    pub async fn resolve_product_stock(
        &self,
        product_id: &ProductId,
        selector: Option<&VariantSelection>,
    ) -> Result<(Product, StockStatus), CheckoutError> {
        let product = self.fetch(product_id).await?;
        let stock = resolve_stock(&product, selector);

        Ok((product, stock))
    }

    /// Add a product to the cart after checking the requested quantity
    /// against live stock.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::QuantityUnavailable`]: `quantity` is outside
    ///   `1..=min(available, 10)`, including variation products with no
    ///   variant chosen.
    /// - [`CheckoutError::Catalog`] / [`CheckoutError::Timeout`]: lookup
    ///   failed.
    /// - [`CheckoutError::Cart`]: the cart could not be persisted.
    #[tracing::instrument(
        name = "checkout.service.add_to_cart",
        skip(self, cart, product_id, selection),
        fields(product_id = %product_id, variant = %selection),
        err
    )]
    pub async fn add_to_cart(
        &self,
        cart: &mut CartStore,
        product_id: &ProductId,
        quantity: u32,
        selection: VariantSelection,
    ) -> Result<CartItemKey, CheckoutError> {
        let (product, stock) = self
            .resolve_product_stock(product_id, Some(&selection))
            .await?;

        if !stock.allows(quantity) {
            return Err(CheckoutError::QuantityUnavailable {
                product: product.id,
                requested: quantity,
                max: stock.max_quantity(),
            });
        }

        Ok(cart.add_item(&product, quantity, selection)?)
    }

    /// Re-query the catalog for every line, refresh the stock snapshots in
    /// the cart, and report lines that need re-confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails or the refreshed cart cannot be
    /// persisted. The cart is unchanged on error.
    #[tracing::instrument(
        name = "checkout.service.review",
        skip(self, cart),
        fields(lines = cart.len(), stale = tracing::field::Empty),
        err
    )]
    pub async fn review(&self, cart: &mut CartStore) -> Result<CartReview, CheckoutError> {
        let mut products: FxHashMap<ProductId, Product> = FxHashMap::default();
        let mut lines = Vec::with_capacity(cart.len());

        for item in cart.list_items() {
            if !products.contains_key(&item.product_id) {
                let product = self.fetch(&item.product_id).await?;
                products.insert(item.product_id.clone(), product);
            }

            let Some(product) = products.get(&item.product_id) else {
                continue;
            };

            lines.push(LineReview {
                key: CartItemKey::from(item.identity()),
                product_id: item.product_id.clone(),
                requested: item.quantity,
                cart_price: item.unit_price,
                live_price: product.price,
                live: resolve_stock(product, Some(&item.variant_selection)),
            });
        }

        let live: Vec<(CartItemKey, u32)> = lines
            .iter()
            .map(|line| (line.key.clone(), line.live.available))
            .collect();

        cart.refresh_stock(&live)?;

        let review = CartReview { lines };

        Span::current().record("stale", review.stale().count());

        Ok(review)
    }

    /// Build a draft from the cart, re-check it against the catalog, submit
    /// it, and clear the cart.
    ///
    /// The cart is only cleared once the order service has accepted the
    /// order; any failure leaves its lines exactly as they were. The stock
    /// snapshots are refreshed by the catalog re-check even when it blocks
    /// the submission.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Draft`]: validation failed; nothing was submitted.
    /// - [`CheckoutError::NeedsReconfirmation`]: a line asks for more than
    ///   the catalog now has; nothing was submitted.
    /// - [`CheckoutError::StockExhausted`]: the order service rejected a line.
    /// - [`CheckoutError::Timeout`]: the order service did not answer.
    #[tracing::instrument(
        name = "checkout.service.place_order",
        skip(self, cart, address),
        fields(
            payment_method = %method,
            lines = cart.len(),
            order_uuid = tracing::field::Empty
        ),
        err
    )]
    pub async fn place_order(
        &self,
        cart: &mut CartStore,
        address: &ShippingAddress,
        method: PaymentMethod,
    ) -> Result<PlacedCheckout, CheckoutError> {
        let draft = build_order_draft_with(cart.list_items(), address, method, &self.policy)?;

        let review = self.review(cart).await?;

        if !review.is_ready() {
            let stale: Vec<CartItemKey> = review.stale().map(|line| line.key.clone()).collect();

            return Err(CheckoutError::NeedsReconfirmation(stale));
        }

        let order = self
            .within("orders.submit_order", self.orders.submit_order(&draft))
            .await?;

        Span::current().record("order_uuid", tracing::field::display(order.uuid));

        let cart_cleared = match cart.clear() {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "order placed but the cart could not be cleared");
                false
            }
        };

        info!(
            order_uuid = %order.uuid,
            payment_state = %order.payment_state,
            total = %draft.total_price(),
            "order placed"
        );

        Ok(PlacedCheckout {
            payment: PaymentTracker::new(method),
            order,
            draft,
            cart_cleared,
        })
    }

    /// Forward a provider confirmation to the order service and apply it to
    /// the local tracker. Safe to call long after the payment UI is gone,
    /// and safe to call twice with the same confirmation.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::PaymentFailed`]: the provider reported a failure.
    /// - [`CheckoutError::Payment`]: the confirmation conflicts with the
    ///   tracker's state.
    /// - [`CheckoutError::Timeout`]: the order service did not answer.
    #[tracing::instrument(
        name = "checkout.service.confirm_payment",
        skip(self, tracker, confirmation),
        fields(
            order_uuid = %order,
            transaction_id = %confirmation.transaction_id
        ),
        err
    )]
    pub async fn confirm_payment(
        &self,
        order: OrderUuid,
        tracker: &mut PaymentTracker,
        confirmation: &PaymentConfirmation,
    ) -> Result<Transition, CheckoutError> {
        let updated = self
            .within(
                "orders.confirm_payment",
                self.orders.confirm_payment(order, confirmation),
            )
            .await?;

        let transition = tracker.apply(PaymentEvent::from(confirmation.clone()))?;

        debug!(
            local = %tracker.state(),
            remote = %updated.payment_state,
            "applied payment confirmation"
        );

        if tracker.state() == PaymentState::Failed {
            let reason = tracker.failure_reason().unwrap_or("payment failed");

            return Err(CheckoutError::PaymentFailed(reason.to_string()));
        }

        Ok(transition)
    }

    async fn fetch(&self, product_id: &ProductId) -> Result<Product, CheckoutError> {
        self.within("catalog.get_product", self.catalog.get_product(product_id))
            .await
    }

    async fn within<T, E>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, CheckoutError>
    where
        CheckoutError: From<E>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(CheckoutError::from),
            Err(elapsed) => {
                warn!(operation, timeout = ?self.timeout, %elapsed, "collaborator call timed out");

                Err(CheckoutError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::{
        cart::MemoryStorage,
        catalog::{CatalogError, MockCatalogService},
        checkout::draft::DraftError,
        orders::{MockOrderService, OrderServiceError},
        payments::{ConfirmationStatus, PayerIdentity},
        products::FootwearVariant,
    };

    use super::*;

    fn shoe() -> Product {
        Product::new("shoe", "Runner", Decimal::from(3000)).with_footwear_sizes(vec![
            FootwearVariant::new("8", "9", 0),
            FootwearVariant::new("9", "10", 3),
        ])
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            address_line: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            pin_code: "560001".to_string(),
            phone: "9800000000".to_string(),
        }
    }

    fn catalog_serving(product: Product) -> MockCatalogService {
        let mut catalog = MockCatalogService::new();

        catalog
            .expect_get_product()
            .returning(move |id| {
                if *id == product.id {
                    Ok(product.clone())
                } else {
                    Err(CatalogError::NotFound(id.clone()))
                }
            });

        catalog
    }

    fn cart() -> Result<CartStore, crate::cart::CartError> {
        CartStore::open(Arc::new(MemoryStorage::new()))
    }

    fn placed(method: PaymentMethod) -> PlacedOrder {
        PlacedOrder {
            uuid: OrderUuid::new(),
            payment_method: method,
            payment_state: PaymentState::initial(method),
            total_price: Decimal::from(3640),
        }
    }

    fn confirmation(status: ConfirmationStatus) -> PaymentConfirmation {
        PaymentConfirmation {
            transaction_id: "tx-1".to_string(),
            status,
            timestamp: Timestamp::UNIX_EPOCH,
            payer: PayerIdentity {
                payer_id: "payer".to_string(),
                email: None,
            },
        }
    }

    #[tokio::test]
    async fn add_to_cart_checks_live_stock() -> TestResult {
        let mut orders = MockOrderService::new();
        orders.expect_submit_order().never();

        let service = CheckoutService::new(Arc::new(catalog_serving(shoe())), Arc::new(orders));
        let mut cart = cart()?;

        let key = service
            .add_to_cart(&mut cart, &ProductId::new("shoe"), 3, VariantSelection::footwear("9", "10"))
            .await?;

        assert_eq!(key.as_str(), "shoe_uk9_us10");

        let result = service
            .add_to_cart(&mut cart, &ProductId::new("shoe"), 4, VariantSelection::footwear("9", "10"))
            .await;

        assert!(
            matches!(result, Err(CheckoutError::QuantityUnavailable { max: 3, requested: 4, .. })),
            "expected QuantityUnavailable, got {result:?}"
        );
        assert_eq!(cart.item_count(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn variation_product_without_selection_cannot_be_added() -> TestResult {
        let service = CheckoutService::new(
            Arc::new(catalog_serving(shoe())),
            Arc::new(MockOrderService::new()),
        );
        let mut cart = cart()?;

        let result = service
            .add_to_cart(&mut cart, &ProductId::new("shoe"), 1, VariantSelection::None)
            .await;

        assert!(matches!(result, Err(CheckoutError::QuantityUnavailable { max: 0, .. })));
        assert!(cart.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn place_order_clears_cart_on_success() -> TestResult {
        let order = placed(PaymentMethod::Upi);
        let order_uuid = order.uuid;

        let mut orders = MockOrderService::new();
        orders
            .expect_submit_order()
            .once()
            .withf(|draft| draft.items().len() == 1 && draft.payment_method() == PaymentMethod::Upi)
            .return_once(move |_| Ok(order));

        let service = CheckoutService::new(Arc::new(catalog_serving(shoe())), Arc::new(orders));
        let mut cart = cart()?;
        cart.add_item(&shoe(), 1, VariantSelection::footwear("9", "10"))?;

        let outcome = service.place_order(&mut cart, &address(), PaymentMethod::Upi).await?;

        assert_eq!(outcome.order.uuid, order_uuid);
        assert_eq!(outcome.payment.state(), PaymentState::AwaitingPayment);
        assert!(outcome.cart_cleared);
        assert!(cart.is_empty());
        // 3000 + 100 shipping + 540 tax
        assert_eq!(outcome.draft.total_price(), Decimal::from(3640));

        Ok(())
    }

    #[tokio::test]
    async fn stock_exhausted_leaves_cart_untouched() -> TestResult {
        let mut orders = MockOrderService::new();
        orders.expect_submit_order().once().return_once(|_| {
            Err(OrderServiceError::StockExhausted {
                key: CartItemKey::from("shoe_uk9_us10"),
                message: "sold out".to_string(),
            })
        });

        let service = CheckoutService::new(Arc::new(catalog_serving(shoe())), Arc::new(orders));
        let mut cart = cart()?;
        cart.add_item(&shoe(), 2, VariantSelection::footwear("9", "10"))?;
        let before = cart.snapshot();

        let result = service.place_order(&mut cart, &address(), PaymentMethod::Card).await;

        assert!(
            matches!(result, Err(CheckoutError::StockExhausted { ref message, .. }) if message == "sold out"),
            "expected StockExhausted, got {result:?}"
        );
        assert_eq!(cart.snapshot(), before);

        Ok(())
    }

    #[tokio::test]
    async fn invalid_draft_is_never_submitted() -> TestResult {
        let mut orders = MockOrderService::new();
        orders.expect_submit_order().never();

        let service = CheckoutService::new(Arc::new(catalog_serving(shoe())), Arc::new(orders));
        let mut cart = cart()?;

        let empty = service.place_order(&mut cart, &address(), PaymentMethod::Card).await;
        assert!(matches!(empty, Err(CheckoutError::Draft(DraftError::EmptyCart))));

        cart.add_item(&shoe(), 1, VariantSelection::None)?;

        let missing = service.place_order(&mut cart, &address(), PaymentMethod::Card).await;
        assert!(matches!(
            missing,
            Err(CheckoutError::Draft(DraftError::MissingVariantSelection(_)))
        ));
        assert_eq!(cart.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn stale_line_is_blocked_before_submission() -> TestResult {
        let mut orders = MockOrderService::new();
        orders.expect_submit_order().never();

        let service = CheckoutService::new(Arc::new(catalog_serving(shoe())), Arc::new(orders));
        let mut cart = cart()?;

        let added_when_plentiful =
            shoe().with_footwear_sizes(vec![FootwearVariant::new("9", "10", 8)]);
        cart.add_item(&added_when_plentiful, 5, VariantSelection::footwear("9", "10"))?;

        let result = service.place_order(&mut cart, &address(), PaymentMethod::Card).await;

        assert!(
            matches!(
                result,
                Err(CheckoutError::NeedsReconfirmation(ref keys))
                    if keys.iter().map(CartItemKey::as_str).eq(["shoe_uk9_us10"])
            ),
            "expected NeedsReconfirmation, got {result:?}"
        );
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.get_item("shoe_uk9_us10").map(|i| i.available_stock), Some(3));

        Ok(())
    }

    #[tokio::test]
    async fn review_flags_lines_above_live_stock() -> TestResult {
        let mut cart = cart()?;
        let stale_shoe = shoe().with_footwear_sizes(vec![
            FootwearVariant::new("8", "9", 4),
            FootwearVariant::new("9", "10", 6),
        ]);
        cart.add_item(&stale_shoe, 2, VariantSelection::footwear("8", "9"))?;
        cart.add_item(&stale_shoe, 3, VariantSelection::footwear("9", "10"))?;

        let mut catalog = MockCatalogService::new();
        catalog
            .expect_get_product()
            .once()
            .returning(|_| Ok(shoe()));

        let service = CheckoutService::new(Arc::new(catalog), Arc::new(MockOrderService::new()));

        let review = service.review(&mut cart).await?;

        let stale: Vec<&str> = review.stale().map(|line| line.key.as_str()).collect();

        assert_eq!(stale, ["shoe_uk8_us9"]);
        assert!(!review.is_ready());
        assert_eq!(cart.get_item("shoe_uk8_us9").map(|i| i.available_stock), Some(0));
        assert_eq!(cart.get_item("shoe_uk9_us10").map(|i| i.available_stock), Some(3));

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_confirmation_is_idempotent() -> TestResult {
        let order = placed(PaymentMethod::Card);
        let order_uuid = order.uuid;

        let mut orders = MockOrderService::new();
        orders
            .expect_confirm_payment()
            .times(2)
            .withf(move |uuid, confirmation| *uuid == order_uuid && confirmation.transaction_id == "tx-1")
            .returning(move |_, _| {
                Ok(PlacedOrder {
                    payment_state: PaymentState::Paid,
                    ..order.clone()
                })
            });

        let service = CheckoutService::new(
            Arc::new(MockCatalogService::new()),
            Arc::new(orders),
        );
        let mut tracker = PaymentTracker::new(PaymentMethod::Card);
        let paid = confirmation(ConfirmationStatus::Completed);

        let first = service.confirm_payment(order_uuid, &mut tracker, &paid).await?;
        let second = service.confirm_payment(order_uuid, &mut tracker, &paid).await?;

        assert_eq!(first, Transition::Applied(PaymentState::Paid));
        assert_eq!(second, Transition::Unchanged(PaymentState::Paid));

        Ok(())
    }

    #[tokio::test]
    async fn failed_confirmation_is_payment_failed() -> TestResult {
        let order = placed(PaymentMethod::PayPal);
        let order_uuid = order.uuid;

        let mut orders = MockOrderService::new();
        orders.expect_confirm_payment().once().return_once(move |_, _| {
            Ok(PlacedOrder {
                payment_state: PaymentState::Failed,
                ..order
            })
        });

        let service = CheckoutService::new(Arc::new(MockCatalogService::new()), Arc::new(orders));
        let mut tracker = PaymentTracker::new(PaymentMethod::PayPal);

        let result = service
            .confirm_payment(order_uuid, &mut tracker, &confirmation(ConfirmationStatus::Failed))
            .await;

        assert!(matches!(result, Err(CheckoutError::PaymentFailed(_))));
        assert_eq!(tracker.state(), PaymentState::Failed);

        Ok(())
    }
}
