//! End-to-end checkout against the demo catalog fixture and the in-memory
//! order service.
//!
//! Stock shown to shoppers is advisory. Nothing is reserved when a line is
//! added, so two carts can both hold the last unit; the order service decides
//! at submission and exactly one of them wins.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::Timestamp;
use rust_decimal::Decimal;
use testresult::TestResult;

use storefront::{
    cart::{CartStore, FileStorage, MemoryStorage},
    catalog::{CatalogService, InMemoryCatalog},
    checkout::{CheckoutError, CheckoutService, OrderDraft, ShippingAddress},
    orders::{InMemoryOrderService, OrderService, OrderServiceError, OrderUuid, PlacedOrder},
    payments::{
        ConfirmationStatus, PayerIdentity, PaymentConfirmation, PaymentEvent, PaymentMethod,
        PaymentState, Transition,
    },
    products::ProductId,
    stock::{StockLevel, resolve_stock},
    variants::{VariantSelection, default_selection},
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalog.yml")
}

fn catalog() -> Result<Arc<InMemoryCatalog>, storefront::catalog::CatalogError> {
    InMemoryCatalog::load(fixture_path()).map(Arc::new)
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

fn memory_cart() -> Result<CartStore, storefront::cart::CartError> {
    CartStore::open(Arc::new(MemoryStorage::new()))
}

fn confirmation(transaction_id: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        transaction_id: transaction_id.to_string(),
        status: ConfirmationStatus::Completed,
        timestamp: Timestamp::UNIX_EPOCH,
        payer: PayerIdentity {
            payer_id: "payer-42".to_string(),
            email: Some("asha@example.com".to_string()),
        },
    }
}

#[tokio::test]
async fn default_variant_is_first_in_stock() -> TestResult {
    let catalog = catalog()?;
    let shoe = catalog.get_product(&ProductId::new("trail-runner")).await?;

    assert_eq!(default_selection(&shoe), Some(VariantSelection::footwear("9", "10")));

    let uk8 = resolve_stock(&shoe, Some(&VariantSelection::footwear("8", "9")));
    let uk9 = resolve_stock(&shoe, Some(&VariantSelection::footwear("9", "10")));

    assert_eq!((uk8.available, uk8.level), (0, StockLevel::Out));
    assert_eq!((uk9.available, uk9.level), (3, StockLevel::Low));

    Ok(())
}

#[tokio::test]
async fn browse_add_checkout_and_pay() -> TestResult {
    let catalog = catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog));
    let service = CheckoutService::new(catalog, orders.clone());
    let mut cart = memory_cart()?;

    service
        .add_to_cart(&mut cart, &ProductId::new("trail-runner"), 2, VariantSelection::footwear("9", "10"))
        .await?;
    service
        .add_to_cart(&mut cart, &ProductId::new("wool-socks"), 2, VariantSelection::None)
        .await?;

    // 6998 + 499 = 7497, free shipping, tax 1349.46
    let totals = service.totals(cart.list_items());

    assert_eq!(totals.items_total, Decimal::from(7497));
    assert_eq!(totals.shipping, Decimal::ZERO);
    assert_eq!(totals.tax, Decimal::new(134_946, 2));

    let mut placed = service
        .place_order(&mut cart, &address(), PaymentMethod::Card)
        .await?;

    assert!(cart.is_empty());
    assert_eq!(placed.order.payment_state, PaymentState::AwaitingPayment);
    assert_eq!(orders.remaining("trail-runner_uk9_us10"), Some(1));
    assert_eq!(orders.remaining("wool-socks"), Some(38));

    let paid = confirmation("tx-1001");

    let first = service
        .confirm_payment(placed.order.uuid, &mut placed.payment, &paid)
        .await?;
    let second = service
        .confirm_payment(placed.order.uuid, &mut placed.payment, &paid)
        .await?;

    assert_eq!(first, Transition::Applied(PaymentState::Paid));
    assert_eq!(second, Transition::Unchanged(PaymentState::Paid));
    assert_eq!(orders.payment_state(placed.order.uuid), Some(PaymentState::Paid));

    Ok(())
}

#[tokio::test]
async fn stray_size_on_single_sku_product_still_checks_out() -> TestResult {
    let catalog = catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog));
    let service = CheckoutService::new(catalog, orders.clone());
    let socks = ProductId::new("wool-socks");
    let mut cart = memory_cart()?;

    let sized = service
        .add_to_cart(&mut cart, &socks, 1, VariantSelection::footwear("8", "9"))
        .await?;
    let plain = service
        .add_to_cart(&mut cart, &socks, 2, VariantSelection::None)
        .await?;

    assert_eq!(sized.as_str(), "wool-socks");
    assert_eq!(sized, plain);
    assert_eq!(cart.len(), 1);

    service
        .place_order(&mut cart, &address(), PaymentMethod::Card)
        .await?;

    assert_eq!(orders.remaining("wool-socks"), Some(38));

    Ok(())
}

#[tokio::test]
async fn last_unit_race_has_exactly_one_winner() -> TestResult {
    let catalog = catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog));
    let service = CheckoutService::new(catalog, orders.clone());
    let bottle = ProductId::new("water-bottle");

    let mut first = memory_cart()?;
    let mut second = memory_cart()?;

    service.add_to_cart(&mut first, &bottle, 1, VariantSelection::None).await?;
    service.add_to_cart(&mut second, &bottle, 1, VariantSelection::None).await?;

    let address = address();

    let (a, b) = tokio::join!(
        service.place_order(&mut first, &address, PaymentMethod::Upi),
        service.place_order(&mut second, &address, PaymentMethod::CashOnDelivery),
    );

    let outcomes = [a.is_ok(), b.is_ok()];
    let exhausted = [&a, &b]
        .iter()
        .filter(|outcome| matches!(outcome, Err(CheckoutError::StockExhausted { .. })))
        .count();

    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert_eq!(exhausted, 1);
    assert_eq!(orders.remaining("water-bottle"), Some(0));

    // The loser's cart is exactly as it was.
    assert_eq!(first.len() + second.len(), 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_race_across_threads() -> TestResult {
    let catalog = catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog).with_stock("water-bottle", 1));
    let service = Arc::new(CheckoutService::new(catalog, orders.clone()));

    let mut handles = Vec::new();

    for _ in 0..8 {
        let service = Arc::clone(&service);

        handles.push(tokio::spawn(async move {
            let mut cart = memory_cart()?;

            service
                .add_to_cart(&mut cart, &ProductId::new("water-bottle"), 1, VariantSelection::None)
                .await?;

            let result = service
                .place_order(&mut cart, &address(), PaymentMethod::Card)
                .await;

            Ok::<_, CheckoutError>((result.is_ok(), cart.len()))
        }));
    }

    let mut winners = 0;

    for handle in handles {
        let (won, lines_left) = handle.await??;

        if won {
            winners += 1;
            assert_eq!(lines_left, 0);
        } else {
            assert_eq!(lines_left, 1);
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(orders.remaining("water-bottle"), Some(0));

    Ok(())
}

#[tokio::test]
async fn failed_submission_leaves_persisted_cart_untouched() -> TestResult {
    let dir = tempfile::tempdir()?;
    let catalog = catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog).with_stock("pixel-pro_Pro_256GB_12GB", 0));
    let service = CheckoutService::new(catalog, orders);

    let storage = Arc::new(FileStorage::new(dir.path()));
    let mut cart = CartStore::open(storage.clone())?;

    service
        .add_to_cart(
            &mut cart,
            &ProductId::new("pixel-pro"),
            2,
            VariantSelection::phone("Pro", "256GB", "12GB"),
        )
        .await?;

    let before = cart.snapshot();

    let result = service
        .place_order(&mut cart, &address(), PaymentMethod::PayPal)
        .await;

    assert!(
        matches!(result, Err(CheckoutError::StockExhausted { ref key, .. }) if key.as_str() == "pixel-pro_Pro_256GB_12GB"),
        "expected StockExhausted, got {result:?}"
    );
    assert_eq!(cart.snapshot(), before);
    assert_eq!(CartStore::open(storage)?.snapshot(), before);

    Ok(())
}

#[tokio::test]
async fn cash_on_delivery_is_paid_on_delivery_only() -> TestResult {
    let catalog = catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog));
    let service = CheckoutService::new(catalog, orders.clone());
    let mut cart = memory_cart()?;

    service
        .add_to_cart(&mut cart, &ProductId::new("wool-socks"), 1, VariantSelection::None)
        .await?;

    let placed = service
        .place_order(&mut cart, &address(), PaymentMethod::CashOnDelivery)
        .await?;

    assert_eq!(placed.order.payment_state, PaymentState::CodPending);

    let failed = orders.apply_event(
        placed.order.uuid,
        PaymentEvent::Failed {
            reason: "courier lost it".to_string(),
        },
    );

    assert!(matches!(failed, Err(OrderServiceError::Payment(_))));

    let delivered = orders.apply_event(placed.order.uuid, PaymentEvent::Delivered)?;

    assert_eq!(delivered.payment_state, PaymentState::Paid);

    Ok(())
}

#[derive(Debug)]
struct StalledOrderService;

#[async_trait]
impl OrderService for StalledOrderService {
    async fn submit_order(&self, _draft: &OrderDraft) -> Result<PlacedOrder, OrderServiceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;

        Err(OrderServiceError::Unavailable("stalled".to_string()))
    }

    async fn confirm_payment(
        &self,
        _order: OrderUuid,
        _confirmation: &PaymentConfirmation,
    ) -> Result<PlacedOrder, OrderServiceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;

        Err(OrderServiceError::Unavailable("stalled".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_submission_times_out_and_keeps_cart() -> TestResult {
    let service = CheckoutService::new(catalog()?, Arc::new(StalledOrderService))
        .with_timeout(Duration::from_secs(15));
    let mut cart = memory_cart()?;

    service
        .add_to_cart(&mut cart, &ProductId::new("wool-socks"), 3, VariantSelection::None)
        .await?;

    let result = service
        .place_order(&mut cart, &address(), PaymentMethod::Card)
        .await;

    assert!(
        matches!(
            result,
            Err(CheckoutError::Timeout { operation: "orders.submit_order", after })
                if after == Duration::from_secs(15)
        ),
        "expected Timeout, got {result:?}"
    );
    assert_eq!(cart.item_count(), 3);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stalled_confirmation_times_out() -> TestResult {
    let service = CheckoutService::new(catalog()?, Arc::new(StalledOrderService))
        .with_timeout(Duration::from_secs(5));
    let mut tracker = storefront::payments::PaymentTracker::new(PaymentMethod::Card);

    let result = service
        .confirm_payment(OrderUuid::new(), &mut tracker, &confirmation("tx-1"))
        .await;

    assert!(matches!(result, Err(CheckoutError::Timeout { .. })));
    assert_eq!(tracker.state(), PaymentState::AwaitingPayment);

    Ok(())
}

#[tokio::test]
async fn review_flags_quantities_above_live_stock() -> TestResult {
    let catalog = catalog()?;
    let service = CheckoutService::new(catalog, Arc::new(InMemoryOrderService::new()));
    let mut cart = memory_cart()?;

    let stale_phone = storefront::products::Product::new("pixel-pro", "Pixel Pro", Decimal::from(59_999))
        .with_smartphone_specs(vec![storefront::products::PhoneVariant::new("Pro", "128GB", "8GB", 5)]);

    cart.add_item(&stale_phone, 4, VariantSelection::phone("Pro", "128GB", "8GB"))?;

    let review = service.review(&mut cart).await?;
    let line = review.lines.first().ok_or("missing review line")?;

    assert!(line.needs_reconfirmation());
    assert!(line.price_changed());
    assert_eq!(line.live.available, 1);
    assert_eq!(cart.get_item("pixel-pro_Pro_128GB_8GB").map(|i| i.available_stock), Some(1));

    Ok(())
}
