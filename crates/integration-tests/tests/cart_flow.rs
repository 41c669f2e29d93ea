//! Cart page behaviour against the mock backend.
//!
//! Run with: cargo test -p blisora-integration-tests

use std::time::Duration;

use rust_decimal::Decimal;

use blisora_core::ProductId;
use blisora_integration_tests::TestContext;
use blisora_storefront::api::types::ItemVariant;
use blisora_storefront::error::PageError;
use blisora_storefront::pages::NavigationTarget;
use blisora_storefront::pages::cart::CartPage;

#[tokio::test]
async fn test_load_failure_reads_as_empty_cart_with_notice() {
    let ctx = TestContext::new().await;
    ctx.mock.fail_cart_get(true);

    let page = CartPage::new(ctx.client.clone());
    page.load().await;

    let view = page.view();
    assert!(!view.loading);
    assert!(view.lines.is_empty());
    assert_eq!(view.notice.as_deref(), Some("Failed to load cart"));
    assert!(!view.checkout_enabled);
    assert_eq!(page.checkout_target(), None);
}

#[tokio::test]
async fn test_zero_quantity_removes_line_and_repeat_is_noop() {
    let ctx = TestContext::new().await;
    ctx.mock.stock_cart("p-nocturne", "Nocturne Veil", 165.0, 1);

    let page = CartPage::new(ctx.client.clone());
    page.load().await;
    assert_eq!(page.view().lines.len(), 1);

    let product = ProductId::new("p-nocturne");
    page.set_quantity(&product, 0, None)
        .await
        .expect("removal should succeed");

    let view = page.view();
    assert!(view.lines.is_empty());
    assert_eq!(view.notice.as_deref(), Some("Item removed from cart"));
    assert!(ctx.mock.cart_lines().is_empty());

    // Idempotent: removing an already-removed line is a no-op, not an error.
    page.set_quantity(&product, 0, None)
        .await
        .expect("repeat removal should be a no-op");
    assert!(page.view().lines.is_empty());
}

#[tokio::test]
async fn test_variant_lines_are_distinct() {
    let ctx = TestContext::new().await;
    ctx.mock
        .stock_cart_variant("p-silk", "Silk Petals", 160.0, 1, "50ml");
    ctx.mock.stock_cart("p-silk", "Silk Petals", 160.0, 2);

    let page = CartPage::new(ctx.client.clone());
    page.load().await;
    assert_eq!(page.view().lines.len(), 2);

    // Removing the 50ml line leaves the variant-less line untouched.
    let variant = ItemVariant {
        size: Some("50ml".to_string()),
        color: None,
    };
    page.set_quantity(&ProductId::new("p-silk"), 0, Some(&variant))
        .await
        .expect("variant removal should succeed");

    assert_eq!(ctx.mock.cart_lines(), vec![("p-silk".to_string(), 2)]);
}

#[tokio::test]
async fn test_same_line_is_locked_while_mutating_but_others_proceed() {
    let ctx = TestContext::new().await;
    ctx.mock.stock_cart("p-nocturne", "Nocturne Veil", 165.0, 1);
    ctx.mock.stock_cart("p-lune", "Lune Noire", 190.0, 1);
    ctx.mock.delay_cart_updates(Duration::from_millis(100));

    let page = CartPage::new(ctx.client.clone());
    page.load().await;

    let nocturne = ProductId::new("p-nocturne");
    let lune = ProductId::new("p-lune");

    // Second mutation of the same line starts while the first is in flight.
    let (first, second) = tokio::join!(
        page.set_quantity(&nocturne, 2, None),
        page.set_quantity(&nocturne, 3, None),
    );
    first.expect("first mutation should win");
    assert!(matches!(second, Err(PageError::Busy(_))));

    // Unrelated lines are not blocked by each other.
    let (first, second) = tokio::join!(
        page.set_quantity(&nocturne, 4, None),
        page.set_quantity(&lune, 5, None),
    );
    first.expect("nocturne mutation should succeed");
    second.expect("lune mutation should proceed concurrently");

    let mut lines = ctx.mock.cart_lines();
    lines.sort();
    assert_eq!(
        lines,
        vec![("p-lune".to_string(), 5), ("p-nocturne".to_string(), 4)]
    );
}

#[tokio::test]
async fn test_summary_applies_flat_fees_to_stored_subtotal() {
    let ctx = TestContext::new().await;
    ctx.mock.stock_cart("p-nocturne", "Nocturne Veil", 165.0, 1);

    let page = CartPage::new(ctx.client.clone());
    page.load().await;

    let summary = page.view().summary;
    assert_eq!(summary.subtotal, Decimal::from(165));
    assert_eq!(summary.shipping, Decimal::from(18));
    assert_eq!(summary.discount, Decimal::from(10));
    assert_eq!(summary.total, Decimal::from(173));

    assert_eq!(page.checkout_target(), Some(NavigationTarget::Checkout));
}

#[tokio::test]
async fn test_session_rides_both_channels() {
    let ctx = TestContext::new().await;
    let page = CartPage::new(ctx.client.clone());

    // First load: the shim header arrives, and the backend sets its cookie.
    page.load().await;
    let expected = ctx
        .store
        .guest_session_id()
        .expect("session id should exist")
        .into_inner();
    assert_eq!(ctx.mock.last_session_header(), Some(expected));
    assert!(!ctx.mock.cookie_replayed());

    // Second load: the authoritative cookie is replayed from the jar.
    page.load().await;
    assert!(ctx.mock.cookie_replayed());
}
