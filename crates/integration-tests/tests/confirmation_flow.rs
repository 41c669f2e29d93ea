//! Confirmation and tracking behaviour: terminal states, draft consumption,
//! reload safety, and the reference+contact lookup.
//!
//! Run with: cargo test -p blisora-integration-tests

use blisora_core::{OrderRef, PaymentMethod};
use blisora_integration_tests::TestContext;
use blisora_storefront::pages::checkout::CheckoutPage;
use blisora_storefront::pages::confirmation::{ConfirmationPage, ConfirmationState};
use blisora_storefront::pages::tracking::TrackingPage;

/// Drive a cash checkout so an order and a draft exist.
async fn place_cash_order(ctx: &TestContext) -> OrderRef {
    ctx.mock.stock_cart("p-serene", "Serene Bloom", 145.0, 2);

    let mut checkout = CheckoutPage::new(ctx.client.clone(), ctx.store.clone());
    checkout.load().await;
    checkout.form.full_name = "Alexandra Bloom".to_string();
    checkout.form.email = "alexandra@email.com".to_string();
    checkout.form.phone = "+1 555 010 2030".to_string();
    checkout.form.shipping_address = "125 Blossom Avenue".to_string();
    checkout.form.city = "New York".to_string();
    checkout.form.postal_code = "10001".to_string();
    checkout.form.country = "United States".to_string();
    checkout.form.payment_method = PaymentMethod::Cash;

    checkout.submit().await.expect("checkout should succeed");
    ctx.store
        .pending_order()
        .expect("store read")
        .expect("echo persisted")
        .order_ref
}

#[tokio::test]
async fn test_missing_reference_is_terminal_without_network() {
    let ctx = TestContext::new().await;

    let mut page = ConfirmationPage::new(ctx.client.clone(), ctx.store.clone());
    page.load(None).await;

    assert!(matches!(page.state(), ConfirmationState::MissingReference));
    assert_eq!(ctx.mock.hits().total(), 0);
}

#[tokio::test]
async fn test_load_attaches_draft_contact_and_consumes_draft() {
    let ctx = TestContext::new().await;
    let order_ref = place_cash_order(&ctx).await;

    let mut page = ConfirmationPage::new(ctx.client.clone(), ctx.store.clone());
    page.load(Some(order_ref.clone())).await;

    let ConfirmationState::Loaded(order) = page.state() else {
        panic!("confirmation should load");
    };
    assert_eq!(&order.order_ref, &order_ref);

    // The guest contact from the draft rode along as the ownership check.
    let query = ctx.mock.last_order_query().expect("lookup recorded");
    assert_eq!(query.get("orderRef").map(String::as_str), Some(order_ref.as_str()));
    assert_eq!(
        query.get("email").map(String::as_str),
        Some("alexandra@email.com")
    );

    // One-time use: the draft is gone after a successful load.
    assert!(ctx.store.checkout_draft().expect("store read").is_none());

    // Reload-safe: a second load works without the draft (reference-only).
    let mut again = ConfirmationPage::new(ctx.client.clone(), ctx.store.clone());
    again.load(Some(order_ref)).await;
    assert!(matches!(again.state(), ConfirmationState::Loaded(_)));
    let query = ctx.mock.last_order_query().expect("lookup recorded");
    assert_eq!(query.get("email").map(String::as_str), None);
}

#[tokio::test]
async fn test_unknown_reference_renders_not_found() {
    let ctx = TestContext::new().await;

    let mut page = ConfirmationPage::new(ctx.client.clone(), ctx.store.clone());
    page.load(Some(OrderRef::new("BLIS-9999"))).await;

    assert!(matches!(page.state(), ConfirmationState::NotFound(_)));
}

#[tokio::test]
async fn test_tracking_target_carries_reference_and_email() {
    let ctx = TestContext::new().await;
    let order_ref = place_cash_order(&ctx).await;

    let mut page = ConfirmationPage::new(ctx.client.clone(), ctx.store.clone());
    page.load(Some(order_ref.clone())).await;

    let target = page.tracking_target().expect("loaded order has a target");
    assert_eq!(
        target,
        blisora_storefront::pages::NavigationTarget::Tracking {
            order_ref,
            email: Some("alexandra@email.com".to_string()),
        }
    );
}

#[tokio::test]
async fn test_tracking_lookup_classifies_contact() {
    let ctx = TestContext::new().await;
    let order_ref = place_cash_order(&ctx).await;
    let tracking = TrackingPage::new(ctx.client.clone());

    // An @ makes it an email.
    let order = tracking
        .check_status(order_ref.as_str(), "alexandra@email.com")
        .await
        .expect("email lookup should succeed");
    assert_eq!(&order.order_ref, &order_ref);
    let query = ctx.mock.last_order_query().expect("lookup recorded");
    assert!(query.contains_key("email"));
    assert!(!query.contains_key("phone"));

    // Anything else is a phone number.
    tracking
        .check_status(order_ref.as_str(), "+1 555 010 2030")
        .await
        .expect("phone lookup should succeed");
    let query = ctx.mock.last_order_query().expect("lookup recorded");
    assert!(query.contains_key("phone"));
    assert!(!query.contains_key("email"));
}

#[tokio::test]
async fn test_tracking_requires_a_reference() {
    let ctx = TestContext::new().await;
    let tracking = TrackingPage::new(ctx.client.clone());

    let result = tracking.check_status("   ", "alexandra@email.com").await;
    assert!(result.is_err());
    assert_eq!(ctx.mock.hits().total(), 0);
}

#[tokio::test]
async fn test_tracking_miss_is_classified_not_found() {
    let ctx = TestContext::new().await;
    let tracking = TrackingPage::new(ctx.client.clone());

    let result = tracking.check_status("BLIS-404", "").await;
    let err = result.expect_err("unknown reference should miss");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_wrong_contact_fails_the_ownership_check() {
    let ctx = TestContext::new().await;
    let order_ref = place_cash_order(&ctx).await;
    let tracking = TrackingPage::new(ctx.client.clone());

    let result = tracking
        .check_status(order_ref.as_str(), "intruder@email.com")
        .await;
    let err = result.expect_err("mismatched contact should be rejected");
    assert!(err.is_not_found());
}
