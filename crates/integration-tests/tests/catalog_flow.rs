//! Catalog and product-detail behaviour: audience persistence, search with
//! the superseding guard, slug resolution, and add-to-cart.
//!
//! Run with: cargo test -p blisora-integration-tests

use blisora_core::Audience;
use blisora_integration_tests::TestContext;
use blisora_storefront::pages::catalog::{CatalogPage, SearchOutcome};
use blisora_storefront::pages::product::{ProductDetailPage, ProductDetailState};

#[tokio::test]
async fn test_audience_param_wins_and_is_persisted() {
    let ctx = TestContext::new().await;

    let page = CatalogPage::new(ctx.client.clone(), ctx.store.clone());
    page.enter(Some(Audience::Her));
    assert_eq!(page.audience(), Some(Audience::Her));
    assert_eq!(ctx.store.audience().expect("store read"), Some(Audience::Her));

    page.load_products("").await.expect("load should succeed");
    let view = page.view();
    assert_eq!(view.cards.len(), 3);
    assert!(view.cards.iter().all(|card| {
        ["Nocturne Veil", "Serene Bloom", "Silk Petals"].contains(&card.name.as_str())
    }));

    // A later visit without a param restores the persisted choice.
    let returning = CatalogPage::new(ctx.client.clone(), ctx.store.clone());
    returning.enter(None);
    assert_eq!(returning.audience(), Some(Audience::Her));
}

#[tokio::test]
async fn test_unisex_means_no_gender_filter() {
    let ctx = TestContext::new().await;

    let page = CatalogPage::new(ctx.client.clone(), ctx.store.clone());
    page.enter(Some(Audience::Unisex));
    page.load_products("").await.expect("load should succeed");

    assert_eq!(page.view().cards.len(), 6);
}

#[tokio::test]
async fn test_search_filters_and_projects_cards() {
    let ctx = TestContext::new().await;

    let page = CatalogPage::new(ctx.client.clone(), ctx.store.clone());
    page.enter(None);
    page.load_products("lune").await.expect("load should succeed");

    let view = page.view();
    assert_eq!(view.cards.len(), 1);
    let card = &view.cards[0];
    assert_eq!(card.name, "Lune Noire");
    assert_eq!(card.slug, "lune-noire");
    assert_eq!(card.image.as_deref(), Some("p-lune.jpg"));
}

#[tokio::test]
async fn test_superseded_search_is_discarded() {
    let ctx = TestContext::new().await;

    let page = CatalogPage::new(ctx.client.clone(), ctx.store.clone());
    page.enter(None);

    // The second load starts before the first resolves; whatever order the
    // responses land in, only the newer one may shape the page.
    let (stale, fresh) = tokio::join!(page.load_products("lune"), page.load_products(""));
    assert_eq!(stale.expect("stale load resolves"), SearchOutcome::Superseded);
    assert_eq!(fresh.expect("fresh load resolves"), SearchOutcome::Applied);

    assert_eq!(page.view().cards.len(), 6);
}

#[tokio::test]
async fn test_slug_resolution_and_add_to_cart() {
    let ctx = TestContext::new().await;

    let mut page = ProductDetailPage::new(ctx.client.clone());
    page.load("lune-noire").await;
    let ProductDetailState::Loaded(product) = page.state() else {
        panic!("slug should resolve");
    };
    assert_eq!(product.name, "Lune Noire");
    assert!(!page.is_in_cart());

    page.increment_quantity();
    assert_eq!(page.quantity(), 2);

    page.add_to_cart().await.expect("add should succeed");
    assert_eq!(ctx.mock.cart_lines(), vec![("p-lune".to_string(), 2)]);
    assert!(page.is_in_cart());
    assert_eq!(page.quantity(), 1, "selector resets after adding");
    assert!(page.take_notice().is_some());
}

#[tokio::test]
async fn test_unknown_slug_is_not_found() {
    let ctx = TestContext::new().await;

    let mut page = ProductDetailPage::new(ctx.client.clone());
    page.load("no-such-fragrance").await;
    assert!(matches!(page.state(), ProductDetailState::NotFound));
}
