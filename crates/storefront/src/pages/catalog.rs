//! Catalog (shop) page controller.
//!
//! Products come from the backend already filtered by search text and
//! audience; this controller owns audience persistence, the stale-result
//! guard for superseded searches, and the projection to card items.

use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use tracing::instrument;

use blisora_core::{Audience, ProductId, slugify};

use crate::api::CommerceClient;
use crate::api::types::Product;
use crate::error::{self, PageError};
use crate::store::StateStore;

/// A product projected for the card grid.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    /// Slug derived from the name; detail pages are addressed by it.
    pub slug: String,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    /// Category label; raw object-id references are suppressed.
    pub category: Option<String>,
    pub description: String,
    pub stock: i64,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            slug: slugify(&product.name),
            name: product.name.clone(),
            price: product.price,
            image: product.images.first().cloned(),
            category: product
                .category
                .as_ref()
                .and_then(|c| c.display_name())
                .map(str::to_string),
            description: product.description.clone().unwrap_or_default(),
            stock: product.total_stock.unwrap_or(0),
        }
    }
}

/// What happened to a product load once it resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The result was applied to the page.
    Applied,
    /// A newer load started meanwhile; this result was discarded.
    Superseded,
}

/// Catalog page view state.
#[derive(Debug, Clone)]
pub struct CatalogView {
    pub audience: Option<Audience>,
    pub loading: bool,
    pub error: Option<String>,
    pub cards: Vec<ProductCard>,
}

struct CatalogState {
    audience: Option<Audience>,
    products: Vec<Product>,
    loading: bool,
    error: Option<String>,
    /// Ticket of the most recently started load; older completions discard.
    latest_load: u64,
}

/// Catalog page controller.
pub struct CatalogPage {
    client: CommerceClient,
    store: StateStore,
    state: Mutex<CatalogState>,
}

impl CatalogPage {
    /// New controller; call [`Self::enter`] before the first load.
    #[must_use]
    pub fn new(client: CommerceClient, store: StateStore) -> Self {
        Self {
            client,
            store,
            state: Mutex::new(CatalogState {
                audience: None,
                products: Vec::new(),
                loading: false,
                error: None,
                latest_load: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the audience on page entry.
    ///
    /// An explicit navigation parameter wins and is persisted; otherwise the
    /// last persisted choice is restored. Persistence failures degrade to an
    /// unfiltered shelf.
    pub fn enter(&self, audience_param: Option<Audience>) {
        let audience = match audience_param {
            Some(audience) => {
                if let Err(e) = self.store.set_audience(audience) {
                    error::report(&PageError::Store(e));
                }
                Some(audience)
            }
            None => self.store.audience().unwrap_or_else(|e| {
                error::report(&PageError::Store(e));
                None
            }),
        };

        self.lock().audience = audience;
    }

    /// The active audience filter.
    #[must_use]
    pub fn audience(&self) -> Option<Audience> {
        self.lock().audience
    }

    /// Load products for the current audience and the given search text.
    ///
    /// Each call supersedes any earlier in-flight load: when an older load
    /// resolves after a newer one has started, its result (success or
    /// failure) is discarded. Callers that can drop the future get a true
    /// abort; this guard covers the ones that cannot.
    ///
    /// # Errors
    ///
    /// The underlying API failure, after it has been recorded in the view
    /// state. A superseded failure is not an error.
    #[instrument(skip(self))]
    pub async fn load_products(&self, search: &str) -> Result<SearchOutcome, PageError> {
        let (ticket, gender) = {
            let mut state = self.lock();
            state.latest_load += 1;
            state.loading = true;
            state.error = None;
            (
                state.latest_load,
                state.audience.and_then(Audience::gender_param),
            )
        };

        let query = search.trim();
        let query = (!query.is_empty()).then_some(query);
        let result = self.client.list_products(query, gender).await;

        let mut state = self.lock();
        if state.latest_load != ticket {
            return Ok(SearchOutcome::Superseded);
        }
        state.loading = false;

        match result {
            Ok(products) => {
                state.products = products;
                Ok(SearchOutcome::Applied)
            }
            Err(e) => {
                let e = PageError::Api(e);
                error::report(&e);
                state.error = Some("Failed to load products.".to_string());
                Err(e)
            }
        }
    }

    /// Snapshot the page state for rendering.
    #[must_use]
    pub fn view(&self) -> CatalogView {
        let state = self.lock();
        CatalogView {
            audience: state.audience,
            loading: state.loading,
            error: state.error.clone(),
            cards: state.products.iter().map(ProductCard::from).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::types::CategoryRef;

    fn product(name: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "name": name,
            "price": 165
        }))
        .unwrap()
    }

    #[test]
    fn test_card_projection_derives_slug() {
        let card = ProductCard::from(&product("Nocturne Veil"));
        assert_eq!(card.slug, "nocturne-veil");
        assert_eq!(card.price, Decimal::from(165));
        assert_eq!(card.stock, 0);
        assert!(card.image.is_none());
    }

    #[test]
    fn test_card_projection_suppresses_object_id_category() {
        let mut raw = product("Silk Petals");
        raw.category = Some(CategoryRef::Inline("64f1aa00bc1234567890abcd".to_string()));
        assert_eq!(ProductCard::from(&raw).category, None);

        raw.category = Some(CategoryRef::Inline("Powdered Rose".to_string()));
        assert_eq!(
            ProductCard::from(&raw).category.as_deref(),
            Some("Powdered Rose")
        );
    }
}
