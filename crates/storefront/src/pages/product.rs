//! Product detail page controller.
//!
//! Detail pages are addressed by a slug derived from the product name. The
//! backend has no slug lookup, so resolution fetches the product list and
//! matches on the derived slug; a miss is a not-found state, not an error
//! banner.

use tracing::instrument;

use blisora_core::slugify;

use crate::api::CommerceClient;
use crate::api::types::{Cart, Product};
use crate::error::{self, PageError};

/// Detail page state.
#[derive(Debug)]
pub enum ProductDetailState {
    Loading,
    /// No product matched the slug (or the catalog failed to load).
    NotFound,
    Loaded(Product),
}

/// Product detail page controller.
pub struct ProductDetailPage {
    client: CommerceClient,
    state: ProductDetailState,
    cart: Option<Cart>,
    quantity: u32,
    adding: bool,
    notice: Option<String>,
}

impl ProductDetailPage {
    /// New controller in the loading state.
    #[must_use]
    pub fn new(client: CommerceClient) -> Self {
        Self {
            client,
            state: ProductDetailState::Loading,
            cart: None,
            quantity: 1,
            adding: false,
            notice: None,
        }
    }

    /// Resolve the slug and fetch the cart (for the already-in-cart state).
    ///
    /// A failed cart fetch only loses the in-cart hint; the page still
    /// renders.
    #[instrument(skip(self))]
    pub async fn load(&mut self, slug: &str) {
        self.state = match self.client.list_products(None, None).await {
            Ok(products) => products
                .into_iter()
                .find(|p| slugify(&p.name) == slug)
                .map_or(ProductDetailState::NotFound, ProductDetailState::Loaded),
            Err(e) => {
                error::report(&PageError::Api(e));
                ProductDetailState::NotFound
            }
        };

        match self.client.get_cart().await {
            Ok(cart) => self.cart = Some(cart),
            Err(e) => error::report(&PageError::Api(e)),
        }
    }

    /// Current page state.
    #[must_use]
    pub const fn state(&self) -> &ProductDetailState {
        &self.state
    }

    /// Quantity selected for the add-to-cart action (minimum 1).
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Bump the selected quantity.
    pub const fn increment_quantity(&mut self) {
        self.quantity += 1;
    }

    /// Lower the selected quantity, stopping at 1.
    pub const fn decrement_quantity(&mut self) {
        if self.quantity > 1 {
            self.quantity -= 1;
        }
    }

    /// Whether the resolved product already has a cart line.
    #[must_use]
    pub fn is_in_cart(&self) -> bool {
        let ProductDetailState::Loaded(product) = &self.state else {
            return false;
        };
        self.cart.as_ref().is_some_and(|cart| {
            cart.items.iter().any(|item| item.product.id == product.id)
        })
    }

    /// Whether the add-to-cart action is in flight.
    #[must_use]
    pub const fn is_adding(&self) -> bool {
        self.adding
    }

    /// One-shot notification text (e.g. "Added to cart").
    #[must_use]
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Add the selected quantity to the cart, then re-read the cart.
    ///
    /// Resets the quantity selector to 1 on success.
    ///
    /// # Errors
    ///
    /// [`PageError::Busy`] while a previous add is still in flight;
    /// [`PageError::Validation`] if no product is loaded; otherwise the API
    /// failure.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&mut self) -> Result<(), PageError> {
        if self.adding {
            return Err(PageError::Busy("Add to cart already in flight".to_string()));
        }
        let ProductDetailState::Loaded(product) = &self.state else {
            return Err(PageError::Validation("No product loaded".to_string()));
        };
        let (product_id, name) = (product.id.clone(), product.name.clone());
        let quantity = self.quantity;

        self.adding = true;
        let result = self.client.add_to_cart(&product_id, quantity).await;
        self.adding = false;

        match result {
            Ok(_) => {
                // Ground truth, same as the cart page: re-read, don't patch.
                match self.client.get_cart().await {
                    Ok(cart) => self.cart = Some(cart),
                    Err(e) => error::report(&PageError::Api(e)),
                }
                self.notice = Some(format!("{quantity} x {name} added to cart"));
                self.quantity = 1;
                Ok(())
            }
            Err(e) => {
                let e = PageError::Api(e);
                error::report(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_never_drops_below_one() {
        let client = test_client();
        let mut page = ProductDetailPage::new(client);
        page.decrement_quantity();
        assert_eq!(page.quantity(), 1);

        page.increment_quantity();
        page.increment_quantity();
        assert_eq!(page.quantity(), 3);

        page.decrement_quantity();
        assert_eq!(page.quantity(), 2);
    }

    fn test_client() -> CommerceClient {
        let config = crate::config::StorefrontConfig {
            api_base_url: "http://localhost:0/api".to_string(),
            state_path: std::path::PathBuf::from("unused.json"),
            sentry_dsn: None,
            sentry_environment: None,
        };
        #[allow(clippy::unwrap_used)]
        CommerceClient::new(&config, &blisora_core::SessionId::new("test-session")).unwrap()
    }
}
