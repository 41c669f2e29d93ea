//! Cart page controller.
//!
//! The cart is server-owned; this controller never patches it locally. Every
//! mutation is a PUT followed by a re-read so the rendered cart is always
//! ground truth. While one line's mutation is in flight that line is busy
//! and further mutations to the same `(product, size, color)` tuple are
//! rejected; unrelated lines proceed.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use tracing::instrument;

use blisora_core::ProductId;

use crate::api::CommerceClient;
use crate::api::types::{Cart, ItemVariant};
use crate::error::{self, PageError};
use crate::pages::NavigationTarget;

/// Flat shipping fee shown while the cart is the only known figure.
const FLAT_SHIPPING_FEE: i64 = 18;

/// Flat promotional discount shown alongside it.
const FLAT_DISCOUNT: i64 = 10;

/// Identity of a cart line: product plus variant selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant: Option<ItemVariant>,
}

/// The cart page's derived order summary.
///
/// A display-only estimate: the authoritative shipping and discount figures
/// are computed later during checkout and may differ, so nothing downstream
/// may treat this total as binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    /// Derive the summary from a subtotal.
    ///
    /// Shipping and discount apply only to non-empty carts, and the total
    /// never goes below zero.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let (shipping, discount) = if subtotal > Decimal::ZERO {
            (Decimal::from(FLAT_SHIPPING_FEE), Decimal::from(FLAT_DISCOUNT))
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };
        let total = (subtotal + shipping - discount).max(Decimal::ZERO);

        Self {
            subtotal,
            shipping,
            discount,
            total,
        }
    }
}

/// One rendered cart line.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub quantity: u32,
    pub variant: Option<ItemVariant>,
    pub image: Option<String>,
    /// Whether this line's controls are currently disabled.
    pub busy: bool,
}

/// Cart page view state.
#[derive(Debug, Clone)]
pub struct CartPageView {
    pub loading: bool,
    pub lines: Vec<CartLineView>,
    pub summary: CartSummary,
    /// Non-blocking notification text, if any.
    pub notice: Option<String>,
    /// Checkout is only reachable when the cart has at least one line.
    pub checkout_enabled: bool,
}

struct CartState {
    cart: Cart,
    loading: bool,
    notice: Option<String>,
    busy: HashSet<LineKey>,
}

/// Cart page controller.
pub struct CartPage {
    client: CommerceClient,
    state: Mutex<CartState>,
}

impl CartPage {
    /// New controller in the loading state.
    #[must_use]
    pub fn new(client: CommerceClient) -> Self {
        Self {
            client,
            state: Mutex::new(CartState {
                cart: Cart::default(),
                loading: true,
                notice: None,
                busy: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the cart.
    ///
    /// Any transport or non-2xx failure is treated as an empty cart with a
    /// non-blocking notice, never a page-level error.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        let result = self.client.get_cart().await;

        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(cart) => state.cart = cart,
            Err(e) => {
                error::report(&PageError::Api(e));
                state.cart = Cart::default();
                state.notice = Some("Failed to load cart".to_string());
            }
        }
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// Rejects while the same line is already mutating; other lines are
    /// unaffected. After the mutation the cart is re-fetched for ground
    /// truth.
    ///
    /// # Errors
    ///
    /// [`PageError::Busy`] when the line is mid-mutation, otherwise the
    /// underlying API failure.
    #[instrument(skip(self, variant), fields(product_id = %product_id, quantity))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
        variant: Option<&ItemVariant>,
    ) -> Result<(), PageError> {
        let key = LineKey {
            product_id: product_id.clone(),
            variant: variant.cloned(),
        };

        {
            let mut state = self.lock();
            if !state.busy.insert(key.clone()) {
                return Err(PageError::Busy(
                    "This item is already being updated".to_string(),
                ));
            }
        }

        let result = self.mutate_and_refresh(product_id, quantity, variant).await;

        let mut state = self.lock();
        state.busy.remove(&key);
        match result {
            Ok(cart) => {
                state.cart = cart;
                if quantity == 0 {
                    state.notice = Some("Item removed from cart".to_string());
                }
                Ok(())
            }
            Err(e) => {
                error::report(&e);
                Err(e)
            }
        }
    }

    async fn mutate_and_refresh(
        &self,
        product_id: &ProductId,
        quantity: u32,
        variant: Option<&ItemVariant>,
    ) -> Result<Cart, PageError> {
        self.client
            .update_cart(product_id, quantity, variant)
            .await?;
        // Re-read rather than trusting the mutation response; the backend
        // guarantees the read reflects the mutation just acknowledged.
        Ok(self.client.get_cart().await?)
    }

    /// Remove a line entirely. Sugar for a zero-quantity mutation.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_quantity`].
    pub async fn remove_line(
        &self,
        product_id: &ProductId,
        variant: Option<&ItemVariant>,
    ) -> Result<(), PageError> {
        self.set_quantity(product_id, 0, variant).await
    }

    /// Whether a line currently has a mutation in flight.
    #[must_use]
    pub fn is_line_busy(&self, product_id: &ProductId, variant: Option<&ItemVariant>) -> bool {
        let key = LineKey {
            product_id: product_id.clone(),
            variant: variant.cloned(),
        };
        self.lock().busy.contains(&key)
    }

    /// Snapshot the page state for rendering.
    #[must_use]
    pub fn view(&self) -> CartPageView {
        let state = self.lock();
        let lines = state
            .cart
            .items
            .iter()
            .map(|item| {
                let key = LineKey {
                    product_id: item.product.id.clone(),
                    variant: item.variant.clone(),
                };
                CartLineView {
                    product_id: item.product.id.clone(),
                    name: item.product.name.clone(),
                    unit_price: item.product.price,
                    line_total: item.line_total(),
                    quantity: item.quantity,
                    variant: item.variant.clone(),
                    image: item.product.images.first().cloned(),
                    busy: state.busy.contains(&key),
                }
            })
            .collect::<Vec<_>>();

        let subtotal = state.cart.subtotal.unwrap_or_default();

        CartPageView {
            loading: state.loading,
            summary: CartSummary::from_subtotal(subtotal),
            notice: state.notice.clone(),
            checkout_enabled: !lines.is_empty(),
            lines,
        }
    }

    /// Clear the current notice once the shell has shown it.
    pub fn dismiss_notice(&self) {
        self.lock().notice = None;
    }

    /// Navigation intent for the checkout button.
    ///
    /// `None` while the cart is empty; the button stays disabled.
    #[must_use]
    pub fn checkout_target(&self) -> Option<NavigationTarget> {
        if self.lock().cart.is_empty() {
            None
        } else {
            Some(NavigationTarget::Checkout)
        }
    }
}
