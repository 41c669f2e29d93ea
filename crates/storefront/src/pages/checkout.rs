//! Checkout page controller.
//!
//! One page, one state machine:
//!
//! ```text
//! Loading -> Ready -> Submitting -> CardHandoff   (terminal)
//!                 ^              -> CashSuccess   (terminal)
//!                 |              -> Ready          (failed submit)
//! Loading -> EmptyCart                             (nothing to buy)
//! ```
//!
//! On success the created order and the submitted draft are persisted
//! locally so the payment page can rebuild its summary without a network
//! round trip and the confirmation page can attach the guest's contact to
//! its lookup. A failed submit never clears the draft.

use rust_decimal::Decimal;
use tracing::{instrument, warn};

use blisora_core::PaymentMethod;

use crate::api::CommerceClient;
use crate::api::types::{Cart, CheckoutRequest, CustomerInfo};
use crate::error::{self, PageError};
use crate::pages::{DelayedNavigation, NavigationTarget};
use crate::store::StateStore;

/// Where the checkout page is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// Fetching the cart and the shipping quote.
    Loading,
    /// Cart is empty (or failed to load); nothing to submit.
    EmptyCart,
    /// Form is editable and submittable.
    Ready,
    /// Submission in flight; the submit button is the only disabled surface.
    Submitting,
    /// Cash order placed; confirmation redirect pending.
    CashSuccess,
    /// Card order placed; handed off to the payment page.
    CardHandoff,
}

/// What a successful submission resolved to.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Cash on delivery: show the success screen, then redirect after the
    /// standard delay.
    CashSuccess(DelayedNavigation),
    /// Card: navigate to the payment page immediately.
    CardHandoff(NavigationTarget),
}

/// Editable checkout form state.
///
/// Lives only in page memory until a submit succeeds; a reload starts blank.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    /// Billing address mirrors shipping unless unchecked.
    pub billing_same: bool,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_postal: String,
    /// Free text, passed through verbatim; the backend owns validation.
    pub coupon_code: String,
    pub payment_method: PaymentMethod,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            shipping_address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            country: String::new(),
            billing_same: true,
            billing_address: String::new(),
            billing_city: String::new(),
            billing_postal: String::new(),
            coupon_code: String::new(),
            payment_method: PaymentMethod::Card,
        }
    }
}

impl CheckoutForm {
    /// Whether every required field is present.
    ///
    /// Required: full name, email, phone, shipping address line, city,
    /// postal code, country. Billing fields are never required even when
    /// the billing block is unchecked.
    #[must_use]
    pub fn has_required_fields(&self) -> bool {
        ![
            &self.full_name,
            &self.email,
            &self.phone,
            &self.shipping_address,
            &self.city,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .any(|field| field.is_empty())
    }

    /// Flatten the form into the wire payload.
    ///
    /// Addresses become single display strings; a billing address equal to
    /// the shipping one is transmitted as the empty string, which the
    /// backend reads as "use shipping".
    #[must_use]
    pub fn to_request(&self) -> CheckoutRequest {
        let billing_address = if self.billing_same {
            String::new()
        } else {
            format!(
                "{}, {}, {}",
                self.billing_address, self.billing_city, self.billing_postal
            )
        };

        CheckoutRequest {
            customer: CustomerInfo {
                full_name: self.full_name.clone(),
                email: self.email.clone(),
                phone: self.phone.clone(),
                shipping_address: format!(
                    "{}, {}, {}, {}",
                    self.shipping_address, self.city, self.postal_code, self.country
                ),
                billing_address,
            },
            coupon_code: (!self.coupon_code.is_empty()).then(|| self.coupon_code.clone()),
            payment_method: self.payment_method,
        }
    }
}

/// One line of the order summary sidebar.
#[derive(Debug, Clone)]
pub struct SummaryLine {
    pub name: String,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Order summary shown beside the form.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub lines: Vec<SummaryLine>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

/// Checkout page controller.
pub struct CheckoutPage {
    client: CommerceClient,
    store: StateStore,
    phase: CheckoutPhase,
    cart: Option<Cart>,
    shipping_cost: Decimal,
    /// The editable draft.
    pub form: CheckoutForm,
    error: Option<String>,
}

impl CheckoutPage {
    /// New controller in the loading state.
    #[must_use]
    pub fn new(client: CommerceClient, store: StateStore) -> Self {
        Self {
            client,
            store,
            phase: CheckoutPhase::Loading,
            cart: None,
            shipping_cost: Decimal::ZERO,
            form: CheckoutForm::default(),
            error: None,
        }
    }

    /// Fetch the cart and, for a non-empty cart, a shipping quote keyed by
    /// the current subtotal.
    ///
    /// A failed quote is non-fatal: shipping defaults to 0 and the customer
    /// may still submit.
    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.phase = CheckoutPhase::Loading;

        let cart = match self.client.get_cart().await {
            Ok(cart) => cart,
            Err(e) => {
                error::report(&PageError::Api(e));
                self.error = Some("Failed to load cart".to_string());
                self.phase = CheckoutPhase::EmptyCart;
                return;
            }
        };

        if cart.is_empty() {
            self.cart = Some(cart);
            self.phase = CheckoutPhase::EmptyCart;
            return;
        }

        let subtotal = cart.line_subtotal();
        self.shipping_cost = match self.client.shipping_quote(subtotal).await {
            Ok(quote) => quote.shipping_cost,
            Err(e) => {
                warn!(error = %e, "Shipping quote failed, defaulting to 0");
                Decimal::ZERO
            }
        };

        self.cart = Some(cart);
        self.phase = CheckoutPhase::Ready;
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    /// Last submit or load error, already user-facing.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Quoted shipping cost for the summary.
    #[must_use]
    pub const fn shipping_cost(&self) -> Decimal {
        self.shipping_cost
    }

    /// Summary beside the form: lines, subtotal, quoted shipping, total.
    ///
    /// No discount line here; discounts are resolved server-side at
    /// submission and appear on the created order.
    #[must_use]
    pub fn summary(&self) -> CheckoutSummary {
        let lines = self.cart.as_ref().map_or_else(Vec::new, |cart| {
            cart.items
                .iter()
                .map(|item| SummaryLine {
                    name: item.product.name.clone(),
                    quantity: item.quantity,
                    line_total: item.line_total(),
                })
                .collect()
        });
        let subtotal = self
            .cart
            .as_ref()
            .map_or(Decimal::ZERO, Cart::line_subtotal);

        CheckoutSummary {
            lines,
            subtotal,
            shipping_cost: self.shipping_cost,
            total: subtotal + self.shipping_cost,
        }
    }

    /// Submit the draft.
    ///
    /// Local preconditions short-circuit before any request: every required
    /// field present, a non-empty cart, no submit already in flight. On a
    /// server rejection the page returns to [`CheckoutPhase::Ready`] with
    /// the server's message and the draft intact.
    ///
    /// # Errors
    ///
    /// [`PageError::Validation`] for missing fields or an empty cart,
    /// [`PageError::Busy`] for a duplicate submit, otherwise the API or
    /// persistence failure.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<CheckoutOutcome, PageError> {
        if self.phase == CheckoutPhase::Submitting {
            return Err(PageError::Busy("Checkout already in flight".to_string()));
        }
        self.error = None;

        if !self.form.has_required_fields() {
            let message = "Please fill in all required fields".to_string();
            self.error = Some(message.clone());
            return Err(PageError::Validation(message));
        }
        if self.cart.as_ref().is_none_or(Cart::is_empty) {
            let message = "Cart is empty".to_string();
            self.error = Some(message.clone());
            return Err(PageError::Validation(message));
        }

        let request = self.form.to_request();
        self.phase = CheckoutPhase::Submitting;

        let order = match self.client.submit_checkout(&request).await {
            Ok(order) => order,
            Err(e) => {
                let e = PageError::Api(e);
                error::report(&e);
                self.error = Some(e.user_message());
                self.phase = CheckoutPhase::Ready;
                return Err(e);
            }
        };

        // Persist the echo for the payment page and the draft for the
        // confirmation lookup before any navigation can happen.
        if let Err(e) = self
            .store
            .set_pending_order(&order)
            .and_then(|()| self.store.set_checkout_draft(&request))
        {
            let e = PageError::Store(e);
            error::report(&e);
            self.error = Some(e.user_message());
            self.phase = CheckoutPhase::Ready;
            return Err(e);
        }

        // The backend is not known to clear the cart on checkout; clear it
        // explicitly, best-effort. Contract to confirm with the backend
        // owner.
        if let Err(e) = self.client.clear_cart().await {
            warn!(error = %e, "Post-checkout cart clear failed");
        }

        match request.payment_method {
            PaymentMethod::Cash => {
                self.phase = CheckoutPhase::CashSuccess;
                Ok(CheckoutOutcome::CashSuccess(DelayedNavigation::new(
                    NavigationTarget::Confirmation {
                        order_ref: order.order_ref,
                    },
                )))
            }
            PaymentMethod::Card => {
                self.phase = CheckoutPhase::CardHandoff;
                Ok(CheckoutOutcome::CardHandoff(NavigationTarget::Payment {
                    order_id: order.id,
                }))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled_form() -> CheckoutForm {
        CheckoutForm {
            full_name: "Alexandra Bloom".to_string(),
            email: "alexandra@email.com".to_string(),
            phone: "+1 555 010 2030".to_string(),
            shipping_address: "125 Blossom Avenue".to_string(),
            city: "New York".to_string(),
            postal_code: "10001".to_string(),
            country: "United States".to_string(),
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn test_required_fields_complete() {
        assert!(filled_form().has_required_fields());
    }

    #[test]
    fn test_each_required_field_is_checked() {
        let clear: [fn(&mut CheckoutForm); 7] = [
            |f| f.full_name.clear(),
            |f| f.email.clear(),
            |f| f.phone.clear(),
            |f| f.shipping_address.clear(),
            |f| f.city.clear(),
            |f| f.postal_code.clear(),
            |f| f.country.clear(),
        ];
        for clear_field in clear {
            let mut form = filled_form();
            clear_field(&mut form);
            assert!(!form.has_required_fields());
        }
    }

    #[test]
    fn test_billing_fields_not_required() {
        let mut form = filled_form();
        form.billing_same = false;
        assert!(form.has_required_fields());
    }

    #[test]
    fn test_address_flattening() {
        let request = filled_form().to_request();
        assert_eq!(
            request.customer.shipping_address,
            "125 Blossom Avenue, New York, 10001, United States"
        );
        assert_eq!(request.customer.billing_address, "");
    }

    #[test]
    fn test_distinct_billing_address_flattening() {
        let mut form = filled_form();
        form.billing_same = false;
        form.billing_address = "7 Ledger Row".to_string();
        form.billing_city = "Boston".to_string();
        form.billing_postal = "02101".to_string();

        let request = form.to_request();
        assert_eq!(request.customer.billing_address, "7 Ledger Row, Boston, 02101");
    }

    #[test]
    fn test_coupon_passthrough() {
        let mut form = filled_form();
        assert_eq!(form.to_request().coupon_code, None);

        form.coupon_code = "VELVET-10 ".to_string();
        // Verbatim, whitespace and all; the backend owns coupon validation.
        assert_eq!(form.to_request().coupon_code.as_deref(), Some("VELVET-10 "));
    }
}
