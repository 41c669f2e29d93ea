//! Payment page controller.
//!
//! This page never re-fetches the order: it renders whatever totals the
//! checkout step persisted locally, a deliberate trust boundary. Entering
//! without the navigation order id or without the persisted echo is a
//! terminal local error and no request is made.
//!
//! The full card number and CVC exist only for local validation, held in
//! [`SecretString`] so they cannot leak through `Debug`. The outbound
//! payment descriptor carries the cardholder name and the last four digits,
//! nothing else. That is a hard security invariant, not a style choice.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use blisora_core::{OrderId, PaymentMethod};

use crate::api::CommerceClient;
use crate::api::types::{CardDetails, Order, OrderItem, PaymentRequest};
use crate::error::{self, PageError};
use crate::pages::{DelayedNavigation, NavigationTarget};
use crate::store::StateStore;

/// Sanitised card number length.
const CARD_NUMBER_DIGITS: usize = 16;

/// Sanitised CVC length.
const CVC_DIGITS: usize = 3;

/// Order summary reconstructed purely from the persisted order echo.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            items: order.items.clone(),
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            discount: order.discount,
            // The echoed totalAmount is authoritative; the arithmetic
            // fallback covers older backend responses that omit it.
            total: order
                .total_amount
                .unwrap_or(order.subtotal + order.shipping_cost - order.discount),
        }
    }
}

/// Card entry form with sanitising setters.
pub struct CardForm {
    pub cardholder_name: String,
    pub expiry: String,
    card_number: SecretString,
    cvc: SecretString,
}

impl Default for CardForm {
    fn default() -> Self {
        Self {
            cardholder_name: String::new(),
            expiry: String::new(),
            card_number: SecretString::from(String::new()),
            cvc: SecretString::from(String::new()),
        }
    }
}

impl CardForm {
    /// Store the card number input: non-digits stripped, capped at 16.
    pub fn set_card_number(&mut self, input: &str) {
        self.card_number = SecretString::from(sanitize_digits(input, CARD_NUMBER_DIGITS));
    }

    /// Store the CVC input: non-digits stripped, capped at 3.
    pub fn set_cvc(&mut self, input: &str) {
        self.cvc = SecretString::from(sanitize_digits(input, CVC_DIGITS));
    }

    /// Number of digits currently entered, for input masks.
    #[must_use]
    pub fn card_number_len(&self) -> usize {
        self.card_number.expose_secret().len()
    }

    /// Validate the form ahead of submission.
    ///
    /// # Errors
    ///
    /// A user-facing message; no request may be issued while this fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.cardholder_name.is_empty()
            || self.expiry.is_empty()
            || self.card_number.expose_secret().is_empty()
            || self.cvc.expose_secret().is_empty()
        {
            return Err("Please fill in all card details".to_string());
        }
        if self.card_number.expose_secret().len() != CARD_NUMBER_DIGITS {
            return Err("Card number must be 16 digits".to_string());
        }
        if self.cvc.expose_secret().len() != CVC_DIGITS {
            return Err("CVC must be 3 digits".to_string());
        }
        Ok(())
    }

    /// The only card data that ever leaves the page: name and last 4.
    fn to_descriptor(&self) -> CardDetails {
        let digits = self.card_number.expose_secret();
        let last4 = digits
            .get(digits.len().saturating_sub(4)..)
            .unwrap_or_default()
            .to_string();

        CardDetails {
            name: self.cardholder_name.clone(),
            last4,
        }
    }

    #[cfg(test)]
    fn card_number_for_test(&self) -> &str {
        self.card_number.expose_secret()
    }

    #[cfg(test)]
    fn cvc_for_test(&self) -> &str {
        self.cvc.expose_secret()
    }
}

/// Where the payment page is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPhase {
    Loading,
    /// Entered without the order id or the persisted echo; terminal.
    MissingState,
    Ready,
    Submitting,
    /// Paid; confirmation redirect pending.
    Success,
}

/// Payment page controller.
pub struct PaymentPage {
    client: CommerceClient,
    store: StateStore,
    phase: PaymentPhase,
    order_id: Option<OrderId>,
    summary: Option<OrderSummary>,
    /// The card entry form.
    pub form: CardForm,
    error: Option<String>,
}

impl PaymentPage {
    /// New controller in the loading state.
    #[must_use]
    pub fn new(client: CommerceClient, store: StateStore) -> Self {
        Self {
            client,
            store,
            phase: PaymentPhase::Loading,
            order_id: None,
            summary: None,
            form: CardForm::default(),
            error: None,
        }
    }

    /// Enter the page with the navigation order id.
    ///
    /// Requires both the id and the persisted order echo; absence of either
    /// is terminal and no network call is attempted. Deliberately
    /// synchronous - there is nothing to await.
    pub fn load(&mut self, order_id: Option<OrderId>) {
        let Some(order_id) = order_id else {
            self.error = Some("No order found. Please complete checkout first.".to_string());
            self.phase = PaymentPhase::MissingState;
            return;
        };

        let echo = match self.store.pending_order() {
            Ok(echo) => echo,
            Err(e) => {
                error::report(&PageError::Store(e));
                None
            }
        };
        let Some(order) = echo else {
            self.error = Some("No order data found. Please complete checkout first.".to_string());
            self.phase = PaymentPhase::MissingState;
            return;
        };

        self.summary = Some(OrderSummary::from(&order));
        self.order_id = Some(order_id);
        self.phase = PaymentPhase::Ready;
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> PaymentPhase {
        self.phase
    }

    /// Last error, already user-facing.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Summary rebuilt from the local echo, if the page loaded.
    #[must_use]
    pub const fn summary(&self) -> Option<&OrderSummary> {
        self.summary.as_ref()
    }

    /// Submit the payment.
    ///
    /// Card validation short-circuits before any request. On success both
    /// persisted keys are cleared and the page redirects to confirmation
    /// after the standard delay; on failure the page and the persisted
    /// state are untouched so a retry works.
    ///
    /// # Errors
    ///
    /// [`PageError::Validation`] for card-form violations,
    /// [`PageError::MissingLocalState`] when the page never loaded,
    /// [`PageError::Busy`] for a duplicate submit, otherwise the API
    /// failure with the server's message.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<DelayedNavigation, PageError> {
        match self.phase {
            PaymentPhase::Ready => {}
            PaymentPhase::Submitting | PaymentPhase::Success => {
                return Err(PageError::Busy("Payment already in flight".to_string()));
            }
            PaymentPhase::Loading | PaymentPhase::MissingState => {
                return Err(PageError::MissingLocalState(
                    "No order found. Please complete checkout first.".to_string(),
                ));
            }
        }
        self.error = None;

        if let Err(message) = self.form.validate() {
            self.error = Some(message.clone());
            return Err(PageError::Validation(message));
        }
        let Some(order_id) = self.order_id.clone() else {
            return Err(PageError::MissingLocalState(
                "No order found. Please complete checkout first.".to_string(),
            ));
        };

        let payment = PaymentRequest {
            payment_method: PaymentMethod::Card,
            card_details: self.form.to_descriptor(),
        };

        self.phase = PaymentPhase::Submitting;
        let order = match self.client.complete_payment(&order_id, &payment).await {
            Ok(order) => order,
            Err(e) => {
                let e = PageError::Api(e);
                error::report(&e);
                self.error = Some(e.user_message());
                self.phase = PaymentPhase::Ready;
                return Err(e);
            }
        };

        // Payment went through; a failed cleanup must not strand the
        // customer short of confirmation.
        if let Err(e) = self
            .store
            .clear_checkout_draft()
            .and_then(|()| self.store.clear_pending_order())
        {
            error::report(&PageError::Store(e));
        }

        self.phase = PaymentPhase::Success;
        Ok(DelayedNavigation::new(NavigationTarget::Confirmation {
            order_ref: order.order_ref,
        }))
    }
}

/// Keep only ASCII digits, capped at `max_len`.
fn sanitize_digits(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(max_len)
        .collect()
}
