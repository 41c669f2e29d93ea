//! Confirmation page controller.
//!
//! Read-only: looks the order up by its human-facing reference, augmented
//! with the guest's email/phone recovered from the persisted checkout draft
//! (the backend's secondary ownership check for account-less orders). Safe
//! to reload indefinitely; no transition is ever driven from here.

use tracing::instrument;

use blisora_core::{OrderRef, PaymentMethod, PaymentStatus};

use crate::api::CommerceClient;
use crate::api::types::Order;
use crate::error::{self, PageError};
use crate::pages::NavigationTarget;
use crate::store::StateStore;

/// Confirmation page state.
#[derive(Debug)]
pub enum ConfirmationState {
    Loading,
    /// Entered without an `orderRef` parameter; terminal, no request made.
    MissingReference,
    /// The reference did not resolve to an order.
    NotFound(String),
    /// The lookup failed outright.
    Failed(String),
    Loaded(Order),
}

/// Confirmation page controller.
pub struct ConfirmationPage {
    client: CommerceClient,
    store: StateStore,
    state: ConfirmationState,
}

impl ConfirmationPage {
    /// New controller in the loading state.
    #[must_use]
    pub fn new(client: CommerceClient, store: StateStore) -> Self {
        Self {
            client,
            store,
            state: ConfirmationState::Loading,
        }
    }

    /// Load the order for the navigation reference.
    ///
    /// A missing reference is terminal with zero network calls. On a
    /// successful load the persisted checkout draft is deleted - it exists
    /// for exactly this lookup.
    #[instrument(skip(self))]
    pub async fn load(&mut self, order_ref: Option<OrderRef>) {
        let Some(order_ref) = order_ref else {
            self.state = ConfirmationState::MissingReference;
            return;
        };

        let draft = self.store.checkout_draft().unwrap_or_else(|e| {
            error::report(&PageError::Store(e));
            None
        });
        let (email, phone) = draft
            .map(|d| (d.customer.email, d.customer.phone))
            .unwrap_or_default();

        let result = self
            .client
            .find_order(&order_ref, Some(email.as_str()), Some(phone.as_str()))
            .await;

        self.state = match result {
            Ok(order) => {
                if let Err(e) = self.store.clear_checkout_draft() {
                    error::report(&PageError::Store(e));
                }
                ConfirmationState::Loaded(order)
            }
            Err(e) => {
                let e = PageError::Api(e);
                if e.is_not_found() {
                    ConfirmationState::NotFound(e.user_message())
                } else {
                    error::report(&e);
                    ConfirmationState::Failed(e.user_message())
                }
            }
        };
    }

    /// Current page state.
    #[must_use]
    pub const fn state(&self) -> &ConfirmationState {
        &self.state
    }

    /// Navigation intent for every terminal non-loaded state: back to
    /// shopping.
    #[must_use]
    pub const fn continue_shopping_target() -> NavigationTarget {
        NavigationTarget::Shop
    }

    /// Navigation intent for the "track order" button on a loaded order.
    #[must_use]
    pub fn tracking_target(&self) -> Option<NavigationTarget> {
        let ConfirmationState::Loaded(order) = &self.state else {
            return None;
        };
        Some(NavigationTarget::Tracking {
            order_ref: order.order_ref.clone(),
            email: Some(order.customer.email.clone()),
        })
    }
}

/// Extra line under a pending payment badge, per payment method.
///
/// Part of the pure status-to-copy mapping; a settled payment needs no hint.
#[must_use]
pub const fn payment_pending_hint(order: &Order) -> Option<&'static str> {
    if !matches!(order.payment_status, PaymentStatus::Pending) {
        return None;
    }
    match order.payment_method {
        PaymentMethod::Cash => Some("Payment will be collected on delivery."),
        PaymentMethod::Card => Some("Your card will be charged shortly."),
    }
}
