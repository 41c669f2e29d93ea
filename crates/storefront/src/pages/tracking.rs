//! Tracking page controller.
//!
//! A pure query form, not a saga stage: reference plus a contact (email or
//! phone) in, order status out. Holds no persisted state and deletes
//! nothing; the confirmation page owns draft cleanup.

use tracing::instrument;

use blisora_core::OrderRef;

use crate::api::CommerceClient;
use crate::api::types::Order;
use crate::error::{self, PageError};

/// Tracking page controller.
pub struct TrackingPage {
    client: CommerceClient,
}

impl TrackingPage {
    /// New controller; the form starts blank.
    #[must_use]
    pub const fn new(client: CommerceClient) -> Self {
        Self { client }
    }

    /// Look up an order by reference and contact.
    ///
    /// The single contact field is classified as an email when it contains
    /// `@`, otherwise as a phone number. An empty reference short-circuits
    /// with no request; a miss surfaces as [`ApiError::NotFound`] through
    /// [`PageError::is_not_found`] so the shell can render the dedicated
    /// empty state.
    ///
    /// # Errors
    ///
    /// [`PageError::Validation`] for an empty reference, otherwise the API
    /// failure.
    ///
    /// [`ApiError::NotFound`]: crate::api::ApiError::NotFound
    #[instrument(skip(self, contact))]
    pub async fn check_status(
        &self,
        reference: &str,
        contact: &str,
    ) -> Result<Order, PageError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(PageError::Validation(
                "Please enter your order reference".to_string(),
            ));
        }

        let contact = contact.trim();
        let (email, phone) = if contact.contains('@') {
            (Some(contact), None)
        } else if contact.is_empty() {
            (None, None)
        } else {
            (None, Some(contact))
        };

        self.client
            .find_order(&OrderRef::new(reference), email, phone)
            .await
            .map_err(|e| {
                let e = PageError::Api(e);
                error::report(&e);
                e
            })
    }
}
