//! Page-level error handling with Sentry capture.
//!
//! Failure taxonomy, in order of how the pages treat them:
//!
//! - transport / decode failures (`Api(Http | Parse)`) - unexpected; captured
//!   to Sentry, then folded into a user-visible message
//! - structured API rejections (`Api(Api)`) - expected; the server's own
//!   message is shown verbatim
//! - local precondition failures (`Validation`, `MissingLocalState`) - checked
//!   before any network call, which is short-circuited
//! - lookup misses (`Api(NotFound)`) - rendered as a dedicated empty state,
//!   not an error banner
//!
//! Nothing here is fatal to the process; every failure is scoped to the
//! current page interaction and recoverable by retry or navigation.

use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

/// Error type shared by all page controllers.
#[derive(Debug, Error)]
pub enum PageError {
    /// Commerce API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local persistence failed.
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// A required form field is missing or malformed; no request was made.
    #[error("{0}")]
    Validation(String),

    /// A page was entered without the local state it depends on.
    #[error("{0}")]
    MissingLocalState(String),

    /// The targeted interactive surface already has a request in flight.
    #[error("{0}")]
    Busy(String),
}

impl PageError {
    /// Whether this is a lookup miss that should render a not-found state.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(ApiError::NotFound(_)))
    }

    /// Fold the error into the message shown to the customer.
    ///
    /// Structured API rejections carry the server's message; everything else
    /// gets a generic line so internals never leak into the page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Api { message, .. }) => message.clone(),
            Self::Api(ApiError::NotFound(_)) => "Not found".to_string(),
            Self::Api(_) | Self::Store(_) => "Something went wrong. Please try again.".to_string(),
            Self::Validation(msg) | Self::MissingLocalState(msg) | Self::Busy(msg) => msg.clone(),
        }
    }
}

/// Capture an unexpected error class to Sentry and the log.
///
/// Expected rejections (structured API errors, validation, lookup misses)
/// are part of normal operation and are only logged at debug level.
pub fn report(error: &PageError) {
    match error {
        PageError::Api(ApiError::Http(_) | ApiError::Parse(_)) | PageError::Store(_) => {
            let event_id = sentry::capture_error(error);
            tracing::error!(error = %error, sentry_event_id = %event_id, "Page error");
        }
        _ => {
            tracing::debug!(error = %error, "Page rejection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_shown_verbatim() {
        let err = PageError::Api(ApiError::Api {
            status: 400,
            message: "Coupon expired".to_string(),
        });
        assert_eq!(err.user_message(), "Coupon expired");
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = PageError::Validation("Please fill in all required fields".to_string());
        assert_eq!(err.user_message(), "Please fill in all required fields");
    }

    #[test]
    fn test_not_found_classification() {
        let err = PageError::Api(ApiError::NotFound("order BLIS-1".to_string()));
        assert!(err.is_not_found());

        let err = PageError::Validation("nope".to_string());
        assert!(!err.is_not_found());
    }
}
