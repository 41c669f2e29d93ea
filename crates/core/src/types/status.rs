//! Status enums for orders and payments.
//!
//! The backend reports order and payment status as free-form strings; the
//! enums here cover the values the storefront renders distinctly and fold
//! everything else into `Unknown`. Display mapping is a pure function of the
//! status value - the storefront never drives a status transition itself.

use serde::{Deserialize, Serialize};

/// How a customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Credit or debit card, completed on the payment page.
    #[default]
    Card,
    /// Cash on delivery, completed by the courier.
    Cash,
}

impl PaymentMethod {
    /// Wire representation used in request payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
        }
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
    /// Any status value this client does not recognise.
    #[serde(other)]
    Unknown,
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    /// Any status value this client does not recognise.
    #[serde(other)]
    Unknown,
}

/// Visual tone for a status badge.
///
/// The rendering shell maps tones to its own colour tokens; the mapping from
/// status to tone lives here so every view renders a given status the same
/// way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTone {
    /// Needs attention (typically amber).
    Attention,
    /// Informational progress (typically blue).
    Info,
    /// Completed / good (typically green).
    Positive,
}

impl OrderStatus {
    /// Badge tone for this status.
    #[must_use]
    pub const fn tone(self) -> StatusTone {
        match self {
            Self::Pending => StatusTone::Attention,
            Self::Shipped => StatusTone::Info,
            Self::Delivered | Self::Unknown => StatusTone::Positive,
        }
    }

    /// One-line description shown under the status badge.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "Your order is being prepared for shipment.",
            Self::Shipped => "Your order is on its way to you.",
            Self::Delivered | Self::Unknown => "Your order has been delivered.",
        }
    }
}

impl PaymentStatus {
    /// Badge tone for this status.
    #[must_use]
    pub const fn tone(self) -> StatusTone {
        match self {
            Self::Pending => StatusTone::Attention,
            Self::Paid | Self::Failed | Self::Unknown => StatusTone::Positive,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_wire_format() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Cash).unwrap(), "\"cash\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::Card).unwrap(), "\"card\"");

        let method: PaymentMethod = serde_json::from_str("\"cash\"").unwrap();
        assert_eq!(method, PaymentMethod::Cash);
    }

    #[test]
    fn test_order_status_unknown_fallback() {
        let status: OrderStatus = serde_json::from_str("\"backordered\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }

    #[test]
    fn test_order_status_tones() {
        assert_eq!(OrderStatus::Pending.tone(), StatusTone::Attention);
        assert_eq!(OrderStatus::Shipped.tone(), StatusTone::Info);
        assert_eq!(OrderStatus::Delivered.tone(), StatusTone::Positive);
    }

    #[test]
    fn test_payment_status_tones() {
        assert_eq!(PaymentStatus::Pending.tone(), StatusTone::Attention);
        assert_eq!(PaymentStatus::Paid.tone(), StatusTone::Positive);
    }
}
