//! Wire types for the commerce API.
//!
//! These mirror the JSON the backend produces and consumes. The backend
//! spells identifiers either `id` or the legacy `_id`; deserialisation
//! accepts both and this client always writes `id`. Monetary amounts travel
//! as JSON numbers and are held as `Decimal` to keep the arithmetic exact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use blisora_core::{OrderId, OrderRef, OrderStatus, PaymentMethod, PaymentStatus, ProductId};

// =============================================================================
// Product Types
// =============================================================================

/// Scent notes grouped by tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductNotes {
    #[serde(default)]
    pub top: Vec<String>,
    #[serde(default)]
    pub middle: Vec<String>,
    #[serde(default)]
    pub base: Vec<String>,
}

/// A purchasable variant of a product (size/colour combination).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

/// A product category reference.
///
/// The backend sometimes expands the category into a record and sometimes
/// leaves the raw reference string in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    /// Expanded category record.
    Expanded {
        #[serde(alias = "_id")]
        id: String,
        name: String,
    },
    /// Plain name, or an unexpanded object id.
    Inline(String),
}

impl CategoryRef {
    /// Display name, if the reference carries one.
    ///
    /// Unexpanded object ids are suppressed; customers never see raw ids.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Expanded { name, .. } => Some(name),
            Self::Inline(value) => {
                if blisora_core::looks_like_object_id(value) {
                    None
                } else {
                    Some(value)
                }
            }
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub total_stock: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub notes: Option<ProductNotes>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Size/colour selection on a cart or order line.
///
/// Line identity is the `(productId, size, color)` tuple; two lines for the
/// same product with different variants are distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Product snapshot embedded in a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartProduct {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Populated product record (the backend expands `productId`).
    #[serde(rename = "productId")]
    pub product: CartProduct,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ItemVariant>,
}

impl CartItem {
    /// Line total at the snapshot price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// The guest cart, keyed server-side by session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Subtotal as the backend reported it, when it did.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub subtotal: Option<Decimal>,
}

impl Cart {
    /// Subtotal recomputed from the line items.
    ///
    /// Checkout quotes shipping against this figure rather than trusting the
    /// possibly stale stored `subtotal`.
    #[must_use]
    pub fn line_subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Line payload for cart add/update mutations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<ItemVariant>,
}

/// Request envelope for cart mutations (`{"item": {...}}`).
#[derive(Debug, Clone, Serialize)]
pub struct CartMutation {
    pub item: CartLineInput,
}

// =============================================================================
// Checkout Types
// =============================================================================

/// Customer contact and address block.
///
/// Addresses are flattened to single display strings before transmission;
/// an empty `billing_address` means "use the shipping address".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    #[serde(default)]
    pub billing_address: String,
}

/// Payload for `POST /orders/checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer: CustomerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Payload for `POST /shipping/quote`.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingQuoteRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

/// Response from `POST /shipping/quote`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    #[serde(default, with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
}

// =============================================================================
// Order Types
// =============================================================================

/// A line item on a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ItemVariant>,
}

impl OrderItem {
    /// Line total at the captured price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A placed order, as returned by checkout submission and order lookup.
///
/// Immutable from the client's perspective except for the two status fields,
/// which are refreshed by re-fetch on the confirmation and tracking pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal identifier, used for the payment-completion call.
    #[serde(alias = "_id")]
    pub id: OrderId,
    /// Human-facing reference, used for confirmation and tracking lookups.
    pub order_ref: OrderRef,
    pub customer: CustomerInfo,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub loyalty_discount: Decimal,
    /// Authoritative total; older backend responses may omit it.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payment Types
// =============================================================================

/// Card descriptor sent to the backend.
///
/// Carries only the cardholder name and the last four digits. The full card
/// number and CVC exist client-side for validation and must never appear in
/// an outbound payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub name: String,
    pub last4: String,
}

/// Payload for `POST /orders/{id}/pay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_method: PaymentMethod,
    pub card_details: CardDetails,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_accepts_legacy_id_spelling() {
        let cart: Cart = serde_json::from_str(
            r#"{
                "_id": "c1",
                "sessionId": "s1",
                "items": [
                    {
                        "productId": {"_id": "p1", "name": "Lune Noire", "price": 190},
                        "quantity": 2
                    }
                ],
                "subtotal": 380
            }"#,
        )
        .unwrap();

        assert_eq!(cart.id.as_deref(), Some("c1"));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product.id.as_str(), "p1");
        assert_eq!(cart.subtotal, Some(Decimal::from(380)));
        assert_eq!(cart.line_subtotal(), Decimal::from(380));
    }

    #[test]
    fn test_line_identity_includes_variant() {
        let a = ItemVariant {
            size: Some("50ml".to_string()),
            color: None,
        };
        let b = ItemVariant {
            size: Some("100ml".to_string()),
            color: None,
        };
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_cart_mutation_wire_shape() {
        let mutation = CartMutation {
            item: CartLineInput {
                product_id: ProductId::new("p1"),
                quantity: 0,
                variant: None,
            },
        };
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"item": {"productId": "p1", "quantity": 0}})
        );
    }

    #[test]
    fn test_order_parses_minimal_response() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": "o1",
                "orderRef": "BLIS-2002",
                "customer": {
                    "fullName": "Alexandra Bloom",
                    "email": "alexandra@email.com",
                    "phone": "+1 555 010 2030",
                    "shippingAddress": "125 Blossom Avenue, New York, 10001, United States"
                },
                "paymentMethod": "card",
                "paymentStatus": "pending",
                "orderStatus": "pending"
            }"#,
        )
        .unwrap();

        assert_eq!(order.id.as_str(), "o1");
        assert_eq!(order.order_ref.as_str(), "BLIS-2002");
        assert_eq!(order.total_amount, None);
        assert_eq!(order.customer.billing_address, "");
    }

    #[test]
    fn test_category_display_name_suppresses_object_ids() {
        let expanded = CategoryRef::Expanded {
            id: "64f1aa00bc1234567890abcd".to_string(),
            name: "Floral Amber".to_string(),
        };
        assert_eq!(expanded.display_name(), Some("Floral Amber"));

        let inline = CategoryRef::Inline("Woody Musk".to_string());
        assert_eq!(inline.display_name(), Some("Woody Musk"));

        let raw = CategoryRef::Inline("64f1aa00bc1234567890abcd".to_string());
        assert_eq!(raw.display_name(), None);
    }

    #[test]
    fn test_checkout_request_omits_missing_coupon() {
        let request = CheckoutRequest {
            customer: CustomerInfo::default(),
            coupon_code: None,
            payment_method: PaymentMethod::Cash,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("couponCode").is_none());
        assert_eq!(json["paymentMethod"], "cash");
    }
}
