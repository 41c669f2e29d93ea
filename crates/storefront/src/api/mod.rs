//! Commerce API client.
//!
//! One `reqwest` client shared by every page controller. Base URL comes from
//! deployment configuration; endpoints are the fixed REST surface the
//! storefront consumes but does not define.
//!
//! # Session channel
//!
//! Guest identity reaches the backend on two channels. The **cookie jar is
//! authoritative**: the client is built with a cookie store and the backend's
//! session cookie rides along on every call. The locally persisted guest
//! session id is additionally replayed as an `X-Session-Id` header on every
//! request as a compatibility shim for deployments where the cookie is not
//! yet established (first request, cookie-blocked embeds). The backend is
//! expected to prefer the cookie when both are present.
//!
//! # Failure policy
//!
//! No call retries, ever; a failure is terminal for that attempt and a new
//! attempt requires a new user action. Callers re-fetch the cart after every
//! mutation instead of patching state optimistically.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use blisora_core::{OrderId, OrderRef, ProductId, SessionId};

use crate::config::StorefrontConfig;
use types::{
    Cart, CartLineInput, CartMutation, CheckoutRequest, ItemVariant, Order, PaymentRequest,
    Product, ShippingQuote, ShippingQuoteRequest,
};

/// Header carrying the persisted guest session id (compatibility shim).
const SESSION_HEADER: &str = "X-Session-Id";

/// Product listings are cached briefly; carts and orders never are.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Errors that can occur when calling the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-2xx response with a structured body.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not decode as the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client could not be constructed from the given configuration.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Client for the commerce API.
///
/// Cheaply cloneable; all clones share the HTTP connection pool, the cookie
/// jar, and the product cache.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    products: Cache<String, Vec<Product>>,
}

impl CommerceClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the session id is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StorefrontConfig, session_id: &SessionId) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            SESSION_HEADER,
            HeaderValue::from_str(session_id.as_str())
                .map_err(|e| ApiError::Config(format!("invalid session id: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        let products = Cache::builder()
            .max_capacity(100)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.api_base_url.clone(),
                products,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Read a response, mapping non-2xx statuses to structured errors.
    ///
    /// The error message is taken from the body's `error` or `message` field
    /// when present, falling back to the caller's generic message.
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(extract_error_message(&body, fallback)));
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body, fallback),
            });
        }

        serde_json::from_str(&body).map_err(ApiError::Parse)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the session's cart. The backend creates one lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, ApiError> {
        let response = self.inner.http.get(self.endpoint("/cart")).send().await?;
        Self::read_json(response, "Failed to load cart").await
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let mutation = CartMutation {
            item: CartLineInput {
                product_id: product_id.clone(),
                quantity,
                variant: None,
            },
        };

        let response = self
            .inner
            .http
            .post(self.endpoint("/cart/add"))
            .json(&mutation)
            .send()
            .await?;
        Self::read_json(response, "Failed to add to cart").await
    }

    /// Set a line's quantity; a quantity of zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn update_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
        variant: Option<&ItemVariant>,
    ) -> Result<Cart, ApiError> {
        let mutation = CartMutation {
            item: CartLineInput {
                product_id: product_id.clone(),
                quantity,
                variant: variant.cloned(),
            },
        };

        let response = self
            .inner
            .http
            .put(self.endpoint("/cart/update"))
            .json(&mutation)
            .send()
            .await?;
        Self::read_json(response, "Failed to update cart").await
    }

    /// Clear the cart.
    ///
    /// Issued best-effort after a successful checkout; the backend contract
    /// does not promise it clears the cart itself.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        let response = self
            .inner
            .http
            .delete(self.endpoint("/cart"))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(ApiError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body, "Failed to clear cart"),
        })
    }

    // =========================================================================
    // Checkout & Orders
    // =========================================================================

    /// Quote shipping for a subtotal.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response; callers
    /// treat a failed quote as shipping 0, not a blocked checkout.
    #[instrument(skip(self))]
    pub async fn shipping_quote(
        &self,
        subtotal: rust_decimal::Decimal,
    ) -> Result<ShippingQuote, ApiError> {
        let response = self
            .inner
            .http
            .post(self.endpoint("/shipping/quote"))
            .json(&ShippingQuoteRequest { subtotal })
            .send()
            .await?;
        Self::read_json(response, "Failed to quote shipping").await
    }

    /// Submit the checkout draft, creating an order.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response; the
    /// message carries the server's rejection reason when it sent one.
    #[instrument(skip(self, draft), fields(payment_method = draft.payment_method.as_str()))]
    pub async fn submit_checkout(&self, draft: &CheckoutRequest) -> Result<Order, ApiError> {
        let response = self
            .inner
            .http
            .post(self.endpoint("/orders/checkout"))
            .json(draft)
            .send()
            .await?;
        Self::read_json(response, "Checkout failed").await
    }

    /// Complete payment for an order.
    ///
    /// The payment descriptor carries only the cardholder name and the card's
    /// last four digits; see [`types::CardDetails`].
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    #[instrument(skip(self, payment), fields(order_id = %order_id))]
    pub async fn complete_payment(
        &self,
        order_id: &OrderId,
        payment: &PaymentRequest,
    ) -> Result<Order, ApiError> {
        let response = self
            .inner
            .http
            .post(self.endpoint(&format!("/orders/{order_id}/pay")))
            .json(payment)
            .send()
            .await?;
        Self::read_json(response, "Payment failed").await
    }

    /// Look up an order by its human-facing reference.
    ///
    /// Email and phone, when known, are passed along as the backend's
    /// secondary ownership check for guest orders.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for a lookup miss, or another error on
    /// transport failure / non-2xx response.
    #[instrument(skip(self, email, phone), fields(order_ref = %order_ref))]
    pub async fn find_order(
        &self,
        order_ref: &OrderRef,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Order, ApiError> {
        let mut url = format!(
            "{}?orderRef={}",
            self.endpoint("/orders"),
            urlencoding::encode(order_ref.as_str())
        );
        if let Some(email) = email.filter(|v| !v.is_empty()) {
            url.push_str("&email=");
            url.push_str(&urlencoding::encode(email));
        }
        if let Some(phone) = phone.filter(|v| !v.is_empty()) {
            url.push_str("&phone=");
            url.push_str(&urlencoding::encode(phone));
        }

        let response = self.inner.http.get(url).send().await?;
        Self::read_json(response, "Order not found").await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List products, optionally filtered by search text and gender.
    ///
    /// Listings are cached per query for a few minutes; cart and order reads
    /// always go to the network.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        q: Option<&str>,
        gender: Option<&str>,
    ) -> Result<Vec<Product>, ApiError> {
        let cache_key = format!("products:{}:{}", q.unwrap_or(""), gender.unwrap_or(""));
        if let Some(products) = self.inner.products.get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let mut request = self.inner.http.get(self.endpoint("/products"));
        if let Some(q) = q.filter(|v| !v.is_empty()) {
            request = request.query(&[("q", q)]);
        }
        if let Some(gender) = gender {
            request = request.query(&[("gender", gender)]);
        }

        let response = request.send().await?;
        let products: Vec<Product> = Self::read_json(response, "Failed to load products").await?;

        self.inner
            .products
            .insert(cache_key, products.clone())
            .await;

        Ok(products)
    }
}

/// Pull a human message out of an error response body.
///
/// Prefers the `error` field, then `message`, then the caller's fallback.
fn extract_error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .or_else(|| value.get("message").and_then(serde_json::Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_prefers_error_field() {
        let body = r#"{"error": "Cart is empty", "message": "other"}"#;
        assert_eq!(extract_error_message(body, "fallback"), "Cart is empty");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_message() {
        let body = r#"{"message": "Invalid coupon"}"#;
        assert_eq!(extract_error_message(body, "fallback"), "Invalid coupon");
    }

    #[test]
    fn test_extract_error_message_generic_on_junk() {
        assert_eq!(extract_error_message("<html>502</html>", "Checkout failed"), "Checkout failed");
        assert_eq!(extract_error_message("", "Checkout failed"), "Checkout failed");
        assert_eq!(extract_error_message(r#"{"error": 42}"#, "Checkout failed"), "Checkout failed");
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Api {
            status: 400,
            message: "Cart is empty".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 400 - Cart is empty");

        let err = ApiError::NotFound("order BLIS-9".to_string());
        assert_eq!(err.to_string(), "Not found: order BLIS-9");
    }
}
