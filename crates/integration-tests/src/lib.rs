//! End-to-end saga tests for the Blisora storefront core.
//!
//! The storefront is a client of a remote commerce API, so the tests run it
//! against [`MockCommerce`], an in-process axum server implementing the same
//! REST surface over in-memory state. Per-endpoint hit counters make "this
//! path never issues a request" properties directly assertable.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p blisora-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use blisora_core::SessionId;
use blisora_storefront::api::CommerceClient;
use blisora_storefront::config::StorefrontConfig;
use blisora_storefront::store::StateStore;

/// Cookie the mock backend issues to bind the guest session.
const SESSION_COOKIE: &str = "blis_sid";

/// Per-endpoint request counters.
#[derive(Default)]
pub struct Hits {
    pub cart_get: AtomicUsize,
    pub cart_add: AtomicUsize,
    pub cart_update: AtomicUsize,
    pub cart_clear: AtomicUsize,
    pub shipping_quote: AtomicUsize,
    pub checkout: AtomicUsize,
    pub pay: AtomicUsize,
    pub order_lookup: AtomicUsize,
    pub products: AtomicUsize,
}

impl Hits {
    /// Total requests across every endpoint.
    pub fn total(&self) -> usize {
        [
            &self.cart_get,
            &self.cart_add,
            &self.cart_update,
            &self.cart_clear,
            &self.shipping_quote,
            &self.checkout,
            &self.pay,
            &self.order_lookup,
            &self.products,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }
}

/// Failure injection knobs, all off by default.
#[derive(Default)]
struct Behavior {
    fail_cart_get: bool,
    cart_update_delay: Option<Duration>,
    fail_shipping_quote: bool,
    checkout_error: Option<(u16, String)>,
    pay_error: Option<(u16, String)>,
}

struct CartLine {
    product_id: String,
    name: String,
    price: f64,
    quantity: u32,
    variant: Option<Value>,
}

#[derive(Default)]
struct MockState {
    products: Mutex<Vec<Value>>,
    cart: Mutex<Vec<CartLine>>,
    orders: Mutex<Vec<Value>>,
    order_counter: AtomicUsize,
    hits: Hits,
    behavior: Mutex<Behavior>,
    last_session_header: Mutex<Option<String>>,
    last_order_query: Mutex<Option<HashMap<String, String>>>,
    last_pay_body: Mutex<Option<String>>,
    cookie_replayed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process mock of the commerce backend.
pub struct MockCommerce {
    /// Base URL including the `/api` prefix, e.g. `http://127.0.0.1:4002/api`.
    pub base_url: String,
    state: Arc<MockState>,
    server: tokio::task::JoinHandle<()>,
}

impl Drop for MockCommerce {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockCommerce {
    /// Bind an ephemeral port and serve the mock API, seeded with the
    /// default catalog.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound; tests cannot proceed anyway.
    #[allow(clippy::unwrap_used)]
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        *lock(&state.products) = default_catalog();

        let app = Router::new()
            .route("/api/cart", get(get_cart).delete(clear_cart))
            .route("/api/cart/add", post(add_to_cart))
            .route("/api/cart/update", axum::routing::put(update_cart))
            .route("/api/shipping/quote", post(shipping_quote))
            .route("/api/orders/checkout", post(checkout))
            .route("/api/orders/{id}/pay", post(pay))
            .route("/api/orders", get(order_lookup))
            .route("/api/products", get(list_products))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
            server,
        }
    }

    /// Request counters.
    #[must_use]
    pub fn hits(&self) -> &Hits {
        &self.state.hits
    }

    /// Put a line straight into the server-side cart.
    pub fn stock_cart(&self, product_id: &str, name: &str, price: f64, quantity: u32) {
        lock(&self.state.cart).push(CartLine {
            product_id: product_id.to_string(),
            name: name.to_string(),
            price,
            quantity,
            variant: None,
        });
    }

    /// Like [`Self::stock_cart`] with a variant selection.
    pub fn stock_cart_variant(
        &self,
        product_id: &str,
        name: &str,
        price: f64,
        quantity: u32,
        size: &str,
    ) {
        lock(&self.state.cart).push(CartLine {
            product_id: product_id.to_string(),
            name: name.to_string(),
            price,
            quantity,
            variant: Some(json!({ "size": size })),
        });
    }

    /// Current `(productId, quantity)` pairs in the server-side cart.
    #[must_use]
    pub fn cart_lines(&self) -> Vec<(String, u32)> {
        lock(&self.state.cart)
            .iter()
            .map(|line| (line.product_id.clone(), line.quantity))
            .collect()
    }

    /// Make `GET /cart` return 500 until cleared.
    pub fn fail_cart_get(&self, fail: bool) {
        lock(&self.state.behavior).fail_cart_get = fail;
    }

    /// Hold every `PUT /cart/update` for `delay` before answering.
    pub fn delay_cart_updates(&self, delay: Duration) {
        lock(&self.state.behavior).cart_update_delay = Some(delay);
    }

    /// Make `POST /shipping/quote` return 500.
    pub fn fail_shipping_quote(&self, fail: bool) {
        lock(&self.state.behavior).fail_shipping_quote = fail;
    }

    /// Make `POST /orders/checkout` fail with a structured error body.
    pub fn fail_checkout(&self, status: u16, message: &str) {
        lock(&self.state.behavior).checkout_error = Some((status, message.to_string()));
    }

    /// Stop failing checkout.
    pub fn allow_checkout(&self) {
        lock(&self.state.behavior).checkout_error = None;
    }

    /// Make `POST /orders/{id}/pay` fail with a structured error body.
    pub fn fail_pay(&self, status: u16, message: &str) {
        lock(&self.state.behavior).pay_error = Some((status, message.to_string()));
    }

    /// Stop failing payment.
    pub fn allow_pay(&self) {
        lock(&self.state.behavior).pay_error = None;
    }

    /// The `X-Session-Id` header seen on the most recent request, if any.
    #[must_use]
    pub fn last_session_header(&self) -> Option<String> {
        lock(&self.state.last_session_header).clone()
    }

    /// Query parameters of the most recent order lookup.
    #[must_use]
    pub fn last_order_query(&self) -> Option<HashMap<String, String>> {
        lock(&self.state.last_order_query).clone()
    }

    /// Raw body of the most recent payment request.
    #[must_use]
    pub fn last_pay_body(&self) -> Option<String> {
        lock(&self.state.last_pay_body).clone()
    }

    /// Whether any request replayed the session cookie this server issued.
    #[must_use]
    pub fn cookie_replayed(&self) -> bool {
        self.state.cookie_replayed.load(Ordering::SeqCst)
    }
}

/// Everything a saga test needs: a mock backend, a fresh state store, and a
/// client wired to both.
pub struct TestContext {
    pub mock: MockCommerce,
    pub store: StateStore,
    pub client: CommerceClient,
}

impl TestContext {
    /// Stand up a mock backend and a client with an in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be constructed; tests cannot proceed
    /// anyway.
    #[allow(clippy::unwrap_used)]
    pub async fn new() -> Self {
        let mock = MockCommerce::start().await;
        let store = StateStore::in_memory();
        let session = store.guest_session_id().unwrap();
        let client = CommerceClient::new(&config_for(&mock), &session).unwrap();

        Self {
            mock,
            store,
            client,
        }
    }
}

/// Storefront configuration pointing at a mock backend.
#[must_use]
pub fn config_for(mock: &MockCommerce) -> StorefrontConfig {
    StorefrontConfig {
        api_base_url: mock.base_url.clone(),
        state_path: std::path::PathBuf::from("unused-in-tests.json"),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A client with its own session id against the given mock.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[allow(clippy::unwrap_used)]
#[must_use]
pub fn client_for(mock: &MockCommerce, session: &str) -> CommerceClient {
    CommerceClient::new(&config_for(mock), &SessionId::new(session)).unwrap()
}

// =============================================================================
// Seed data
// =============================================================================

fn default_catalog() -> Vec<Value> {
    [
        ("p-nocturne", "Nocturne Veil", 165.0, Some("women")),
        ("p-lune", "Lune Noire", 190.0, Some("men")),
        ("p-serene", "Serene Bloom", 145.0, Some("women")),
        ("p-atelier", "Atelier Ambre", 175.0, None),
        ("p-citron", "Citron Noir", 150.0, Some("men")),
        ("p-silk", "Silk Petals", 160.0, Some("women")),
    ]
    .into_iter()
    .map(|(id, name, price, gender)| {
        let mut product = json!({
            "_id": id,
            "name": name,
            "price": price,
            "images": [format!("{id}.jpg")],
            "totalStock": 12,
            "isActive": true,
        });
        if let Some(gender) = gender {
            product["gender"] = json!(gender);
        }
        product
    })
    .collect()
}

// =============================================================================
// Handlers
// =============================================================================

fn record_session(state: &MockState, headers: &HeaderMap) {
    if let Some(session) = headers.get("X-Session-Id").and_then(|v| v.to_str().ok()) {
        *lock(&state.last_session_header) = Some(session.to_string());
    }
    if let Some(cookie) = headers.get("cookie").and_then(|v| v.to_str().ok())
        && cookie.contains(SESSION_COOKIE)
    {
        state.cookie_replayed.store(true, Ordering::SeqCst);
    }
}

fn error_body(status: u16, message: &str) -> Response {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        axum::Json(json!({ "error": message })),
    )
        .into_response()
}

fn cart_json(state: &MockState) -> Value {
    let cart = lock(&state.cart);
    let items: Vec<Value> = cart
        .iter()
        .map(|line| {
            let mut item = json!({
                "productId": {
                    "_id": line.product_id,
                    "name": line.name,
                    "price": line.price,
                },
                "quantity": line.quantity,
            });
            if let Some(variant) = &line.variant {
                item["variant"] = variant.clone();
            }
            item
        })
        .collect();
    let subtotal: f64 = cart
        .iter()
        .map(|line| line.price * f64::from(line.quantity))
        .sum();

    json!({
        "_id": "cart-1",
        "sessionId": "mock-session",
        "items": items,
        "subtotal": subtotal,
    })
}

async fn get_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hits.cart_get.fetch_add(1, Ordering::SeqCst);
    record_session(&state, &headers);

    if lock(&state.behavior).fail_cart_get {
        return error_body(500, "cart store unavailable");
    }

    let mut response = axum::Json(cart_json(&state)).into_response();
    if let Ok(cookie) =
        format!("{SESSION_COOKIE}=mock-session; Path=/").parse::<axum::http::HeaderValue>()
    {
        response.headers_mut().insert("set-cookie", cookie);
    }
    response
}

async fn clear_cart(State(state): State<Arc<MockState>>) -> Response {
    state.hits.cart_clear.fetch_add(1, Ordering::SeqCst);
    lock(&state.cart).clear();
    axum::Json(json!({ "cleared": true })).into_response()
}

fn variant_matches(line: &CartLine, requested: Option<&Value>) -> bool {
    let normalize = |v: Option<&Value>| {
        v.map(|v| {
            (
                v.get("size").and_then(Value::as_str).map(str::to_string),
                v.get("color").and_then(Value::as_str).map(str::to_string),
            )
        })
        .unwrap_or_default()
    };
    normalize(line.variant.as_ref()) == normalize(requested)
}

async fn add_to_cart(
    State(state): State<Arc<MockState>>,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    state.hits.cart_add.fetch_add(1, Ordering::SeqCst);

    let Some(item) = body.get("item") else {
        return error_body(400, "missing item");
    };
    let Some(product_id) = item.get("productId").and_then(Value::as_str) else {
        return error_body(400, "missing productId");
    };
    let quantity = item.get("quantity").and_then(Value::as_u64).unwrap_or(1);

    let product = lock(&state.products)
        .iter()
        .find(|p| p["_id"] == product_id)
        .cloned();
    let Some(product) = product else {
        return error_body(404, "product not found");
    };

    let mut cart = lock(&state.cart);
    if let Some(line) = cart
        .iter_mut()
        .find(|line| line.product_id == product_id && variant_matches(line, None))
    {
        line.quantity += u32::try_from(quantity).unwrap_or(1);
    } else {
        cart.push(CartLine {
            product_id: product_id.to_string(),
            name: product["name"].as_str().unwrap_or_default().to_string(),
            price: product["price"].as_f64().unwrap_or_default(),
            quantity: u32::try_from(quantity).unwrap_or(1),
            variant: None,
        });
    }
    drop(cart);

    axum::Json(cart_json(&state)).into_response()
}

async fn update_cart(
    State(state): State<Arc<MockState>>,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    state.hits.cart_update.fetch_add(1, Ordering::SeqCst);

    let delay = lock(&state.behavior).cart_update_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let Some(item) = body.get("item") else {
        return error_body(400, "missing item");
    };
    let Some(product_id) = item.get("productId").and_then(Value::as_str) else {
        return error_body(400, "missing productId");
    };
    let quantity = item.get("quantity").and_then(Value::as_u64).unwrap_or(0);
    let variant = item.get("variant");

    let mut cart = lock(&state.cart);
    // quantity 0 removes the line; repeating the removal is a no-op
    if quantity == 0 {
        cart.retain(|line| !(line.product_id == product_id && variant_matches(line, variant)));
    } else if let Some(line) = cart
        .iter_mut()
        .find(|line| line.product_id == product_id && variant_matches(line, variant))
    {
        line.quantity = u32::try_from(quantity).unwrap_or(1);
    } else {
        return error_body(404, "line not in cart");
    }
    drop(cart);

    axum::Json(cart_json(&state)).into_response()
}

async fn shipping_quote(
    State(state): State<Arc<MockState>>,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    state.hits.shipping_quote.fetch_add(1, Ordering::SeqCst);

    if lock(&state.behavior).fail_shipping_quote {
        return error_body(500, "quote service unavailable");
    }

    let subtotal = body.get("subtotal").and_then(Value::as_f64).unwrap_or(0.0);
    let shipping = if subtotal > 0.0 { 18.0 } else { 0.0 };
    axum::Json(json!({ "shippingCost": shipping })).into_response()
}

async fn checkout(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    state.hits.checkout.fetch_add(1, Ordering::SeqCst);
    record_session(&state, &headers);

    if let Some((status, message)) = lock(&state.behavior).checkout_error.clone() {
        return error_body(status, &message);
    }

    let items: Vec<Value>;
    let subtotal: f64;
    {
        let cart = lock(&state.cart);
        if cart.is_empty() {
            return error_body(400, "Cart is empty");
        }
        items = cart
            .iter()
            .map(|line| {
                let mut item = json!({
                    "productId": line.product_id,
                    "name": line.name,
                    "price": line.price,
                    "quantity": line.quantity,
                });
                if let Some(variant) = &line.variant {
                    item["variant"] = variant.clone();
                }
                item
            })
            .collect();
        subtotal = cart
            .iter()
            .map(|line| line.price * f64::from(line.quantity))
            .sum();
    }

    let n = state.order_counter.fetch_add(1, Ordering::SeqCst) + 1;
    let shipping = 18.0;
    let discount = 10.0;
    let order = json!({
        "_id": format!("o{n}"),
        "orderRef": format!("BLIS-{}", 2000 + n),
        "customer": body.get("customer").cloned().unwrap_or(json!({})),
        "items": items,
        "subtotal": subtotal,
        "shippingCost": shipping,
        "discount": discount,
        "loyaltyDiscount": 0.0,
        "totalAmount": subtotal + shipping - discount,
        "paymentMethod": body.get("paymentMethod").cloned().unwrap_or(json!("card")),
        "paymentStatus": "pending",
        "orderStatus": "pending",
        "createdAt": chrono::Utc::now().to_rfc3339(),
    });
    lock(&state.orders).push(order.clone());

    axum::Json(order).into_response()
}

async fn pay(
    State(state): State<Arc<MockState>>,
    Path(order_id): Path<String>,
    body: String,
) -> Response {
    state.hits.pay.fetch_add(1, Ordering::SeqCst);
    *lock(&state.last_pay_body) = Some(body.clone());

    if let Some((status, message)) = lock(&state.behavior).pay_error.clone() {
        return error_body(status, &message);
    }

    let mut orders = lock(&state.orders);
    let Some(order) = orders.iter_mut().find(|o| o["_id"] == order_id.as_str()) else {
        return error_body(404, "Order not found");
    };
    order["paymentStatus"] = json!("paid");
    let order = order.clone();
    drop(orders);

    axum::Json(order).into_response()
}

async fn order_lookup(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hits.order_lookup.fetch_add(1, Ordering::SeqCst);
    *lock(&state.last_order_query) = Some(params.clone());

    let Some(order_ref) = params.get("orderRef") else {
        return error_body(400, "orderRef is required");
    };

    let orders = lock(&state.orders);
    let Some(order) = orders.iter().find(|o| o["orderRef"] == order_ref.as_str()) else {
        return error_body(404, "Order not found");
    };

    // Secondary ownership check for guest orders: a contact, when supplied,
    // must match the order. A reference-only lookup is allowed.
    let email = order["customer"]["email"].as_str().unwrap_or_default();
    let phone = order["customer"]["phone"].as_str().unwrap_or_default();
    let email_param = params.get("email").filter(|v| !v.is_empty());
    let phone_param = params.get("phone").filter(|v| !v.is_empty());
    if (email_param.is_some() || phone_param.is_some())
        && !email_param.is_some_and(|v| v.as_str() == email)
        && !phone_param.is_some_and(|v| v.as_str() == phone)
    {
        return error_body(404, "Order not found");
    }

    axum::Json(order.clone()).into_response()
}

async fn list_products(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hits.products.fetch_add(1, Ordering::SeqCst);

    let q = params.get("q").map(|q| q.to_lowercase());
    let gender = params.get("gender");

    let products: Vec<Value> = lock(&state.products)
        .iter()
        .filter(|p| {
            let name_ok = q.as_ref().is_none_or(|q| {
                p["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(q)
            });
            let gender_ok = gender.is_none_or(|g| p["gender"] == g.as_str());
            name_ok && gender_ok
        })
        .cloned()
        .collect();

    axum::Json(products).into_response()
}
