//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! Each test starts its own storefront on an ephemeral port, backed by the
//! in-memory cart store, so no database is needed.
//!
//! # Test Categories
//!
//! - `cart_api` - HTTP surface of the cart routes
//! - `client_view` - Cart client and optimistic view against a live server

use std::net::SocketAddr;
use std::sync::Arc;

use shopfront_client::CartClient;
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::db::MemoryCartStore;
use shopfront_storefront::state::AppState;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running storefront plus handles to poke at it.
pub struct TestContext {
    pub client: reqwest::Client,
    pub storefront_url: String,
    pub store: Arc<MemoryCartStore>,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Start a storefront on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn new() -> Self {
        let config = StorefrontConfig::from_lookup(|key| {
            (key == "STOREFRONT_STORE").then(|| "memory".to_string())
        })
        .expect("memory store config is valid");

        let store = Arc::new(MemoryCartStore::new());
        let app = shopfront_storefront::app(AppState::new(config, store.clone()));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Listener has a local address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            client: reqwest::Client::new(),
            storefront_url: format!("http://{addr}"),
            store,
            server,
        }
    }

    /// Absolute URL for `path` on the test server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// A cart API client pointed at the test server.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn cart_client(&self) -> CartClient {
        CartClient::new(&self.storefront_url).expect("Test server URL is valid")
    }

    /// JSON body for an add-to-cart request.
    #[must_use]
    pub fn add_body(product: &str, price: &str, quantity: i32) -> serde_json::Value {
        serde_json::json!({
            "productReference": product,
            "displayName": format!("Product {product}"),
            "unitPrice": price,
            "quantity": quantity,
        })
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}
