//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness check
//! GET    /health/ready                        - Readiness check (store reachable)
//!
//! # Cart (JSON)
//! GET    /cart/{owner_id}                     - Get cart (created if absent)
//! POST   /cart/{owner_id}/add                 - Add item (merges by product)
//! PUT    /cart/{owner_id}/update/{item_id}    - Overwrite item quantity
//! DELETE /cart/{owner_id}/remove/{item_id}    - Remove item
//! GET    /cart/{owner_id}/count               - Cart count badge
//! ```

pub mod cart;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{owner_id}", get(cart::show))
        .route("/{owner_id}/add", post(cart::add))
        .route("/{owner_id}/update/{item_id}", put(cart::update))
        .route("/{owner_id}/remove/{item_id}", delete(cart::remove))
        .route("/{owner_id}/count", get(cart::count))
}

/// Create the health check routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/ready", get(readiness))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the cart store is reachable before returning OK.
/// Returns 503 Service Unavailable otherwise.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.carts().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
