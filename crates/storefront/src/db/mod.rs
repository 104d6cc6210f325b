//! Cart persistence.
//!
//! # Database: `shopfront`
//!
//! ## Tables
//!
//! - `storefront.cart` - One row per owner; line items stored as a JSONB document
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate storefront
//! ```
//!
//! # Stores
//!
//! Handlers never talk to a store directly; they go through
//! [`crate::services::cart::CartService`], which owns the mutation rules. The
//! store only persists whole cart documents and recomputes the total on save.

pub mod carts;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use shopfront_core::{Cart, OwnerId};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::PgCartStore;
pub use memory::MemoryCartStore;

/// Errors raised by a cart store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into a cart.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Durable keyed storage of one cart per owner.
///
/// Implementations perform no validation beyond persistence. There is no
/// concurrency control: concurrent saves for the same owner race and the
/// last one wins.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load the cart for `owner_id`, if one exists.
    async fn find(&self, owner_id: &OwnerId) -> Result<Option<Cart>, RepositoryError>;

    /// Load the cart for `owner_id`, creating and persisting an empty one if
    /// none exists. Never reports "not found".
    async fn get_or_create(&self, owner_id: &OwnerId) -> Result<Cart, RepositoryError>;

    /// Persist the full cart state.
    ///
    /// Recomputes the total and stamps `updated_at` before writing, so the
    /// stored total can never drift from the items.
    async fn save(&self, cart: Cart) -> Result<Cart, RepositoryError>;

    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
