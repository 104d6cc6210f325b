//! Cart inspection commands.
//!
//! # Usage
//!
//! ```bash
//! # Print a cart and check its stored total
//! sf-cli cart show user123
//!
//! # Add a demo line item through the cart service
//! sf-cli cart seed user123 --product demo-pineapple --price 12.50 --quantity 2
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use shopfront_core::{CartItemError, IdError, NewLineItem, OwnerId, Price, ProductRef};
use shopfront_storefront::db::{self, CartStore, PgCartStore, RepositoryError, carts::stored_total};
use shopfront_storefront::services::{CartError, CartService};

use super::{DATABASE_URL_VAR, database_url};

/// Errors that can occur during cart commands.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid owner ID or product reference.
    #[error("{0}")]
    InvalidId(#[from] IdError),

    /// Invalid line item.
    #[error("{0}")]
    InvalidItem(#[from] CartItemError),

    /// Repository error.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Cart service error.
    #[error("{0}")]
    Cart(#[from] CartError),
}

/// Demo line item added by `cart seed`.
#[derive(Debug, Clone)]
pub struct SeedItem {
    pub product: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

async fn connect() -> Result<PgCartStore, CartCommandError> {
    let database_url = database_url().ok_or(CartCommandError::MissingEnvVar(DATABASE_URL_VAR))?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(PgCartStore::new(pool))
}

/// Print a cart and check that the stored total matches its items.
///
/// # Errors
///
/// Returns an error if the owner ID is invalid or the database fails.
pub async fn show(owner: &str) -> Result<(), CartCommandError> {
    let owner_id = OwnerId::parse(owner)?;
    let store = connect().await?;

    let Some(cart) = store.find(&owner_id).await? else {
        tracing::info!("No cart for owner {owner_id}");
        return Ok(());
    };

    tracing::info!("Cart for {owner_id} (updated {})", cart.updated_at());
    for item in cart.items() {
        tracing::info!(
            "  {} [{}] {} x {} = {}",
            item.display_name,
            item.product_reference,
            item.unit_price,
            item.quantity,
            item.line_total()
        );
    }
    tracing::info!("  Items: {}", cart.item_count());
    tracing::info!("  Total: {}", cart.total());

    let stored = stored_total(store.pool(), &owner_id).await?;
    if let Some(stored) = stored.filter(|stored| *stored != cart.total()) {
        tracing::warn!(
            stored = %stored,
            computed = %cart.total(),
            "Stored total does not match line items"
        );
    }

    Ok(())
}

/// Add a line item to a cart through the cart service.
///
/// # Errors
///
/// Returns an error if the input is invalid or the database fails.
pub async fn seed(owner: &str, item: SeedItem) -> Result<(), CartCommandError> {
    let owner_id = OwnerId::parse(owner)?;
    let line = NewLineItem::new(
        ProductRef::parse(&item.product)?,
        item.name,
        Price::new(item.price).map_err(CartItemError::from)?,
        item.quantity,
    )?;

    let service = CartService::new(Arc::new(connect().await?));
    let cart = service.add_item(&owner_id, line).await?;

    tracing::info!(
        "Seeded cart for {owner_id}: {} line(s), total {}",
        cart.items().len(),
        cart.total()
    );
    Ok(())
}
