//! `PostgreSQL` cart store.
//!
//! Each cart is a single row in `storefront.cart`. Line items are kept as a
//! JSONB array in display order; the `total` column is written on every save
//! for reporting but is never read back as truth.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::{Json, JsonValue};
use tracing::instrument;

use shopfront_core::{Cart, CartLineItem, OwnerId};

use super::{CartStore, RepositoryError};

/// Row shape shared by every cart query.
#[derive(sqlx::FromRow)]
struct CartRow {
    owner_id: String,
    items: JsonValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner_id = OwnerId::parse(&row.owner_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid owner id in database: {e}"))
        })?;
        let items: Vec<CartLineItem> = serde_json::from_value(row.items).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid cart items for {owner_id} in database: {e}"
            ))
        })?;

        Ok(Self::from_parts(
            owner_id,
            items,
            row.created_at,
            row.updated_at,
        ))
    }
}

/// Cart store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a new cart store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    #[instrument(skip_all, fields(owner_id = %owner_id))]
    async fn find(&self, owner_id: &OwnerId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT owner_id, items, created_at, updated_at
            FROM storefront.cart
            WHERE owner_id = $1
            ",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    #[instrument(skip_all, fields(owner_id = %owner_id))]
    async fn get_or_create(&self, owner_id: &OwnerId) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart (owner_id, items, total)
            VALUES ($1, '[]'::jsonb, 0)
            ON CONFLICT (owner_id) DO UPDATE SET owner_id = EXCLUDED.owner_id
            RETURNING owner_id, items, created_at, updated_at
            ",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Cart::try_from(row)
    }

    #[instrument(skip_all, fields(owner_id = %cart.owner_id()))]
    async fn save(&self, mut cart: Cart) -> Result<Cart, RepositoryError> {
        cart.recompute_total();
        cart.touch();

        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart (owner_id, items, total, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (owner_id) DO UPDATE
            SET items = EXCLUDED.items,
                total = EXCLUDED.total,
                updated_at = EXCLUDED.updated_at
            RETURNING owner_id, items, created_at, updated_at
            ",
        )
        .bind(cart.owner_id())
        .bind(Json(cart.items()))
        .bind(cart.total())
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .fetch_one(&self.pool)
        .await?;

        Cart::try_from(row)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Total recorded for an owner's cart, as last written.
///
/// Used by the CLI for reporting; handlers always use the recomputed total.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn stored_total(pool: &PgPool, owner_id: &OwnerId) -> Result<Option<Decimal>, RepositoryError> {
    let total = sqlx::query_scalar::<_, Decimal>(
        r"
        SELECT total
        FROM storefront.cart
        WHERE owner_id = $1
        ",
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(total)
}
