//! In-memory cart store.
//!
//! Used by tests and for running the storefront without a database
//! (`STOREFRONT_STORE=memory`). Carts live for the lifetime of the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use shopfront_core::{Cart, OwnerId};

use super::{CartStore, RepositoryError};

/// Cart store backed by a process-local map.
#[derive(Default)]
pub struct MemoryCartStore {
    carts: RwLock<HashMap<OwnerId, Cart>>,
}

impl MemoryCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of carts currently held.
    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Returns `true` if no carts are held.
    pub async fn is_empty(&self) -> bool {
        self.carts.read().await.is_empty()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn find(&self, owner_id: &OwnerId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(owner_id).cloned())
    }

    async fn get_or_create(&self, owner_id: &OwnerId) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(owner_id.clone())
            .or_insert_with(|| Cart::new(owner_id.clone()));
        Ok(cart.clone())
    }

    async fn save(&self, mut cart: Cart) -> Result<Cart, RepositoryError> {
        cart.recompute_total();
        cart.touch();
        self.carts
            .write()
            .await
            .insert(cart.owner_id().clone(), cart.clone());
        Ok(cart)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
