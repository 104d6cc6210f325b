//! Cart mutation API.
//!
//! Every mutation loads the owner's cart, applies one rule from
//! [`shopfront_core::cart`], and saves the whole document back through the
//! [`CartStore`]. The store recomputes the total on save. Nothing here talks
//! to inventory, pricing or payments: prices are frozen at add-time.

use std::sync::Arc;

use shopfront_core::{Cart, CartItemError, ItemId, NewLineItem, OwnerId};
use thiserror::Error;
use tracing::instrument;

use crate::db::{CartStore, RepositoryError};

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No cart exists for the owner.
    #[error("Cart not found.")]
    CartNotFound(OwnerId),

    /// The cart has no line with this ID.
    #[error("Cart item not found.")]
    ItemNotFound(ItemId),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<CartItemError> for CartError {
    fn from(err: CartItemError) -> Self {
        match err {
            CartItemError::ItemNotFound(item_id) => Self::ItemNotFound(item_id),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// Cart operations over a shared [`CartStore`].
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }

    /// Get the owner's cart, creating an empty one if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    #[instrument(skip_all, fields(owner_id = %owner_id))]
    pub async fn get_cart(&self, owner_id: &OwnerId) -> Result<Cart, CartError> {
        Ok(self.store.get_or_create(owner_id).await?)
    }

    /// Add a product to the owner's cart, merging with an existing line for
    /// the same product. The cart is created if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` if the merged quantity or the total
    /// would overflow (nothing is written), and `CartError::Storage` if the
    /// store fails.
    #[instrument(skip_all, fields(owner_id = %owner_id, product = %item.product_ref()))]
    pub async fn add_item(&self, owner_id: &OwnerId, item: NewLineItem) -> Result<Cart, CartError> {
        let mut cart = self
            .store
            .find(owner_id)
            .await?
            .unwrap_or_else(|| Cart::new(owner_id.clone()));

        let quantity = item.quantity();
        let item_id = cart.add_item(item)?;
        tracing::debug!(%item_id, quantity, "Added item to cart");

        Ok(self.store.save(cart).await?)
    }

    /// Overwrite the quantity of one line.
    ///
    /// The quantity is not range-checked here.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` or `CartError::ItemNotFound` if the
    /// cart or line is missing (nothing is written), and `CartError::Storage`
    /// if the store fails.
    #[instrument(skip_all, fields(owner_id = %owner_id, item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        owner_id: &OwnerId,
        item_id: ItemId,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        let mut cart = self.require_cart(owner_id).await?;
        cart.update_quantity(item_id, quantity)?;

        if quantity < 1 {
            tracing::warn!(quantity, "Cart item quantity set below 1");
        }

        Ok(self.store.save(cart).await?)
    }

    /// Remove one line. Removing an unknown item is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the owner has no cart and
    /// `CartError::Storage` if the store fails.
    #[instrument(skip_all, fields(owner_id = %owner_id, item_id = %item_id))]
    pub async fn remove_item(&self, owner_id: &OwnerId, item_id: ItemId) -> Result<Cart, CartError> {
        let mut cart = self.require_cart(owner_id).await?;
        if !cart.remove_item(item_id) {
            tracing::debug!("Item not in cart, nothing removed");
        }

        Ok(self.store.save(cart).await?)
    }

    /// Number of units in the owner's cart. Does not create a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    #[instrument(skip_all, fields(owner_id = %owner_id))]
    pub async fn item_count(&self, owner_id: &OwnerId) -> Result<i64, CartError> {
        Ok(self
            .store
            .find(owner_id)
            .await?
            .map_or(0, |cart| cart.item_count()))
    }

    /// Check that the cart store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), CartError> {
        Ok(self.store.ping().await?)
    }

    async fn require_cart(&self, owner_id: &OwnerId) -> Result<Cart, CartError> {
        self.store
            .find(owner_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(owner_id.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shopfront_core::{Price, ProductRef};

    use super::*;
    use crate::db::MemoryCartStore;

    fn service() -> (CartService, Arc<MemoryCartStore>) {
        let store = Arc::new(MemoryCartStore::new());
        (CartService::new(store.clone()), store)
    }

    fn owner() -> OwnerId {
        OwnerId::parse("user123").unwrap()
    }

    fn item(product: &str, price: i64, quantity: i32) -> NewLineItem {
        NewLineItem::new(
            ProductRef::parse(product).unwrap(),
            product.to_uppercase(),
            Price::new(Decimal::from(price)).unwrap(),
            quantity,
        )
        .unwrap()
    }

    fn assert_total_matches(cart: &Cart) {
        let expected: Decimal = cart
            .items()
            .iter()
            .map(|i| i.unit_price.amount() * Decimal::from(i.quantity))
            .sum();
        assert_eq!(cart.total(), expected);
    }

    #[tokio::test]
    async fn test_get_cart_creates_and_persists() {
        let (service, store) = service();

        let cart = service.get_cart(&owner()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
        assert!(store.find(&owner()).await.unwrap().is_some());

        let again = service.get_cart(&owner()).await.unwrap();
        assert_eq!(cart, again);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_merges_same_product() {
        let (service, _) = service();

        service.add_item(&owner(), item("p1", 10, 2)).await.unwrap();
        let cart = service.add_item(&owner(), item("p1", 10, 3)).await.unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.total(), Decimal::from(50));
    }

    #[tokio::test]
    async fn test_add_overflowing_merge_is_validation_error() {
        let (service, store) = service();
        let before = service
            .add_item(&owner(), item("p1", 10, i32::MAX))
            .await
            .unwrap();

        let result = service.add_item(&owner(), item("p1", 10, 5)).await;
        assert!(matches!(result, Err(CartError::Validation(_))));
        assert_eq!(store.find(&owner()).await.unwrap(), Some(before));
    }

    #[tokio::test]
    async fn test_add_creates_cart_when_absent() {
        let (service, store) = service();
        assert!(store.is_empty().await);

        let cart = service.add_item(&owner(), item("p1", 4, 1)).await.unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_total_tracks_every_mutation() {
        let (service, _) = service();

        let cart = service.add_item(&owner(), item("p1", 10, 2)).await.unwrap();
        assert_total_matches(&cart);
        let cart = service.add_item(&owner(), item("p2", 7, 3)).await.unwrap();
        assert_total_matches(&cart);

        let p1 = cart.items()[0].id;
        let p2 = cart.items()[1].id;

        let cart = service.update_quantity(&owner(), p1, 9).await.unwrap();
        assert_total_matches(&cart);
        assert_eq!(cart.total(), Decimal::from(111));

        let cart = service.remove_item(&owner(), p2).await.unwrap();
        assert_total_matches(&cart);
        assert_eq!(cart.total(), Decimal::from(90));
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found_and_unchanged() {
        let (service, store) = service();
        let before = service.add_item(&owner(), item("p1", 10, 2)).await.unwrap();

        let result = service.update_quantity(&owner(), ItemId::new(), 4).await;
        assert!(matches!(result, Err(CartError::ItemNotFound(_))));
        assert_eq!(store.find(&owner()).await.unwrap(), Some(before));
    }

    #[tokio::test]
    async fn test_update_without_cart_is_not_found() {
        let (service, store) = service();

        let result = service.update_quantity(&owner(), ItemId::new(), 4).await;
        assert!(matches!(result, Err(CartError::CartNotFound(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_accepts_zero_quantity() {
        let (service, _) = service();
        let cart = service.add_item(&owner(), item("p1", 10, 2)).await.unwrap();
        let id = cart.items()[0].id;

        let cart = service.update_quantity(&owner(), id, 0).await.unwrap();
        assert_eq!(cart.items()[0].quantity, 0);
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_noop() {
        let (service, _) = service();
        let before = service.add_item(&owner(), item("p1", 10, 2)).await.unwrap();

        let after = service.remove_item(&owner(), ItemId::new()).await.unwrap();
        assert_eq!(after.items(), before.items());
        assert_eq!(after.total(), before.total());
    }

    #[tokio::test]
    async fn test_remove_without_cart_is_not_found() {
        let (service, _) = service();
        let result = service.remove_item(&owner(), ItemId::new()).await;
        assert!(matches!(result, Err(CartError::CartNotFound(_))));
    }

    #[tokio::test]
    async fn test_item_count_does_not_create_cart() {
        let (service, store) = service();
        assert_eq!(service.item_count(&owner()).await.unwrap(), 0);
        assert!(store.is_empty().await);

        service.add_item(&owner(), item("p1", 1, 2)).await.unwrap();
        service.add_item(&owner(), item("p2", 1, 5)).await.unwrap();
        assert_eq!(service.item_count(&owner()).await.unwrap(), 7);
    }

    struct FailingStore;

    #[async_trait]
    impl CartStore for FailingStore {
        async fn find(&self, _owner_id: &OwnerId) -> Result<Option<Cart>, RepositoryError> {
            Err(RepositoryError::DataCorruption("boom".to_string()))
        }

        async fn get_or_create(&self, _owner_id: &OwnerId) -> Result<Cart, RepositoryError> {
            Err(RepositoryError::DataCorruption("boom".to_string()))
        }

        async fn save(&self, _cart: Cart) -> Result<Cart, RepositoryError> {
            Err(RepositoryError::DataCorruption("boom".to_string()))
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Err(RepositoryError::DataCorruption("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_failures_surface_as_storage_errors() {
        let service = CartService::new(Arc::new(FailingStore));

        assert!(matches!(
            service.get_cart(&owner()).await,
            Err(CartError::Storage(_))
        ));
        assert!(matches!(
            service.add_item(&owner(), item("p1", 1, 1)).await,
            Err(CartError::Storage(_))
        ));
        assert!(matches!(service.ping().await, Err(CartError::Storage(_))));
    }
}
