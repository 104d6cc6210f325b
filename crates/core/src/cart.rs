//! The cart document and its mutation rules.
//!
//! A [`Cart`] is one document per owner holding an ordered list of line items
//! and a derived total. The total is recomputed synchronously by every
//! mutation and is never accepted from outside: it has no setter, and the only
//! way to change it is through the methods below.
//!
//! # Rules
//!
//! - **Merge-by-product**: adding a product already in the cart increments the
//!   existing line's quantity. The line keeps its original name and frozen
//!   unit price.
//! - **No silent clamping**: a mutation whose quantity or total would
//!   overflow is rejected and the cart is left as it was.
//! - **Update**: overwrites the quantity of one line, found by [`ItemId`].
//!   Zero and negative quantities are accepted here; callers decide whether to
//!   allow them.
//! - **Remove**: filters a line out by [`ItemId`]; removing an unknown item is
//!   a no-op.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{IdError, ItemId, OwnerId, Price, PriceError, ProductRef};

/// Errors produced by cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartItemError {
    /// Product reference is missing or malformed.
    #[error("invalid product reference: {0}")]
    InvalidProductRef(#[from] IdError),

    /// Display name is blank.
    #[error("display name cannot be empty")]
    EmptyDisplayName,

    /// Unit price is invalid.
    #[error("invalid unit price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// Quantity on a new line must be at least one.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i32),

    /// No line with this ID exists in the cart.
    #[error("cart item {0} not found")]
    ItemNotFound(ItemId),

    /// Merging would push a line's quantity past `i32::MAX`.
    #[error("quantity {current} + {added} is too large")]
    QuantityOverflow { current: i32, added: i32 },

    /// The cart total would not fit in a decimal.
    #[error("cart total is too large")]
    TotalOverflow,
}

/// A validated request to put a product into a cart.
///
/// Built with [`NewLineItem::new`], which enforces the creation invariants
/// (`quantity >= 1`, `unit_price >= 0`, non-blank name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    product_ref: ProductRef,
    display_name: String,
    unit_price: Price,
    quantity: i32,
}

impl NewLineItem {
    /// Validate and build a new line item request.
    ///
    /// # Errors
    ///
    /// Returns `CartItemError::EmptyDisplayName` for a blank name and
    /// `CartItemError::InvalidQuantity` if `quantity < 1`.
    pub fn new(
        product_ref: ProductRef,
        display_name: impl Into<String>,
        unit_price: Price,
        quantity: i32,
    ) -> Result<Self, CartItemError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(CartItemError::EmptyDisplayName);
        }
        if quantity < 1 {
            return Err(CartItemError::InvalidQuantity(quantity));
        }
        Ok(Self {
            product_ref,
            display_name,
            unit_price,
            quantity,
        })
    }

    /// Product being added.
    #[must_use]
    pub const fn product_ref(&self) -> &ProductRef {
        &self.product_ref
    }

    /// Quantity being added.
    #[must_use]
    pub const fn quantity(&self) -> i32 {
        self.quantity
    }
}

/// One product within a cart, with its price frozen at add-time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Identifier assigned when the line was created.
    pub id: ItemId,
    /// Opaque catalog reference.
    pub product_reference: ProductRef,
    /// Name shown to the shopper.
    pub display_name: String,
    /// Price per unit at the time the product was first added.
    pub unit_price: Price,
    /// Number of units.
    pub quantity: i32,
}

impl CartLineItem {
    /// Price of this line (`unit_price × quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// How to revert the line change made by a mutation.
#[derive(Debug, Clone, Copy)]
enum Undo {
    Push,
    Quantity { index: usize, previous: i32 },
}

/// A shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    owner_id: OwnerId,
    items: Vec<CartLineItem>,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart for `owner_id`.
    #[must_use]
    pub fn new(owner_id: OwnerId) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            items: Vec::new(),
            total: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a cart from persisted parts.
    ///
    /// The stored total is ignored and recomputed from `items`.
    #[must_use]
    pub fn from_parts(
        owner_id: OwnerId,
        items: Vec<CartLineItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut cart = Self {
            owner_id,
            items,
            total: Decimal::ZERO,
            created_at,
            updated_at,
        };
        cart.recompute_total();
        cart
    }

    /// Owner of the cart.
    #[must_use]
    pub const fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    /// Line items in display order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Cart total as of the last mutation.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// When the cart was first created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the cart was last saved.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Look up a line by its ID.
    #[must_use]
    pub fn item(&self, item_id: ItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Look up a line by product reference.
    #[must_use]
    pub fn item_for_product(&self, product_ref: &ProductRef) -> Option<&CartLineItem> {
        self.items
            .iter()
            .find(|item| &item.product_reference == product_ref)
    }

    /// Sum of `unit_price × quantity` over all lines.
    ///
    /// Saturates instead of panicking; the mutation methods refuse any change
    /// that would need it, so only hand-built `from_parts` carts can get there.
    #[must_use]
    pub fn computed_total(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_total()))
    }

    /// Sum of `unit_price × quantity` over all lines, or `None` on overflow.
    #[must_use]
    pub fn checked_total(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |total, item| {
            total.checked_add(item.unit_price.checked_times(item.quantity)?)
        })
    }

    /// Recompute the stored total from the lines.
    pub fn recompute_total(&mut self) {
        self.total = self.computed_total();
    }

    /// Stamp the cart as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Add a product, merging into an existing line for the same product.
    ///
    /// Returns the ID of the line that now holds the product.
    ///
    /// # Errors
    ///
    /// Returns `CartItemError::QuantityOverflow` if the merged quantity does
    /// not fit in an `i32` and `CartItemError::TotalOverflow` if the total
    /// would overflow. The cart is left unchanged in both cases.
    pub fn add_item(&mut self, new_item: NewLineItem) -> Result<ItemId, CartItemError> {
        let existing = self
            .items
            .iter_mut()
            .enumerate()
            .find(|(_, item)| item.product_reference == new_item.product_ref);

        let (id, undo) = if let Some((index, line)) = existing {
            let current = line.quantity;
            line.quantity = current.checked_add(new_item.quantity).ok_or(
                CartItemError::QuantityOverflow {
                    current,
                    added: new_item.quantity,
                },
            )?;
            (line.id, Undo::Quantity { index, previous: current })
        } else {
            let id = ItemId::new();
            self.items.push(CartLineItem {
                id,
                product_reference: new_item.product_ref,
                display_name: new_item.display_name,
                unit_price: new_item.unit_price,
                quantity: new_item.quantity,
            });
            (id, Undo::Push)
        };

        self.commit_total(undo)?;
        Ok(id)
    }

    /// Overwrite the quantity of one line.
    ///
    /// # Errors
    ///
    /// Returns `CartItemError::ItemNotFound` if no line has `item_id` and
    /// `CartItemError::TotalOverflow` if the total would overflow; the cart
    /// is left unchanged in both cases.
    pub fn update_quantity(&mut self, item_id: ItemId, quantity: i32) -> Result<(), CartItemError> {
        let (index, line) = self
            .items
            .iter_mut()
            .enumerate()
            .find(|(_, item)| item.id == item_id)
            .ok_or(CartItemError::ItemNotFound(item_id))?;

        let previous = line.quantity;
        line.quantity = quantity;
        self.commit_total(Undo::Quantity { index, previous })
    }

    /// Store the new total, or roll back the last line change if it overflows.
    fn commit_total(&mut self, undo: Undo) -> Result<(), CartItemError> {
        if let Some(total) = self.checked_total() {
            self.total = total;
            return Ok(());
        }

        match undo {
            Undo::Push => {
                self.items.pop();
            }
            Undo::Quantity { index, previous } => {
                if let Some(line) = self.items.get_mut(index) {
                    line.quantity = previous;
                }
            }
        }
        Err(CartItemError::TotalOverflow)
    }

    /// Remove one line. Returns `true` if a line was removed.
    pub fn remove_item(&mut self, item_id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.recompute_total();
        self.items.len() != before
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn owner() -> OwnerId {
        OwnerId::parse("user123").unwrap()
    }

    fn line(product: &str, price: i64, quantity: i32) -> NewLineItem {
        NewLineItem::new(
            ProductRef::parse(product).unwrap(),
            format!("Product {product}"),
            Price::new(Decimal::from(price)).unwrap(),
            quantity,
        )
        .unwrap()
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new(owner());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::new(owner());
        let first = cart.add_item(line("p1", 10, 2)).unwrap();
        let second = cart.add_item(line("p1", 10, 3)).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.total(), Decimal::from(50));
    }

    #[test]
    fn test_merge_keeps_frozen_price() {
        let mut cart = Cart::new(owner());
        cart.add_item(line("p1", 10, 1)).unwrap();
        cart.add_item(line("p1", 99, 1)).unwrap();

        assert_eq!(cart.items()[0].unit_price.amount(), Decimal::from(10));
        assert_eq!(cart.total(), Decimal::from(20));
    }

    #[test]
    fn test_merge_sums_many_adds() {
        let mut cart = Cart::new(owner());
        let quantities = [1, 4, 2, 7, 3];
        for q in quantities {
            cart.add_item(line("p1", 3, q)).unwrap();
        }
        let expected: i32 = quantities.iter().sum();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, expected);
        assert_eq!(cart.total(), cart.computed_total());
    }

    #[test]
    fn test_merge_overflow_is_rejected_and_cart_unchanged() {
        let mut cart = Cart::new(owner());
        cart.add_item(line("p1", 10, i32::MAX)).unwrap();
        let before = cart.clone();

        assert_eq!(
            cart.add_item(line("p1", 10, 5)),
            Err(CartItemError::QuantityOverflow {
                current: i32::MAX,
                added: 5,
            })
        );
        assert_eq!(cart, before);
        assert_eq!(cart.items()[0].quantity, i32::MAX);
    }

    #[test]
    fn test_largest_price_and_quantity_total_exactly() {
        let mut cart = Cart::new(owner());
        let price = Price::new(Price::MAX).unwrap();
        let id = cart
            .add_item(NewLineItem::new(ProductRef::parse("p1").unwrap(), "Yacht", price, 2).unwrap())
            .unwrap();
        assert_eq!(cart.total(), Price::MAX * Decimal::from(2));

        cart.update_quantity(id, i32::MAX).unwrap();
        assert_eq!(cart.total(), Price::MAX * Decimal::from(i32::MAX));
        assert_eq!(cart.checked_total(), Some(cart.total()));
    }

    #[test]
    fn test_distinct_products_keep_insertion_order() {
        let mut cart = Cart::new(owner());
        cart.add_item(line("b", 2, 1)).unwrap();
        cart.add_item(line("a", 5, 2)).unwrap();
        cart.add_item(line("c", 1, 3)).unwrap();

        let order: Vec<_> = cart
            .items()
            .iter()
            .map(|i| i.product_reference.as_str())
            .collect();
        assert_eq!(order, ["b", "a", "c"]);
        assert_eq!(cart.total(), Decimal::from(15));
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_update_quantity_recomputes_total() {
        let mut cart = Cart::new(owner());
        let id = cart.add_item(line("p1", 10, 2)).unwrap();
        cart.add_item(line("p2", 4, 1)).unwrap();

        cart.update_quantity(id, 7).unwrap();
        assert_eq!(cart.item(id).unwrap().quantity, 7);
        assert_eq!(cart.total(), Decimal::from(74));
    }

    #[test]
    fn test_update_quantity_accepts_zero() {
        let mut cart = Cart::new(owner());
        let id = cart.add_item(line("p1", 10, 2)).unwrap();

        cart.update_quantity(id, 0).unwrap();
        assert_eq!(cart.item(id).unwrap().quantity, 0);
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_update_unknown_item_leaves_cart_unchanged() {
        let mut cart = Cart::new(owner());
        cart.add_item(line("p1", 10, 2)).unwrap();
        let before = cart.clone();

        let missing = ItemId::new();
        assert_eq!(
            cart.update_quantity(missing, 3),
            Err(CartItemError::ItemNotFound(missing))
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new(owner());
        let id = cart.add_item(line("p1", 10, 2)).unwrap();
        cart.add_item(line("p2", 4, 1)).unwrap();

        assert!(cart.remove_item(id));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), Decimal::from(4));
    }

    #[test]
    fn test_remove_unknown_item_is_noop() {
        let mut cart = Cart::new(owner());
        cart.add_item(line("p1", 10, 2)).unwrap();
        let before = cart.clone();

        assert!(!cart.remove_item(ItemId::new()));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_from_parts_ignores_stored_total() {
        let items = vec![CartLineItem {
            id: ItemId::new(),
            product_reference: ProductRef::parse("p1").unwrap(),
            display_name: "Pineapple".to_string(),
            unit_price: Price::new(Decimal::new(250, 2)).unwrap(),
            quantity: 4,
        }];
        let now = Utc::now();
        let cart = Cart::from_parts(owner(), items, now, now);
        assert_eq!(cart.total(), Decimal::from(10));
    }

    #[test]
    fn test_new_line_item_validation() {
        let product = ProductRef::parse("p1").unwrap();
        let price = Price::new(Decimal::ONE).unwrap();

        assert_eq!(
            NewLineItem::new(product.clone(), "  ", price, 1),
            Err(CartItemError::EmptyDisplayName)
        );
        assert_eq!(
            NewLineItem::new(product.clone(), "Thing", price, 0),
            Err(CartItemError::InvalidQuantity(0))
        );
        assert!(NewLineItem::new(product, "Thing", price, 1).is_ok());
    }

    #[test]
    fn test_cart_json_shape() {
        let mut cart = Cart::new(owner());
        cart.add_item(line("p1", 10, 2)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();

        assert_eq!(json["ownerId"], "user123");
        assert_eq!(json["total"], "20");
        assert_eq!(json["items"][0]["productReference"], "p1");
        assert_eq!(json["items"][0]["unitPrice"], "10");
        assert_eq!(json["items"][0]["quantity"], 2);
        assert!(json["items"][0]["id"].is_string());
    }
}
