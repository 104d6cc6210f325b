//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Cart mutation API (get-or-create, add with merge, update, remove)

pub mod cart;

pub use cart::{CartError, CartService};
