//! Shopfront Core - Shared cart domain library.
//!
//! This crate provides the types used across all Shopfront components:
//! - `storefront` - REST backend serving the cart API
//! - `client` - Cart client view with optimistic updates
//! - `cli` - Command-line tools for migrations and cart inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart logic - no I/O, no database
//! access, no HTTP clients. The merge, update, remove and total-recompute rules
//! live here so the server and the client view apply exactly the same rules.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for owner IDs, item IDs, product references and prices
//! - [`cart`] - The `Cart` document and its line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartItemError, CartLineItem, NewLineItem};
pub use types::*;
