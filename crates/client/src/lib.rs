//! Shopfront cart client.
//!
//! Talks to the storefront cart API and keeps a local view of the shopper's
//! cart that updates optimistically while requests are in flight.
//!
//! ```no_run
//! use std::sync::Arc;
//! use shopfront_client::{CartClient, CartView, Session};
//!
//! # async fn run() -> Result<(), shopfront_client::ClientError> {
//! let session = Session::anonymous();
//! let api = Arc::new(CartClient::new("http://localhost:5000")?);
//! let mut view = CartView::new(api, &session);
//! view.refresh().await;
//! println!("{view}");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod session;
pub mod view;

pub use api::{AddItem, CartApi, CartClient, ClientError};
pub use session::{Identity, Role, Session};
pub use view::{CartView, LineState, PendingChange};
