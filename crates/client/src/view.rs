//! Cart view with optimistic updates.
//!
//! Each line moves through a small state machine:
//!
//! ```text
//! Idle ──user change──▶ Pending { local_quantity } ──server ok──▶ Reconciled
//!   ▲                   PendingRemoval                  │
//!   └───────────────────────────── server error ◀──────┘
//! ```
//!
//! A user change is applied to the local cart at once (totals included) and
//! then sent. The server's cart replaces the local guess when it arrives. A
//! failed request leaves the optimistic state on screen, puts the line back
//! to `Idle` and sets a generic error; the next successful fetch corrects it.
//!
//! Requests are tracked per item ID. Several can be in flight at once via
//! [`CartView::begin_update`] / [`CartView::complete`]; whichever response
//! arrives last determines the cart shown. A line's state only follows the
//! newest change begun for it, so a stale answer for an older change never
//! overwrites a newer `Pending`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use shopfront_core::{Cart, ItemId, NewLineItem, OwnerId};

use crate::api::{AddItem, CartApi, ClientError};
use crate::session::{Identity, Session};

/// Sync state of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    /// No request outstanding.
    #[default]
    Idle,
    /// A quantity change has been sent; the cart shows `local_quantity`.
    Pending { local_quantity: i32 },
    /// A removal has been sent; the line is already gone locally.
    PendingRemoval,
    /// The server confirmed the last change.
    Reconciled,
}

impl LineState {
    /// Whether a request for this line is outstanding.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending { .. } | Self::PendingRemoval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Quantity(i32),
    Remove,
}

/// A change applied locally and awaiting the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    owner_id: OwnerId,
    item_id: ItemId,
    kind: ChangeKind,
    seq: u64,
}

impl PendingChange {
    /// The line this change targets.
    #[must_use]
    pub const fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Send the change to the server.
    ///
    /// # Errors
    ///
    /// Returns whatever the API returns.
    pub async fn send(&self, api: &dyn CartApi) -> Result<Cart, ClientError> {
        match self.kind {
            ChangeKind::Quantity(quantity) => {
                api.update_quantity(&self.owner_id, self.item_id, quantity)
                    .await
            }
            ChangeKind::Remove => api.remove_item(&self.owner_id, self.item_id).await,
        }
    }
}

/// Client-side view of the current shopper's cart.
pub struct CartView {
    api: Arc<dyn CartApi>,
    session: watch::Receiver<Option<Identity>>,
    cart: Option<Cart>,
    error: Option<String>,
    lines: HashMap<ItemId, LineState>,
    /// Sequence number of the newest change begun per line.
    latest: HashMap<ItemId, u64>,
    next_seq: u64,
}

impl CartView {
    /// Create a view that follows `session`. Call [`refresh`](Self::refresh)
    /// to load the cart.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, session: &Session) -> Self {
        Self {
            api,
            session: session.subscribe(),
            cart: None,
            error: None,
            lines: HashMap::new(),
            latest: HashMap::new(),
            next_seq: 0,
        }
    }

    /// The API handle, for sending changes begun with `begin_*` concurrently.
    #[must_use]
    pub fn api(&self) -> Arc<dyn CartApi> {
        Arc::clone(&self.api)
    }

    /// Owner of the logged-in shopper, or `None` for a guest.
    #[must_use]
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.session
            .borrow()
            .as_ref()
            .map(|identity| identity.owner_id.clone())
    }

    /// The cart currently shown, or `None` while loading.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    /// Last error, cleared by the next successful server response.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.cart.is_none()
    }

    /// Sync state of one line.
    #[must_use]
    pub fn line_state(&self, item_id: ItemId) -> LineState {
        self.lines.get(&item_id).copied().unwrap_or_default()
    }

    /// Load the cart for the current identity.
    ///
    /// Guests get a local empty cart and no request is made. On failure the
    /// last known cart stays and `error` is set.
    pub async fn refresh(&mut self) {
        let owner_id = self
            .session
            .borrow_and_update()
            .as_ref()
            .map(|identity| identity.owner_id.clone());

        let Some(owner_id) = owner_id else {
            if !self.cart.as_ref().is_some_and(|cart| cart.owner_id().is_guest()) {
                self.cart = Some(Cart::new(OwnerId::guest()));
            }
            self.error = None;
            return;
        };

        match self.api.get_cart(&owner_id).await {
            Ok(cart) => {
                self.cart = Some(cart);
                self.error = None;
                self.lines.retain(|_, state| state.is_pending());
                let lines = &self.lines;
                self.latest.retain(|item_id, _| lines.contains_key(item_id));
            }
            Err(e) => {
                tracing::warn!(error = %e, owner_id = %owner_id, "Failed to fetch cart");
                self.error = Some("Failed to fetch cart".to_string());
            }
        }
    }

    /// Wait for the session to change, then reload.
    ///
    /// Returns `false` once the session has been dropped.
    pub async fn watch_session(&mut self) -> bool {
        if self.session.changed().await.is_err() {
            return false;
        }
        self.cart = None;
        self.lines.clear();
        self.latest.clear();
        self.refresh().await;
        true
    }

    /// Add a product to the cart.
    ///
    /// Guests merge into the local cart. Logged-in shoppers wait for the
    /// server's cart.
    pub async fn add_item(&mut self, item: AddItem) {
        let Some(owner_id) = self.owner_id() else {
            self.add_local(item);
            return;
        };

        match self.api.add_item(&owner_id, &item).await {
            Ok(cart) => {
                self.cart = Some(cart);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, owner_id = %owner_id, "Failed to add item to cart");
                self.error = Some("Failed to add item to cart".to_string());
            }
        }
    }

    fn add_local(&mut self, item: AddItem) {
        let line = match NewLineItem::new(
            item.product_reference,
            item.display_name,
            item.unit_price,
            item.quantity,
        ) {
            Ok(line) => line,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };

        let cart = self.cart.get_or_insert_with(|| Cart::new(OwnerId::guest()));
        self.error = cart.add_item(line).err().map(|e| e.to_string());
    }

    /// Change a line's quantity locally.
    ///
    /// Quantities below 1 are raised to 1. Returns the change to send, or
    /// `None` if there is nothing to send: the shopper is a guest, the cart
    /// is still loading, or the line is unknown.
    pub fn begin_update(&mut self, item_id: ItemId, quantity: i32) -> Option<PendingChange> {
        let quantity = quantity.max(1);
        let cart = self.cart.as_mut()?;
        if cart.update_quantity(item_id, quantity).is_err() {
            tracing::debug!(item_id = %item_id, "Ignoring update for unknown cart line");
            return None;
        }

        let owner_id = self.owner_id()?;
        self.lines.insert(
            item_id,
            LineState::Pending {
                local_quantity: quantity,
            },
        );
        Some(PendingChange {
            owner_id,
            item_id,
            kind: ChangeKind::Quantity(quantity),
            seq: self.track(item_id),
        })
    }

    /// Remove a line locally. Returns the change to send, as for
    /// [`begin_update`](Self::begin_update).
    pub fn begin_remove(&mut self, item_id: ItemId) -> Option<PendingChange> {
        let cart = self.cart.as_mut()?;
        if !cart.remove_item(item_id) {
            return None;
        }

        let owner_id = self.owner_id()?;
        self.lines.insert(item_id, LineState::PendingRemoval);
        Some(PendingChange {
            owner_id,
            item_id,
            kind: ChangeKind::Remove,
            seq: self.track(item_id),
        })
    }

    fn track(&mut self, item_id: ItemId) -> u64 {
        self.next_seq += 1;
        self.latest.insert(item_id, self.next_seq);
        self.next_seq
    }

    /// Forget `change` if it is the newest for its line. Returns whether it was.
    fn settle(&mut self, change: &PendingChange) -> bool {
        if self.latest.get(&change.item_id) != Some(&change.seq) {
            return false;
        }
        self.latest.remove(&change.item_id);
        true
    }

    /// Apply the server's answer to a change.
    pub fn complete(&mut self, change: PendingChange, result: Result<Cart, ClientError>) {
        match result {
            Ok(cart) => {
                if self.owner_id().as_ref() != Some(cart.owner_id()) {
                    tracing::debug!(owner_id = %cart.owner_id(), "Discarding cart for previous session");
                    return;
                }
                self.cart = Some(cart);
                self.error = None;
                if !self.settle(&change) {
                    return;
                }
                match change.kind {
                    ChangeKind::Quantity(_) => {
                        self.lines.insert(change.item_id, LineState::Reconciled);
                    }
                    ChangeKind::Remove => {
                        self.lines.remove(&change.item_id);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, item_id = %change.item_id, "Cart change failed");
                if self.settle(&change) {
                    self.lines.insert(change.item_id, LineState::Idle);
                }
                self.error = Some(
                    match change.kind {
                        ChangeKind::Quantity(_) => "Failed to update cart item",
                        ChangeKind::Remove => "Failed to remove cart item",
                    }
                    .to_string(),
                );
            }
        }
    }

    /// Change a line's quantity and wait for the server.
    pub async fn update_quantity(&mut self, item_id: ItemId, quantity: i32) {
        if let Some(change) = self.begin_update(item_id, quantity) {
            let result = change.send(self.api.as_ref()).await;
            self.complete(change, result);
        }
    }

    /// Remove a line and wait for the server.
    pub async fn remove_item(&mut self, item_id: ItemId) {
        if let Some(change) = self.begin_remove(item_id) {
            let result = change.send(self.api.as_ref()).await;
            self.complete(change, result);
        }
    }
}

impl fmt::Display for CartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }

        let Some(cart) = &self.cart else {
            return writeln!(f, "Loading cart...");
        };

        if cart.is_empty() {
            return writeln!(f, "Your cart is empty.");
        }

        for item in cart.items() {
            write!(
                f,
                "{} - {} x {} = ${:.2}",
                item.display_name,
                item.unit_price,
                item.quantity,
                item.line_total()
            )?;
            if self.line_state(item.id).is_pending() {
                write!(f, " (saving)")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Total: ${:.2}", cart.total())
    }
}
