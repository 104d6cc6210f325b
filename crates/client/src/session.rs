//! Shopper identity context.
//!
//! The identity provider hands us an owner ID and a role claim. [`Session`]
//! holds the current identity and notifies subscribers when it changes, so
//! every open view of the cart follows a login or logout.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use shopfront_core::OwnerId;

/// Role claim from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

/// A logged-in shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub owner_id: OwnerId,
    pub display_name: String,
    pub role: Role,
}

/// Shared, observable identity state.
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Session {
    /// Create a session with nobody logged in.
    #[must_use]
    pub fn anonymous() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a session that starts logged in as `identity`.
    #[must_use]
    pub fn with_identity(identity: Identity) -> Self {
        let (tx, _) = watch::channel(Some(identity));
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current identity and notify subscribers.
    pub fn login(&self, identity: Identity) {
        tracing::info!(owner_id = %identity.owner_id, role = ?identity.role, "Session login");
        self.tx.send_replace(Some(identity));
    }

    /// Clear the current identity and notify subscribers.
    pub fn logout(&self) {
        tracing::info!("Session logout");
        self.tx.send_replace(None);
    }

    /// The current identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Subscribe to identity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn buyer(owner: &str) -> Identity {
        Identity {
            owner_id: OwnerId::parse(owner).unwrap(),
            display_name: "Test Buyer".to_string(),
            role: Role::Buyer,
        }
    }

    #[test]
    fn test_login_logout() {
        let session = Session::anonymous();
        assert!(session.current().is_none());

        session.login(buyer("user123"));
        assert_eq!(session.current().unwrap().owner_id.as_str(), "user123");

        session.logout();
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes_from_clones() {
        let session = Session::anonymous();
        let mut rx = session.subscribe();
        let other_tab = session.clone();

        other_tab.login(buyer("user123"));
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().unwrap().owner_id.as_str(),
            "user123"
        );
    }

    #[test]
    fn test_identity_json() {
        let json = serde_json::to_value(buyer("user123")).unwrap();
        assert_eq!(json["ownerId"], "user123");
        assert_eq!(json["displayName"], "Test Buyer");
        assert_eq!(json["role"], "buyer");
    }
}
