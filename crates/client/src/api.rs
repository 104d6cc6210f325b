//! HTTP client for the cart API.
//!
//! [`CartApi`] is the seam the cart view talks through; [`CartClient`] is
//! the reqwest implementation against the storefront's `/cart` routes.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::instrument;

use shopfront_core::{Cart, ItemId, OwnerId, Price, ProductRef};

/// Errors that can occur when talking to the cart API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL cannot carry path segments.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The cart or cart item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Product details sent when adding to the cart.
///
/// These come from the catalog and are frozen into the line by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product_reference: ProductRef,
    pub display_name: String,
    pub unit_price: Price,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
struct UpdateQuantityBody {
    quantity: i32,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    cart: Cart,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Operations the cart view needs from the backend.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the owner's cart. The server creates it if absent.
    async fn get_cart(&self, owner_id: &OwnerId) -> Result<Cart, ClientError>;

    /// Add a product, returning the updated cart.
    async fn add_item(&self, owner_id: &OwnerId, item: &AddItem) -> Result<Cart, ClientError>;

    /// Overwrite a line's quantity, returning the updated cart.
    async fn update_quantity(
        &self,
        owner_id: &OwnerId,
        item_id: ItemId,
        quantity: i32,
    ) -> Result<Cart, ClientError>;

    /// Remove a line, returning the updated cart.
    async fn remove_item(&self, owner_id: &OwnerId, item_id: ItemId) -> Result<Cart, ClientError>;
}

/// reqwest-backed cart API client.
#[derive(Debug, Clone)]
pub struct CartClient {
    client: reqwest::Client,
    base_url: Url,
}

impl CartClient {
    /// Create a client for a storefront at `base_url` (e.g. `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns error if the URL does not parse or cannot be a base, or if
    /// the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    /// Build `{base}/cart/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("cart").extend(segments);
        }
        url
    }

    /// Turn a response into a cart, mapping error statuses.
    async fn read_cart<T: DeserializeOwned>(
        response: reqwest::Response,
        extract: fn(T) -> Cart,
    ) -> Result<Cart, ClientError> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(if status == StatusCode::NOT_FOUND {
                ClientError::NotFound(message)
            } else {
                ClientError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        Ok(extract(response.json::<T>().await?))
    }
}

#[async_trait]
impl CartApi for CartClient {
    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn get_cart(&self, owner_id: &OwnerId) -> Result<Cart, ClientError> {
        let url = self.endpoint(&[owner_id.as_str()]);
        let response = self.client.get(url).send().await?;
        Self::read_cart(response, |cart: Cart| cart).await
    }

    #[instrument(skip(self, item), fields(owner_id = %owner_id, product_reference = %item.product_reference))]
    async fn add_item(&self, owner_id: &OwnerId, item: &AddItem) -> Result<Cart, ClientError> {
        let url = self.endpoint(&[owner_id.as_str(), "add"]);
        let response = self.client.post(url).json(item).send().await?;
        Self::read_cart(response, |body: MutationResponse| body.cart).await
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id))]
    async fn update_quantity(
        &self,
        owner_id: &OwnerId,
        item_id: ItemId,
        quantity: i32,
    ) -> Result<Cart, ClientError> {
        let item = item_id.to_string();
        let url = self.endpoint(&[owner_id.as_str(), "update", &item]);
        let response = self
            .client
            .put(url)
            .json(&UpdateQuantityBody { quantity })
            .send()
            .await?;
        Self::read_cart(response, |body: MutationResponse| body.cart).await
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id))]
    async fn remove_item(&self, owner_id: &OwnerId, item_id: ItemId) -> Result<Cart, ClientError> {
        let item = item_id.to_string();
        let url = self.endpoint(&[owner_id.as_str(), "remove", &item]);
        let response = self.client.delete(url).send().await?;
        Self::read_cart(response, |body: MutationResponse| body.cart).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = CartClient::new("http://localhost:5000").unwrap();
        let owner = OwnerId::parse("a b/c").unwrap();
        let url = client.endpoint(&[owner.as_str(), "add"]);
        assert_eq!(url.as_str(), "http://localhost:5000/cart/a%20b%2Fc/add");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = CartClient::new("http://localhost:5000/api/").unwrap();
        let url = client.endpoint(&["user123"]);
        assert_eq!(url.as_str(), "http://localhost:5000/api/cart/user123");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            CartClient::new("not a url"),
            Err(ClientError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            CartClient::new("mailto:someone@example.com"),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_add_item_body_shape() {
        let item = AddItem {
            product_reference: ProductRef::parse("p1").unwrap(),
            display_name: "Pineapple".to_string(),
            unit_price: Price::new(rust_decimal::Decimal::new(1050, 2)).unwrap(),
            quantity: 2,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productReference"], "p1");
        assert_eq!(json["displayName"], "Pineapple");
        assert_eq!(json["unitPrice"], "10.50");
        assert_eq!(json["quantity"], 2);
    }
}
