//! Cart route handlers.
//!
//! The owner ID comes from the path and is treated as an opaque string handed
//! over by the identity provider. Product details arrive in the add request
//! body and are frozen into the line item; they are never re-validated
//! against the catalog.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfront_core::{Cart, CartItemError, ItemId, NewLineItem, OwnerId, Price, ProductRef};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::CartError;
use crate::state::AppState;

/// Add to cart request body.
///
/// Fields are optional at the serde level so that a missing field is
/// reported by name rather than as a generic parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_reference: Option<String>,
    pub display_name: Option<String>,
    pub unit_price: Option<Decimal>,
    /// Defaults to 1.
    pub quantity: Option<i32>,
}

impl AddItemRequest {
    /// Validate the request into a line item.
    fn into_line_item(self) -> std::result::Result<NewLineItem, CartError> {
        let product_reference = self
            .product_reference
            .ok_or_else(|| required("productReference"))?;
        let display_name = self.display_name.ok_or_else(|| required("displayName"))?;
        let unit_price = self.unit_price.ok_or_else(|| required("unitPrice"))?;

        let product_ref = ProductRef::parse(&product_reference).map_err(CartItemError::from)?;
        let unit_price = Price::new(unit_price).map_err(CartItemError::from)?;

        Ok(NewLineItem::new(
            product_ref,
            display_name,
            unit_price,
            self.quantity.unwrap_or(1),
        )?)
    }
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: Option<i32>,
}

/// Response for cart mutations.
#[derive(Debug, Serialize)]
pub struct CartMutationResponse {
    pub message: &'static str,
    pub cart: Cart,
}

/// Cart count badge response.
#[derive(Debug, Serialize)]
pub struct CartCountResponse {
    pub count: i64,
}

fn required(field: &str) -> CartError {
    CartError::Validation(format!("{field} is required"))
}

fn parse_owner(raw: &str) -> Result<OwnerId> {
    OwnerId::parse(raw).map_err(|e| AppError::Validation(e.to_string()))
}

fn parse_item(raw: &str) -> Result<ItemId> {
    raw.parse::<ItemId>()
        .map_err(|_| AppError::Validation(format!("invalid item id '{raw}'")))
}

/// Get the owner's cart, creating it if absent.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Cart>> {
    let owner_id = parse_owner(&owner_id)?;
    let cart = state.carts().get_cart(&owner_id).await?;
    Ok(Json(cart))
}

/// Add an item to the cart, merging with an existing line for the same product.
#[instrument(skip(state, payload))]
pub async fn add(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartMutationResponse>> {
    let owner_id = parse_owner(&owner_id)?;
    let Json(request) = payload?;
    let item = request.into_line_item()?;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[
            ("owner_id", owner_id.as_str()),
            ("product_reference", item.product_ref().as_str()),
        ]),
    );

    let cart = state.carts().add_item(&owner_id, item).await?;
    Ok(Json(CartMutationResponse {
        message: "Item added to cart successfully",
        cart,
    }))
}

/// Overwrite the quantity of one cart line.
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path((owner_id, item_id)): Path<(String, String)>,
    payload: std::result::Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CartMutationResponse>> {
    let owner_id = parse_owner(&owner_id)?;
    let item_id = parse_item(&item_id)?;
    let Json(request) = payload?;
    let quantity = request.quantity.ok_or_else(|| required("quantity"))?;

    let cart = state
        .carts()
        .update_quantity(&owner_id, item_id, quantity)
        .await?;
    Ok(Json(CartMutationResponse {
        message: "Cart item updated successfully",
        cart,
    }))
}

/// Remove one cart line. Unknown items are ignored.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path((owner_id, item_id)): Path<(String, String)>,
) -> Result<Json<CartMutationResponse>> {
    let owner_id = parse_owner(&owner_id)?;
    let item_id = parse_item(&item_id)?;

    let cart = state.carts().remove_item(&owner_id, item_id).await?;
    Ok(Json(CartMutationResponse {
        message: "Cart item removed successfully",
        cart,
    }))
}

/// Get the cart item count badge value.
#[instrument(skip(state))]
pub async fn count(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<CartCountResponse>> {
    let owner_id = parse_owner(&owner_id)?;
    let count = state.carts().item_count(&owner_id).await?;
    Ok(Json(CartCountResponse { count }))
}
