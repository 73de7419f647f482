//! Cart route handlers.
//!
//! All cart operations are scoped to the authenticated caller; the user id
//! always comes from the verified bearer token, never from the body.

use std::collections::HashMap;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bistro_core::FoodId;

use crate::db::CartRepository;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::routes::ApiMessage;
use crate::state::AppState;

/// Add/remove request body.
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    #[serde(rename = "itemId")]
    pub item_id: FoodId,
}

/// Cart contents response.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(rename = "cartData")]
    pub cart_data: HashMap<FoodId, u32>,
}

/// Increment an item's cart quantity by one.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<CartItemRequest>,
) -> Result<Json<ApiMessage>> {
    CartRepository::new(state.pool())
        .add_one(user_id, req.item_id)
        .await?;

    Ok(Json(ApiMessage::ok("Added to cart")))
}

/// Decrement an item's cart quantity by one.
///
/// Removing an item that is not in the cart is a no-op, not an error.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<CartItemRequest>,
) -> Result<Json<ApiMessage>> {
    CartRepository::new(state.pool())
        .remove_one(user_id, req.item_id)
        .await?;

    Ok(Json(ApiMessage::ok("Removed from cart")))
}

/// Fetch the caller's cart mapping. Empty map when there are no entries.
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<CartResponse>> {
    let cart_data = CartRepository::new(state.pool()).get(user_id).await?;

    Ok(Json(CartResponse {
        success: true,
        cart_data,
    }))
}
