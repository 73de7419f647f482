//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health           - Liveness check
//! GET  /health/ready     - Readiness check (database ping)
//!
//! # Catalog
//! POST /food/add         - Add a catalog item (multipart with image)
//! GET  /food/list        - List all catalog items
//! POST /food/remove      - Remove a catalog item
//!
//! # Cart (requires auth)
//! POST /cart/add         - Increment an item's quantity by one
//! POST /cart/remove      - Decrement an item's quantity by one
//! POST /cart/get         - Fetch the full cart mapping
//!
//! # Orders
//! POST /order/place      - Place an order, returns checkout session URL (auth)
//! POST /order/verify     - Payment provider outcome callback
//! POST /order/userorders - Caller's order history (auth)
//! GET  /order/list       - All orders (admin view)
//! POST /order/status     - Update fulfillment status
//! ```

pub mod cart;
pub mod food;
pub mod order;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;

/// Plain `{success, message}` response envelope.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    /// A successful message response.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Create the catalog routes router.
pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(food::add))
        .route("/list", get(food::list))
        .route("/remove", post(food::remove))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/get", post(cart::get))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/place", post(order::place))
        .route("/verify", post(order::verify))
        .route("/userorders", post(order::user_orders))
        .route("/list", get(order::list))
        .route("/status", post(order::update_status))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/food", food_routes())
        .nest("/cart", cart_routes())
        .nest("/order", order_routes())
}
