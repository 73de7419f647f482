//! Shipping address.

use serde::{Deserialize, Serialize};

/// A structured shipping address.
///
/// Captured at order placement and snapshotted onto the order; later edits
/// to a user's saved details never change historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}
