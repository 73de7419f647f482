//! Domain types for the Bistro server.
//!
//! These types represent validated domain objects separate from database row
//! types. Row-to-domain conversion lives in the repositories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{Address, FoodId, OrderId, OrderStatus, UserId};

/// A catalog food item.
///
/// Immutable once created except by deletion. `image` is a bare filename
/// under the configured upload directory. Money fields go over the wire as
/// JSON numbers, not strings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FoodItem {
    pub id: FoodId,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// One line of an order: a snapshot copy of the catalog item at placement
/// time, not a live reference. Later catalog edits never change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub food_id: FoodId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

/// A placed order.
///
/// Line items, amount, address and creation time are immutable; only the
/// payment flag and fulfillment status change after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub address: Address,
    pub status: OrderStatus,
    pub payment: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_fields_serialize_as_json_numbers() {
        let item = LineItem {
            food_id: FoodId::generate(),
            name: "Greek Salad".to_owned(),
            price: "12.50".parse().unwrap(),
            quantity: 2,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json.get("price").unwrap(), &serde_json::json!(12.5));
    }

    #[test]
    fn test_line_item_accepts_numeric_price() {
        let json = r#"{
            "food_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "name": "Lasagna Rolls",
            "price": 14,
            "quantity": 1
        }"#;

        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.price, Decimal::from(14));
    }
}
