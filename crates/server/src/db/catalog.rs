//! Catalog repository for food items.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bistro_core::FoodId;

use super::RepositoryError;
use crate::models::FoodItem;

/// Fields required to create a new catalog item.
#[derive(Debug)]
pub struct NewFoodItem {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
}

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new food item and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, item: NewFoodItem) -> Result<FoodItem, RepositoryError> {
        let id = FoodId::generate();
        let row = sqlx::query_as::<_, FoodItem>(
            r"
            INSERT INTO food_item (id, name, description, price, category, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, price, category, image, created_at
            ",
        )
        .bind(id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.category)
        .bind(&item.image)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// List every food item in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<FoodItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, FoodItem>(
            r"
            SELECT id, name, description, price, category, image, created_at
            FROM food_item
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete a food item.
    ///
    /// Historical order snapshots are never touched; they carry their own
    /// copy of the item data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the id is unknown.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: FoodId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM food_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
