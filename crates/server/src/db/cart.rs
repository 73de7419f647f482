//! Cart repository.
//!
//! The cart is a per-user mapping from food item to a positive quantity.
//! Entries with quantity 0 are removed, never stored, so increments and
//! decrements must be atomic read-modify-writes per key.

use std::collections::HashMap;

use sqlx::PgPool;

use bistro_core::{FoodId, UserId};

use super::RepositoryError;

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Increment the quantity for `(user_id, food_id)` by one, creating the
    /// entry if absent.
    ///
    /// The upsert is a single statement, so concurrent increments on the
    /// same key never lose updates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn add_one(&self, user_id: UserId, food_id: FoodId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_entry (user_id, food_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, food_id)
            DO UPDATE SET quantity = cart_entry.quantity + 1
            ",
        )
        .bind(user_id)
        .bind(food_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Decrement the quantity for `(user_id, food_id)` by one, deleting the
    /// entry when it reaches zero. A missing entry is a no-op, not an error.
    ///
    /// Decrement and delete are one statement, so the stored quantity can
    /// never pass through zero and concurrent decrements serialize on the
    /// row lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn remove_one(
        &self,
        user_id: UserId,
        food_id: FoodId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            WITH decremented AS (
                UPDATE cart_entry
                SET quantity = quantity - 1
                WHERE user_id = $1 AND food_id = $2 AND quantity > 1
            )
            DELETE FROM cart_entry
            WHERE user_id = $1 AND food_id = $2 AND quantity = 1
            ",
        )
        .bind(user_id)
        .bind(food_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the full cart mapping for a user.
    ///
    /// Returns an empty map when the user has no entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is
    /// non-positive.
    pub async fn get(&self, user_id: UserId) -> Result<HashMap<FoodId, u32>, RepositoryError> {
        let rows: Vec<(FoodId, i32)> = sqlx::query_as(
            r"
            SELECT food_id, quantity
            FROM cart_entry
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut cart = HashMap::with_capacity(rows.len());
        for (food_id, quantity) in rows {
            let quantity = u32::try_from(quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "non-positive cart quantity {quantity} for item {food_id}"
                ))
            })?;
            cart.insert(food_id, quantity);
        }

        Ok(cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    #[sqlx::test]
    async fn test_quantity_tracks_adds_minus_removes(pool: PgPool) {
        let repo = CartRepository::new(&pool);
        let user = UserId::generate();
        let food = FoodId::generate();

        repo.add_one(user, food).await.unwrap();
        repo.add_one(user, food).await.unwrap();
        assert_eq!(repo.get(user).await.unwrap().get(&food).copied(), Some(2));

        repo.remove_one(user, food).await.unwrap();
        assert_eq!(repo.get(user).await.unwrap().get(&food).copied(), Some(1));
    }

    #[sqlx::test]
    async fn test_quantity_clamps_at_zero(pool: PgPool) {
        let repo = CartRepository::new(&pool);
        let user = UserId::generate();
        let food = FoodId::generate();

        repo.add_one(user, food).await.unwrap();

        // More removes than adds: the entry disappears and stays gone
        repo.remove_one(user, food).await.unwrap();
        repo.remove_one(user, food).await.unwrap();
        assert!(repo.get(user).await.unwrap().is_empty());

        // A later add starts from scratch, not from a negative count
        repo.add_one(user, food).await.unwrap();
        assert_eq!(repo.get(user).await.unwrap().get(&food).copied(), Some(1));
    }

    #[sqlx::test]
    async fn test_remove_on_missing_entry_is_a_no_op(pool: PgPool) {
        let repo = CartRepository::new(&pool);
        let user = UserId::generate();

        repo.remove_one(user, FoodId::generate()).await.unwrap();
        assert!(repo.get(user).await.unwrap().is_empty());
    }
}
