//! Order repository - the order ledger state machine.
//!
//! Payment state transitions exactly once from unpaid to paid; the transition
//! is a compare-and-set so concurrent payment-provider callback retries can
//! never double-clear a cart or resurrect a deleted order.

use sqlx::PgPool;
use sqlx::types::Json;

use bistro_core::{Address, OrderId, OrderStatus, UserId};
use rust_decimal::Decimal;

use super::RepositoryError;
use crate::models::{LineItem, Order};

/// Outcome of a payment confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidOutcome {
    /// This call won the unpaid-to-paid transition and cleared the cart.
    Transitioned,
    /// The order was already paid; nothing changed.
    AlreadyPaid,
}

/// Outcome of a payment failure callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The unpaid order was deleted.
    Deleted,
    /// The order was already paid; a stale failure callback never un-pays it.
    AlreadyPaid,
}

/// Database row shape for an order.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<LineItem>>,
    amount: Decimal,
    address: Json<Address>,
    status: String,
    payment: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            amount: row.amount,
            address: row.address.0,
            status,
            payment: row.payment,
            created_at: row.created_at,
        })
    }
}

const SELECT_ORDER: &str = r"
    SELECT id, user_id, items, amount, address, status, payment, created_at
    FROM orders
";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order in the unpaid / Processing state with a full
    /// line-item snapshot, and return it.
    ///
    /// The caller's cart is deliberately left untouched; it is cleared only
    /// on confirmed payment, so an abandoned checkout can be retried.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        user_id: UserId,
        items: Vec<LineItem>,
        amount: Decimal,
        address: Address,
    ) -> Result<Order, RepositoryError> {
        let id = OrderId::generate();
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (id, user_id, items, amount, address, status, payment)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            RETURNING id, user_id, items, amount, address, status, payment, created_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(Json(&items))
        .bind(amount)
        .bind(Json(&address))
        .bind(OrderStatus::default().to_string())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Confirm payment for an order.
    ///
    /// The unpaid-to-paid transition is guarded by `WHERE NOT payment`; the
    /// winning call also clears the owner's cart in the same transaction.
    /// Safe to invoke repeatedly - a retry on an already-paid order is a
    /// no-op reported as [`PaidOutcome::AlreadyPaid`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<PaidOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let winner: Option<(UserId,)> = sqlx::query_as(
            r"
            UPDATE orders
            SET payment = TRUE
            WHERE id = $1 AND NOT payment
            RETURNING user_id
            ",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id,)) = winner else {
            // Lost the CAS: either the order is already paid (retry) or it
            // never existed.
            let exists: Option<(bool,)> = sqlx::query_as("SELECT payment FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.commit().await?;
            return match exists {
                Some(_) => Ok(PaidOutcome::AlreadyPaid),
                None => Err(RepositoryError::NotFound),
            };
        };

        sqlx::query("DELETE FROM cart_entry WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PaidOutcome::Transitioned)
    }

    /// Handle a payment failure callback by deleting the unpaid order.
    ///
    /// Only unpaid orders are deleted; a stale or duplicate failure callback
    /// on a paid order is a no-op. A callback for an unknown (or already
    /// deleted) order surfaces as `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete_unpaid(&self, order_id: OrderId) -> Result<CancelOutcome, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND NOT payment")
            .bind(order_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(CancelOutcome::Deleted);
        }

        let exists: Option<(bool,)> = sqlx::query_as("SELECT payment FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(self.pool)
            .await?;

        match exists {
            Some(_) => Ok(CancelOutcome::AlreadyPaid),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// List a user's orders, newest first, regardless of payment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// List every order in the system, newest first (administrative view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} ORDER BY created_at DESC"))
                .fetch_all(self.pool)
                .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Update an order's fulfillment status.
    ///
    /// Fulfillment advances monotonically; a backward transition is rejected
    /// with `Conflict`. Re-asserting the current status is accepted so
    /// retried updates stay idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the transition moves backward.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((current,)) = current else {
            return Err(RepositoryError::NotFound);
        };

        let current = current.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {order_id}: {e}"))
        })?;

        if !current.can_transition_to(new_status) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move order from '{current}' back to '{new_status}'"
            )));
        }

        sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(new_status.to_string())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bistro_core::FoodId;

    use super::*;
    use crate::db::CartRepository;

    fn address() -> Address {
        Address {
            name: "John Jacob".to_owned(),
            street: "123 Main Street".to_owned(),
            city: "Colombo".to_owned(),
            state: "Western".to_owned(),
            zip: "00100".to_owned(),
            country: "Sri Lanka".to_owned(),
            phone: "0771234567".to_owned(),
            email: "john@example.com".to_owned(),
        }
    }

    fn items() -> Vec<LineItem> {
        vec![LineItem {
            food_id: FoodId::generate(),
            name: "Lasagna Rolls".to_owned(),
            price: "14".parse().unwrap(),
            quantity: 1,
        }]
    }

    async fn place_order(pool: &PgPool, user_id: UserId) -> Order {
        OrderRepository::new(pool)
            .insert(user_id, items(), "16".parse().unwrap(), address())
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn test_mark_paid_twice_clears_cart_exactly_once(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        let cart = CartRepository::new(&pool);
        let user = UserId::generate();
        let food = FoodId::generate();

        cart.add_one(user, food).await.unwrap();
        let order = place_order(&pool, user).await;
        assert!(!order.payment);

        assert_eq!(
            repo.mark_paid(order.id).await.unwrap(),
            PaidOutcome::Transitioned
        );
        assert!(cart.get(user).await.unwrap().is_empty());

        // Items added after payment must survive a duplicate confirmation
        cart.add_one(user, food).await.unwrap();
        assert_eq!(
            repo.mark_paid(order.id).await.unwrap(),
            PaidOutcome::AlreadyPaid
        );
        assert_eq!(cart.get(user).await.unwrap().get(&food).copied(), Some(1));

        let listed = repo.list_for_user(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.first().unwrap().payment);
    }

    #[sqlx::test]
    async fn test_failure_callback_removes_unpaid_order(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        let user = UserId::generate();
        let order = place_order(&pool, user).await;

        assert_eq!(
            repo.delete_unpaid(order.id).await.unwrap(),
            CancelOutcome::Deleted
        );
        assert!(repo.list_for_user(user).await.unwrap().is_empty());

        // Retrying the failure finds nothing left to delete
        assert!(matches!(
            repo.delete_unpaid(order.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[sqlx::test]
    async fn test_failure_callback_never_deletes_a_paid_order(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        let user = UserId::generate();
        let order = place_order(&pool, user).await;

        repo.mark_paid(order.id).await.unwrap();
        assert_eq!(
            repo.delete_unpaid(order.id).await.unwrap(),
            CancelOutcome::AlreadyPaid
        );

        let listed = repo.list_for_user(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.first().unwrap().payment);
    }

    #[sqlx::test]
    async fn test_mark_paid_unknown_order_is_not_found(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        assert!(matches!(
            repo.mark_paid(OrderId::generate()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[sqlx::test]
    async fn test_backward_status_transition_rejected(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        let user = UserId::generate();
        let order = place_order(&pool, user).await;

        repo.update_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert!(matches!(
            repo.update_status(order.id, OrderStatus::Processing).await,
            Err(RepositoryError::Conflict(_))
        ));

        // Re-asserting the current status stays a no-op
        repo.update_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        let listed = repo.list_for_user(user).await.unwrap();
        assert_eq!(listed.first().unwrap().status, OrderStatus::Delivered);
    }
}
