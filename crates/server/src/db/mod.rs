//! Database operations for the Bistro `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `food_item` - Catalog of orderable items
//! - `cart_entry` - Per-user (`user_id`, `food_id`) -> quantity mapping
//! - `orders` - Placed orders with JSONB line-item and address snapshots
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded via
//! `sqlx::migrate!`; they run at process start before the server binds.

pub mod cart;
pub mod catalog;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a rejected status transition).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
