//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::checkout::CheckoutClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    checkout: CheckoutClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout HTTP client fails to build.
    pub fn new(
        config: AppConfig,
        pool: PgPool,
    ) -> Result<Self, crate::services::checkout::CheckoutError> {
        let checkout = CheckoutClient::new(&config.stripe)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                checkout,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment checkout client.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutClient {
        &self.inner.checkout
    }
}
