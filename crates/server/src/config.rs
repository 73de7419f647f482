//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BISTRO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BISTRO_JWT_SECRET` - HS256 signing secret for bearer tokens (min 32 chars, high entropy)
//! - `BISTRO_FRONTEND_URL` - Public URL of the frontend, used for payment redirect targets
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//!
//! ## Optional
//! - `BISTRO_HOST` - Bind address (default: 127.0.0.1)
//! - `BISTRO_PORT` - Listen port (default: 4000)
//! - `BISTRO_UPLOAD_DIR` - Directory for catalog images (default: uploads)
//! - `BISTRO_DELIVERY_FEE` - Flat delivery surcharge added to every order (default: 2)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com/v1>)
//! - `STRIPE_CURRENCY` - ISO currency code for checkout sessions (default: usd)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Bistro server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public frontend URL, target of the payment success/cancel redirects
    pub frontend_url: String,
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: SecretString,
    /// Stripe Checkout configuration
    pub stripe: StripeConfig,
    /// Directory where uploaded catalog images are stored
    pub upload_dir: PathBuf,
    /// Flat delivery surcharge added to every order amount
    pub delivery_fee: Decimal,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Stripe Checkout configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe API base URL (overridable for tests)
    pub api_base: String,
    /// Stripe API secret key (server-side only)
    pub secret_key: SecretString,
    /// ISO 4217 currency code used for checkout sessions
    pub currency: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("currency", &self.currency)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BISTRO_DATABASE_URL")?;
        let host = get_env_or_default("BISTRO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BISTRO_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BISTRO_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BISTRO_PORT".to_string(), e.to_string()))?;
        let frontend_url = get_required_env("BISTRO_FRONTEND_URL")?;
        let jwt_secret = get_validated_secret("BISTRO_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "BISTRO_JWT_SECRET")?;

        let stripe = StripeConfig::from_env()?;
        let upload_dir = PathBuf::from(get_env_or_default("BISTRO_UPLOAD_DIR", "uploads"));
        let delivery_fee = get_env_or_default("BISTRO_DELIVERY_FEE", "2")
            .parse::<Decimal>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BISTRO_DELIVERY_FEE".to_string(), e.to_string())
            })?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            frontend_url,
            jwt_secret,
            stripe,
            upload_dir,
            delivery_fee,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com/v1"),
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            currency: get_env_or_default("STRIPE_CURRENCY", "usd"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the token signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_jwt_secret(&secret, "TEST_JWT");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_jwt_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_jwt_secret(&secret, "TEST_JWT");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            frontend_url: "http://localhost:5173".to_string(),
            jwt_secret: SecretString::from("x".repeat(32)),
            stripe: StripeConfig {
                api_base: "https://api.stripe.com/v1".to_string(),
                secret_key: SecretString::from("sk_test_123"),
                currency: "usd".to_string(),
            },
            upload_dir: PathBuf::from("uploads"),
            delivery_fee: Decimal::from(2),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_stripe_config_debug_redacts_secret() {
        let config = StripeConfig {
            api_base: "https://api.stripe.com/v1".to_string(),
            secret_key: SecretString::from("sk_live_super_secret"),
            currency: "usd".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_live_super_secret"));
    }
}
