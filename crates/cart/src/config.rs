//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CART_STORE_PATH` - File backing the local key-value store (default: `.gomarketplace/cart.json`)
//! - `CART_STORAGE_KEY` - Key the cart is stored under (default: `@GoMarketplace: CartItems`)
//! - `CART_DECREMENT_POLICY` - `clamp` or `remove` (default: `clamp`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use thiserror::Error;

use crate::cart::DecrementPolicy;

/// Key the cart has always been stored under by the mobile client.
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarketplace: CartItems";

/// Default location of the file-backed store.
pub const DEFAULT_STORE_PATH: &str = ".gomarketplace/cart.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Path of the JSON file used by the file-backed store
    pub store_path: PathBuf,
    /// Key the cart is stored under
    pub storage_key: String,
    /// What decrementing a single-unit line does
    pub decrement_policy: DecrementPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "development", "production")
    pub sentry_environment: Option<String>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            decrement_policy: DecrementPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_path = non_empty(lookup("CART_STORE_PATH"))
            .map_or(defaults.store_path, PathBuf::from);
        let storage_key = non_empty(lookup("CART_STORAGE_KEY")).unwrap_or(defaults.storage_key);
        let decrement_policy = match non_empty(lookup("CART_DECREMENT_POLICY")) {
            Some(value) => value.parse::<DecrementPolicy>().map_err(|e| {
                ConfigError::InvalidEnvVar("CART_DECREMENT_POLICY".to_string(), e)
            })?,
            None => defaults.decrement_policy,
        };

        Ok(Self {
            store_path,
            storage_key,
            decrement_policy,
            sentry_dsn: non_empty(lookup("SENTRY_DSN")),
            sentry_environment: non_empty(lookup("SENTRY_ENVIRONMENT")),
        })
    }
}

/// Treat empty variables as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
