//! Unified error handling for the cart.
//!
//! Provides the `CartError` type returned by every store and handle
//! operation. Malformed persisted data is deliberately absent: hydration
//! discards it and starts from an empty cart.

use thiserror::Error;

use crate::storage::StorageError;
use crate::store::Lifecycle;

/// Error type for cart store operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The store is not active (never hydrated, or already shut down).
    #[error("cart {operation} called while the store is {lifecycle}; the store must be hydrated and not shut down")]
    Misuse {
        /// Operation that was attempted.
        operation: &'static str,
        /// Lifecycle state at the time of the call.
        lifecycle: Lifecycle,
    },

    /// Reading from or writing to the key-value store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// The cart could not be encoded for storage.
    #[error("failed to encode cart: {0}")]
    Encode(#[from] serde_json::Error),

    /// The background writer stopped before the write was confirmed.
    #[error("cart writer stopped before persisting the latest state")]
    WriterStopped,
}

impl CartError {
    /// Whether this error comes from calling the store outside its lifecycle.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::Misuse { .. })
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_display() {
        let err = CartError::Misuse {
            operation: "add_to_cart",
            lifecycle: Lifecycle::ShutDown,
        };
        assert!(err.is_misuse());
        assert_eq!(
            err.to_string(),
            "cart add_to_cart called while the store is shut down; the store must be hydrated and not shut down"
        );
    }

    #[test]
    fn test_persistence_display() {
        let err = CartError::from(StorageError::Rejected("cart".to_string()));
        assert!(!err.is_misuse());
        assert_eq!(
            err.to_string(),
            "persistence error: write rejected for key cart"
        );
    }

    #[test]
    fn test_encode_and_writer_stopped() {
        let json_err = serde_json::from_str::<u32>("x").unwrap_err();
        let err = CartError::from(json_err);
        assert!(matches!(err, CartError::Encode(_)));
        assert!(err.to_string().starts_with("failed to encode cart: "));

        let err = CartError::WriterStopped;
        assert!(!err.is_misuse());
        assert_eq!(
            err.to_string(),
            "cart writer stopped before persisting the latest state"
        );
    }
}
