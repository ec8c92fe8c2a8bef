//! Key-value persistence for the cart.
//!
//! The cart is stored as a single string value under a fixed key. Backends
//! implement [`KvStore`]; the store only ever calls `get` during hydration and
//! `set` from its background writer.
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process map, used by tests and embedders
//! - [`FileStore`] - JSON object file on local disk, used by the CLI

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors raised by a storage backend.
///
/// Cloneable so a failed background write can be reported to every caller
/// waiting on a flush.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File the operation touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The store file could not be encoded.
    #[error("failed to encode store file {path}: {message}")]
    Encode {
        /// File being written.
        path: PathBuf,
        /// Encoder message.
        message: String,
    },

    /// The backend refused the write.
    #[error("write rejected for key {0}")]
    Rejected(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// Asynchronous string key-value storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
