//! Go Marketplace Cart - Client-side shopping cart state.
//!
//! This crate holds the cart's line items in memory, mirrors them to a local
//! key-value store, and exposes add, increment, and decrement to consumers.
//!
//! # Architecture
//!
//! - [`cart`] - Pure state transitions over the line items
//! - [`store`] - Lifecycle, hydration, and the background persistence writer
//! - [`storage`] - The [`KvStore`] trait with memory and file backends
//! - [`config`] - Environment-driven configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use go_marketplace_cart::{CartOptions, CartStore, FileStore};
//! use go_marketplace_core::{Product, ProductId, UnitPrice};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CartStore::open(Arc::new(FileStore::new("cart.json")), CartOptions::default()).await?;
//! let cart = store.handle();
//!
//! let id = ProductId::parse("sku-1")?;
//! cart.add_to_cart(Product::new(id.clone(), "Mug", "https://img/mug.png", UnitPrice::from_cents(1200)))
//!     .await?;
//! cart.increment(&id).await?;
//!
//! store.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod storage;
pub mod store;

pub use cart::{Cart, CartChange, DecrementPolicy, InvalidCart};
pub use config::{CartConfig, ConfigError};
pub use error::{CartError, Result};
pub use storage::{FileStore, KvStore, MemoryStore, StorageError};
pub use store::{CartHandle, CartOptions, CartStore, Lifecycle};
