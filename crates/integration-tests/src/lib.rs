//! Integration tests for Go Marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p go-marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - End-to-end cart operations through a `CartStore`
//! - `cart_persistence` - Hydration and restart behavior against the file backend
//!
//! This library only holds shared fixtures.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use go_marketplace_cart::{CartOptions, CartStore, DecrementPolicy, FileStore, KvStore};
use go_marketplace_core::{Product, ProductId, UnitPrice};

/// Parse a product id, panicking on invalid input.
#[must_use]
pub fn id(s: &str) -> ProductId {
    ProductId::parse(s).unwrap()
}

/// A product priced at `cents`.
#[must_use]
pub fn product(s: &str, cents: u32) -> Product {
    Product::new(
        id(s),
        format!("Product {s}"),
        format!("https://img.example/{s}.png"),
        UnitPrice::from_cents(cents),
    )
}

/// Store options with the given decrement policy and the default key.
#[must_use]
pub fn options(policy: DecrementPolicy) -> CartOptions {
    CartOptions {
        decrement_policy: policy,
        ..CartOptions::default()
    }
}

/// Open a hydrated store backed by the JSON file at `path`.
pub async fn open_file_store(path: &Path, policy: DecrementPolicy) -> CartStore {
    let kv: Arc<dyn KvStore> = Arc::new(FileStore::new(path));
    CartStore::open(kv, options(policy)).await.unwrap()
}
