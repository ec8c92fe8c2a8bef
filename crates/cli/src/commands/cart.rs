//! Cart commands.
//!
//! Each command opens the file-backed cart, applies at most one operation,
//! logs the resulting cart, and shuts the store down so the write is flushed
//! before the process exits.
//!
//! # Usage
//!
//! ```bash
//! gm-cart show
//! gm-cart add --id sku-1 --title "Mug" --image-url https://img/mug.png --price 12.00
//! gm-cart increment sku-1
//! gm-cart decrement sku-1
//! ```

use std::sync::Arc;

use go_marketplace_cart::{CartChange, CartConfig, CartOptions, CartStore, FileStore};
use go_marketplace_core::{LineItem, Product, ProductId};
use tracing::info;

/// Open the cart stored at the configured path.
async fn open_store(config: &CartConfig) -> Result<CartStore, Box<dyn std::error::Error>> {
    let kv = Arc::new(FileStore::new(&config.store_path));
    info!(path = %config.store_path.display(), policy = %config.decrement_policy, "Opening cart");
    Ok(CartStore::open(kv, CartOptions::from(config)).await?)
}

/// Log every line of the cart, then shut the store down.
async fn report_and_close(store: CartStore) -> Result<(), Box<dyn std::error::Error>> {
    let cart = store.handle();
    let items = cart.items().await?;

    if items.is_empty() {
        info!("Cart is empty");
    } else {
        for item in &items {
            info!("  {}", format_line(item));
        }
        info!(
            lines = items.len(),
            units = cart.total_quantity().await?,
            "Cart contents"
        );
    }

    store.shutdown().await?;
    Ok(())
}

/// Show the current cart.
///
/// # Errors
///
/// Returns an error if the store file cannot be read.
pub async fn show(config: &CartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    report_and_close(store).await
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns an error if the store file cannot be read or written.
pub async fn add(config: &CartConfig, product: Product) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let id = product.id.clone();
    let change = store.handle().add_to_cart(product).await?;
    log_change(&id, change);
    report_and_close(store).await
}

/// Add one unit to an existing line.
///
/// # Errors
///
/// Returns an error if the store file cannot be read or written.
pub async fn increment(config: &CartConfig, id: &ProductId) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let change = store.handle().increment(id).await?;
    log_change(id, change);
    report_and_close(store).await
}

/// Remove one unit from an existing line.
///
/// # Errors
///
/// Returns an error if the store file cannot be read or written.
pub async fn decrement(config: &CartConfig, id: &ProductId) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let change = store.handle().decrement(id).await?;
    log_change(id, change);
    report_and_close(store).await
}

fn log_change(id: &ProductId, change: CartChange) {
    info!(product_id = %id, "{}", describe_change(change));
}

fn describe_change(change: CartChange) -> String {
    match change {
        CartChange::Added => "added to cart".to_string(),
        CartChange::Incremented { quantity } | CartChange::Decremented { quantity } => {
            format!("quantity is now {quantity}")
        }
        CartChange::Clamped => "already at minimum quantity, left unchanged".to_string(),
        CartChange::Removed => "removed from cart".to_string(),
        CartChange::NotFound => "not in cart, nothing to do".to_string(),
    }
}

fn format_line(item: &LineItem) -> String {
    format!(
        "{} x{} {} @ {} ({})",
        item.id, item.quantity, item.title, item.price, item.image_url
    )
}
