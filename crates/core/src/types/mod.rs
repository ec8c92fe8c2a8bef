//! Core types for Go Marketplace.
//!
//! This module provides type-safe wrappers for the cart's domain concepts.

pub mod id;
pub mod line_item;
pub mod price;
pub mod quantity;

pub use id::{ProductId, ProductIdError};
pub use line_item::{LineItem, Product};
pub use price::{PriceError, UnitPrice};
pub use quantity::{Quantity, QuantityError};
