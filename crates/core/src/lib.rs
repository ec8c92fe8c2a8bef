//! Go Marketplace Core - Shared cart domain types.
//!
//! This crate provides the types used across all Go Marketplace components:
//! - `cart` - Cart store, persistence, and configuration
//! - `cli` - Command-line front end for the cart
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage
//! backends, no async runtime. This keeps it lightweight and allows it to be
//! used anywhere a cart line needs to be described.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices, quantities, and cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
