//! Cart state and its transitions.
//!
//! [`Cart`] is plain data: it owns the line items and applies add, increment,
//! and decrement without any knowledge of persistence or lifecycle. The store
//! wraps it with locking and the background writer.

use core::fmt;

use go_marketplace_core::{LineItem, Product, ProductId, Quantity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What `decrement` does to a line holding a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecrementPolicy {
    /// Leave the line at quantity 1. Lines are never removed.
    #[default]
    Clamp,
    /// Remove the line from the cart.
    Remove,
}

impl DecrementPolicy {
    /// Lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for DecrementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DecrementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "remove" => Ok(Self::Remove),
            other => Err(format!("unknown decrement policy '{other}' (expected clamp or remove)")),
        }
    }
}

/// Outcome of a cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was created with a single unit.
    Added,
    /// An existing line gained a unit.
    Incremented {
        /// Quantity after the change.
        quantity: Quantity,
    },
    /// An existing line lost a unit.
    Decremented {
        /// Quantity after the change.
        quantity: Quantity,
    },
    /// The line was already at 1 and was left alone.
    Clamped,
    /// The line was at 1 and has been removed.
    Removed,
    /// No line with the given id exists.
    NotFound,
}

impl CartChange {
    /// Whether the cart contents changed.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Clamped | Self::NotFound)
    }
}

/// Cart contents that violate the cart invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCart {
    /// Two lines share a product id.
    #[error("duplicate cart line for product {0}")]
    DuplicateProduct(ProductId),
}

/// The ordered collection of line items. Product ids are unique.
///
/// New lines go to the front, so the most recently added product is first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from existing lines, checking id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCart::DuplicateProduct`] if two lines share an id.
    pub fn from_items(items: Vec<LineItem>) -> Result<Self, InvalidCart> {
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.id) {
                return Err(InvalidCart::DuplicateProduct(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// The lines in display order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Add one unit of `product`.
    ///
    /// A product already in the cart is incremented and its title, image, and
    /// price are replaced with the ones supplied.
    pub fn add(&mut self, product: Product) -> CartChange {
        if let Some(item) = self.get_mut(&product.id) {
            item.refresh(product);
            item.quantity = item.quantity.incremented();
            return CartChange::Incremented {
                quantity: item.quantity,
            };
        }

        self.items.insert(0, LineItem::new(product));
        CartChange::Added
    }

    /// Add one unit to the line for `id`.
    pub fn increment(&mut self, id: &ProductId) -> CartChange {
        let Some(item) = self.get_mut(id) else {
            return CartChange::NotFound;
        };
        item.quantity = item.quantity.incremented();
        CartChange::Incremented {
            quantity: item.quantity,
        }
    }

    /// Remove one unit from the line for `id`, applying `policy` at quantity 1.
    pub fn decrement(&mut self, id: &ProductId, policy: DecrementPolicy) -> CartChange {
        let Some(index) = self.items.iter().position(|item| &item.id == id) else {
            return CartChange::NotFound;
        };
        let Some(item) = self.items.get_mut(index) else {
            return CartChange::NotFound;
        };

        match item.quantity.decremented() {
            Some(quantity) => {
                item.quantity = quantity;
                CartChange::Decremented { quantity }
            }
            None => match policy {
                DecrementPolicy::Clamp => CartChange::Clamped,
                DecrementPolicy::Remove => {
                    self.items.remove(index);
                    CartChange::Removed
                }
            },
        }
    }

    fn get_mut(&mut self, id: &ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<LineItem>::deserialize(deserializer)?;
        Self::from_items(items).map_err(serde::de::Error::custom)
    }
}
