//! Cart line types.
//!
//! A [`Product`] is what the catalog hands to the cart; a [`LineItem`] is that
//! product plus a quantity once it is in the cart. The serialized field names
//! (`id`, `title`, `image_url`, `price`, `quantity`) are the persisted cart
//! format and must not change.

use serde::{Deserialize, Serialize};

use super::{ProductId, Quantity, UnitPrice};

/// A catalog product as offered to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image URL.
    pub image_url: String,
    /// Price of a single unit.
    pub price: UnitPrice,
}

impl Product {
    /// Create a product description.
    #[must_use]
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: UnitPrice,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }
}

/// One product entry in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image URL.
    pub image_url: String,
    /// Price of a single unit.
    pub price: UnitPrice,
    /// Units in the cart.
    pub quantity: Quantity,
}

impl LineItem {
    /// Start a new line for `product` with a single unit.
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self::with_quantity(product, Quantity::ONE)
    }

    /// Build a line for `product` holding `quantity` units.
    #[must_use]
    pub fn with_quantity(product: Product, quantity: Quantity) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            price: product.price,
            quantity,
        }
    }

    /// Replace the descriptive fields with those of `product`, keeping the quantity.
    pub fn refresh(&mut self, product: Product) {
        self.title = product.title;
        self.image_url = product.image_url;
        self.price = product.price;
    }

    /// The product this line was created from.
    #[must_use]
    pub fn product(&self) -> Product {
        Product {
            id: self.id.clone(),
            title: self.title.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
        }
    }
}
