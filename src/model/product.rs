//! Product unit records and the request/response shapes of the shop.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A quantity of one catalog SKU in one color.
///
/// This is the flat `{name, color, quantity}` record that travels on the message
/// channel, that the shop returns as a snapshot row, and that buyers submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub quantity: i64,
}

impl Product {
    pub fn new(name: impl Into<String>, color: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            quantity,
        }
    }

    /// The counter key this product's stock is kept under.
    pub fn key(&self) -> SkuKey {
        SkuKey::new(&self.name, &self.color)
    }
}

/// Counter-store key for a `(name, color)` pair, rendered as `name:color`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkuKey(String);

impl SkuKey {
    pub fn new(name: &str, color: &str) -> Self {
        Self(format!("{name}:{color}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SkuKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a `BuyProduct` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyProductRequest {
    pub name: String,
    pub surname: String,
    pub product: Product,
}

/// Body returned by `ListProducts`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListProductsResponse {
    pub products: Vec<Product>,
}
