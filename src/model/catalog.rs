//! The closed set of SKU names and colors every component agrees on.

use crate::model::Product;
use rand::seq::SliceRandom;
use rand::Rng;

pub const NAME_SHOES: &str = "shoes";
pub const NAME_HAT: &str = "hat";
pub const NAME_SOCKS: &str = "socks";
pub const NAME_PANTS: &str = "pants";
pub const NAME_SHIRT: &str = "shirt";

pub const COLOR_RED: &str = "red";
pub const COLOR_BLUE: &str = "blue";
pub const COLOR_GREEN: &str = "green";
pub const COLOR_YELLOW: &str = "yellow";
pub const COLOR_BLACK: &str = "black";

/// Fixed catalog of SKU names and colors.
///
/// Every `(name, color)` combination is a stocking unit. The catalog is fixed at
/// startup; components that disagree on it see disjoint key spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    names: Vec<String>,
    colors: Vec<String>,
}

impl Catalog {
    /// Returns `None` if either list is empty.
    pub fn new(names: Vec<String>, colors: Vec<String>) -> Option<Self> {
        if names.is_empty() || colors.is_empty() {
            return None;
        }
        Some(Self { names, colors })
    }

    /// The 5 x 5 reference catalog.
    pub fn reference() -> Self {
        Self {
            names: [NAME_SHOES, NAME_HAT, NAME_SOCKS, NAME_PANTS, NAME_SHIRT]
                .map(String::from)
                .to_vec(),
            colors: [COLOR_RED, COLOR_BLUE, COLOR_GREEN, COLOR_YELLOW, COLOR_BLACK]
                .map(String::from)
                .to_vec(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.names.len() * self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str, color: &str) -> bool {
        self.names.iter().any(|n| n == name) && self.colors.iter().any(|c| c == color)
    }

    /// Every `(name, color)` pair; colors outer, names inner.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.colors.iter().flat_map(move |color| {
            self.names
                .iter()
                .map(move |name| (name.as_str(), color.as_str()))
        })
    }

    /// One unit of a uniformly drawn name and color.
    pub fn random_product<R: Rng + ?Sized>(&self, rng: &mut R) -> Product {
        // Both lists are non-empty by construction.
        let name = self.names.choose(rng).cloned().unwrap_or_default();
        let color = self.colors.choose(rng).cloned().unwrap_or_default();
        Product::new(name, color, 1)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::reference()
    }
}
