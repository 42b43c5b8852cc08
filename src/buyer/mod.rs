//! # Buyer
//!
//! Drives the shop the way a customer would: look at the inventory, pick a
//! row, buy some of it.

use crate::model::{BuyProductRequest, Product};
use crate::shop::{ShopApi, ShopError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const FIRST_NAMES: [&str; 5] = ["John", "Jane", "Jack", "Jill", "James"];
pub const SURNAMES: [&str; 5] = ["Doe", "Smith", "Johnson", "Brown", "Williams"];

/// Errors that can occur during a shopping trip.
#[derive(Debug, Error)]
pub enum BuyerError {
    /// Listing or buying failed at the shop.
    #[error("shop call failed: {0}")]
    Shop(#[from] ShopError),
}

pub struct RandomBuyer {
    shop: Arc<dyn ShopApi>,
    rng: Mutex<StdRng>,
}

impl RandomBuyer {
    pub fn new(shop: Arc<dyn ShopApi>, rng: StdRng) -> Self {
        Self {
            shop,
            rng: Mutex::new(rng),
        }
    }

    /// Picks a person, a listed product and a quantity below its listed stock.
    ///
    /// `None` when nothing is listed or the picked row has no stock.
    fn choose(&self, products: &[Product]) -> Option<BuyProductRequest> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let row = products.choose(&mut *rng)?;
        if row.quantity <= 0 {
            return None;
        }
        let quantity = rng.gen_range(0..row.quantity);
        let name = FIRST_NAMES.choose(&mut *rng).copied().unwrap_or(FIRST_NAMES[0]);
        let surname = SURNAMES.choose(&mut *rng).copied().unwrap_or(SURNAMES[0]);

        Some(BuyProductRequest {
            name: name.to_string(),
            surname: surname.to_string(),
            product: Product::new(row.name.clone(), row.color.clone(), quantity),
        })
    }

    /// One shopping trip. Returns the bought product, if any.
    #[instrument(skip(self))]
    pub async fn buy(&self) -> Result<Option<Product>, BuyerError> {
        let listed = self.shop.list_products().await?;
        info!(count = listed.products.len(), "Listed products");

        let Some(request) = self.choose(&listed.products) else {
            debug!("Nothing to buy");
            return Ok(None);
        };
        let (name, surname) = (request.name.clone(), request.surname.clone());

        let product = self.shop.buy_product(request).await?;
        info!(
            %name,
            %surname,
            quantity = product.quantity,
            color = %product.color,
            product = %product.name,
            "Bought product"
        );
        Ok(Some(product))
    }
}
