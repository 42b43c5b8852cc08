//! # Factory
//!
//! Generates saleable inventory and ships it to the warehouse through the
//! message channel. Two paths produce unit records, and both ship them the same
//! way so the warehouse cannot tell them apart:
//!
//! - [`ProductFactory::produce`] - a random batch, run on every production tick
//! - [`ProductFactory::make`] - an on-demand order, behind `POST /make` ([`server`])
//!
//! Shipping is fire-and-forget with respect to stock: a shipped unit only shows
//! up in the counter store once the warehouse has consumed it.

pub mod error;
pub mod server;
pub mod shipper;

pub use error::*;
pub use shipper::ChannelShipper;

use crate::model::{Catalog, Product};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, instrument};

/// Largest order `make` accepts unless configured otherwise.
pub const DEFAULT_MAX_ORDER: u64 = 10_000;

/// Sends a batch of products downstream.
#[async_trait]
pub trait Shipper: Send + Sync {
    /// Ships all products or none of them. An empty batch succeeds.
    async fn ship(&self, products: Vec<Product>) -> Result<(), FactoryError>;
}

pub struct ProductFactory {
    catalog: Catalog,
    max_production: u32,
    shipper: Arc<dyn Shipper>,
    rng: Mutex<StdRng>,
    batches: AtomicU64,
    max_order: u64,
}

impl ProductFactory {
    pub fn new(catalog: Catalog, max_production: u32, shipper: Arc<dyn Shipper>, rng: StdRng) -> Self {
        Self {
            catalog,
            max_production,
            shipper,
            rng: Mutex::new(rng),
            batches: AtomicU64::new(0),
            max_order: DEFAULT_MAX_ORDER,
        }
    }

    /// Caps the number of units a single `make` order may expand into.
    pub fn with_max_order(mut self, max_order: u64) -> Self {
        self.max_order = max_order;
        self
    }

    /// Number of production batches shipped so far.
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Produces between zero and `max_production - 1` random units and ships
    /// them as one batch. Returns how many were shipped.
    #[instrument(skip(self))]
    pub async fn produce(&self) -> Result<usize, FactoryError> {
        let products: Vec<Product> = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let count = if self.max_production == 0 {
                0
            } else {
                rng.gen_range(0..self.max_production)
            };
            (0..count)
                .map(|_| self.catalog.random_product(&mut *rng))
                .collect()
        };
        let count = products.len();
        info!(count, "Produced products");

        self.shipper.ship(products).await?;
        let batches = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        info!(count, batches, "Production batch shipped");
        Ok(count)
    }

    /// Expands `order` into `order.quantity` units and ships them as one batch.
    /// A non-positive quantity ships nothing. Orders above the configured
    /// limit are rejected before anything is built.
    #[instrument(skip(self, order), fields(name = %order.name, color = %order.color, quantity = order.quantity))]
    pub async fn make(&self, order: &Product) -> Result<usize, FactoryError> {
        info!("Received order to make");
        let requested = u64::try_from(order.quantity).unwrap_or(0);
        if requested > self.max_order {
            return Err(FactoryError::QuantityTooLarge {
                requested: order.quantity,
                limit: self.max_order,
            });
        }
        let count = usize::try_from(requested).map_err(|_| FactoryError::QuantityTooLarge {
            requested: order.quantity,
            limit: self.max_order,
        })?;
        let units = vec![Product::new(order.name.clone(), order.color.clone(), 1); count];
        self.shipper.ship(units).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Captured {
        shipments: Mutex<Vec<Vec<Product>>>,
    }

    #[async_trait]
    impl Shipper for Captured {
        async fn ship(&self, products: Vec<Product>) -> Result<(), FactoryError> {
            self.shipments.lock().unwrap().push(products);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Shipper for Broken {
        async fn ship(&self, _: Vec<Product>) -> Result<(), FactoryError> {
            Err(ChannelError::Unavailable("broker down".into()).into())
        }
    }

    fn factory(shipper: Arc<dyn Shipper>, max_production: u32, seed: u64) -> ProductFactory {
        ProductFactory::new(Catalog::reference(), max_production, shipper, StdRng::seed_from_u64(seed))
    }

    #[tokio::test]
    async fn test_produce_ships_unit_records_from_catalog() {
        let shipper = Arc::new(Captured::default());
        let factory = factory(shipper.clone(), 10, 7);

        for _ in 0..20 {
            let count = factory.produce().await.unwrap();
            assert!(count < 10);
        }

        let shipments = shipper.shipments.lock().unwrap();
        assert_eq!(shipments.len(), 20);
        assert_eq!(factory.batches(), 20);
        let catalog = Catalog::reference();
        for product in shipments.iter().flatten() {
            assert_eq!(product.quantity, 1);
            assert!(catalog.contains(&product.name, &product.color));
        }
    }

    #[tokio::test]
    async fn test_same_seed_produces_same_batches() {
        let first = Arc::new(Captured::default());
        let second = Arc::new(Captured::default());
        let a = factory(first.clone(), 10, 42);
        let b = factory(second.clone(), 10, 42);
        for _ in 0..5 {
            a.produce().await.unwrap();
            b.produce().await.unwrap();
        }
        assert_eq!(*first.shipments.lock().unwrap(), *second.shipments.lock().unwrap());
    }

    #[tokio::test]
    async fn test_make_expands_quantity_into_units() {
        let shipper = Arc::new(Captured::default());
        let factory = factory(shipper.clone(), 10, 1);

        assert_eq!(factory.make(&Product::new("hat", "blue", 3)).await.unwrap(), 3);
        assert_eq!(factory.make(&Product::new("hat", "blue", -2)).await.unwrap(), 0);

        let shipments = shipper.shipments.lock().unwrap();
        assert_eq!(shipments[0], vec![Product::new("hat", "blue", 1); 3]);
        assert!(shipments[1].is_empty());
    }

    #[tokio::test]
    async fn test_make_rejects_orders_above_limit() {
        let shipper = Arc::new(Captured::default());
        let factory = factory(shipper.clone(), 10, 1).with_max_order(5);

        assert_eq!(factory.make(&Product::new("hat", "blue", 5)).await.unwrap(), 5);
        let err = factory.make(&Product::new("hat", "blue", i64::MAX)).await.unwrap_err();
        assert!(matches!(err, FactoryError::QuantityTooLarge { limit: 5, .. }));
        assert!(!err.is_fatal());

        assert_eq!(shipper.shipments.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_ship_is_reported_and_not_counted() {
        let factory = factory(Arc::new(Broken), 10, 3);
        assert!(factory.produce().await.unwrap_err().is_fatal());
        assert_eq!(factory.batches(), 0);
    }
}
