//! # Shop
//!
//! Serves a point-in-time inventory snapshot and takes purchases.
//!
//! ## Read path
//!
//! [`Shop::refresh_snapshot`] reads every catalog counter (colors outer, names
//! inner), builds a new list and swaps it in under the write lock. Readers take
//! the read lock just long enough to clone the `Arc`, so a reader sees one
//! whole snapshot or the next one, never a mix.
//!
//! ## Write path
//!
//! [`Shop::buy_product`] decrements the counter store directly and does not
//! touch the snapshot. A purchase therefore shows up in
//! [`ShopApi::list_products`] only after the next refresh. Nothing stops a
//! purchase from driving a counter below zero.

pub mod client;
pub mod error;
pub mod server;

pub use client::HttpShopClient;
pub use error::*;

use crate::model::{BuyProductRequest, Catalog, ListProductsResponse, Product, SkuKey};
use crate::store::AtomicCounterStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

/// The shop's RPC surface, served over HTTP by [`server`] and called by buyers
/// through [`HttpShopClient`].
#[async_trait]
pub trait ShopApi: Send + Sync {
    async fn list_products(&self) -> Result<ListProductsResponse, ShopError>;

    /// Returns the requested product unchanged, not the resulting stock.
    async fn buy_product(&self, request: BuyProductRequest) -> Result<Product, ShopError>;
}

pub struct Shop {
    store: Arc<dyn AtomicCounterStore>,
    catalog: Catalog,
    inventory: RwLock<Arc<Vec<Product>>>,
}

impl Shop {
    /// Creates a shop with an empty snapshot. Call [`Shop::refresh_snapshot`]
    /// before serving.
    pub fn new(store: Arc<dyn AtomicCounterStore>, catalog: Catalog) -> Self {
        Self {
            store,
            catalog,
            inventory: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Rebuilds the snapshot from the counter store.
    ///
    /// On error the previous snapshot stays in place.
    #[instrument(skip(self))]
    pub async fn refresh_snapshot(&self) -> Result<(), ShopError> {
        let mut inventory = Vec::with_capacity(self.catalog.len());
        for (name, color) in self.catalog.pairs() {
            let key = SkuKey::new(name, color);
            let quantity = self.store.get(&key).await.map_err(|e| {
                error!(error = %e, %key, "Failed to read stock");
                e
            })?;
            inventory.push(Product::new(name, color, quantity));
        }

        let count = inventory.len();
        *self.inventory.write().await = Arc::new(inventory);
        info!(count, "Inventory updated");
        Ok(())
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<Vec<Product>> {
        self.inventory.read().await.clone()
    }
}

#[async_trait]
impl ShopApi for Shop {
    async fn list_products(&self) -> Result<ListProductsResponse, ShopError> {
        let snapshot = self.snapshot().await;
        info!(count = snapshot.len(), "Listing products");
        Ok(ListProductsResponse {
            products: snapshot.as_ref().clone(),
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name, surname = %request.surname))]
    async fn buy_product(&self, request: BuyProductRequest) -> Result<Product, ShopError> {
        let product = request.product;
        let remaining = self
            .store
            .decrement(&product.key(), product.quantity)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to decrement product quantity");
                e
            })?;

        info!(?product, remaining, "Product bought");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory;

    fn shop() -> (Arc<Shop>, Arc<dyn AtomicCounterStore>) {
        let (actor, store) = memory::new(128);
        tokio::spawn(actor.run(()));
        let store: Arc<dyn AtomicCounterStore> = Arc::new(store);
        (Arc::new(Shop::new(store.clone(), Catalog::reference())), store)
    }

    fn buy(name: &str, color: &str, quantity: i64) -> BuyProductRequest {
        BuyProductRequest {
            name: "Jane".into(),
            surname: "Doe".into(),
            product: Product::new(name, color, quantity),
        }
    }

    #[tokio::test]
    async fn test_snapshot_has_one_row_per_pair_in_catalog_order() {
        let (shop, store) = shop();
        store.increment(&SkuKey::new("hat", "blue"), 2).await.unwrap();
        shop.refresh_snapshot().await.unwrap();

        let products = shop.list_products().await.unwrap().products;
        let expected: Vec<(String, String)> = Catalog::reference()
            .pairs()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect();
        let actual: Vec<(String, String)> = products
            .iter()
            .map(|p| (p.name.clone(), p.color.clone()))
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(products[0], Product::new("shoes", "red", 0));
        assert!(products.contains(&Product::new("hat", "blue", 2)));
    }

    #[tokio::test]
    async fn test_purchase_is_not_visible_until_next_refresh() {
        let (shop, store) = shop();
        let key = SkuKey::new("shoes", "red");
        store.increment(&key, 5).await.unwrap();
        shop.refresh_snapshot().await.unwrap();

        let echoed = shop.buy_product(buy("shoes", "red", 2)).await.unwrap();
        assert_eq!(echoed, Product::new("shoes", "red", 2));
        assert_eq!(store.get(&key).await.unwrap(), 3);
        assert_eq!(shop.snapshot().await[0].quantity, 5);

        shop.refresh_snapshot().await.unwrap();
        assert_eq!(shop.snapshot().await[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_oversell_drives_counter_negative() {
        let (shop, store) = shop();
        let key = SkuKey::new("socks", "black");
        store.increment(&key, 1).await.unwrap();

        shop.buy_product(buy("socks", "black", 4)).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), -3);
    }

    #[tokio::test]
    async fn test_readers_never_see_a_mixed_snapshot() {
        let (shop, store) = shop();
        shop.refresh_snapshot().await.unwrap();

        let writer = {
            let shop = shop.clone();
            let store = store.clone();
            tokio::spawn(async move {
                let catalog = Catalog::reference();
                for _ in 0..20 {
                    for (name, color) in catalog.pairs() {
                        store.increment(&SkuKey::new(name, color), 1).await.unwrap();
                    }
                    shop.refresh_snapshot().await.unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let shop = shop.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let products = shop.list_products().await.unwrap().products;
                    assert_eq!(products.len(), 25);
                    let first = products[0].quantity;
                    assert!(products.iter().all(|p| p.quantity == first));
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert!(shop.snapshot().await.iter().all(|p| p.quantity == 20));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (actor, store) = memory::new(8);
        let handle = tokio::spawn(actor.run(()));
        let shop = Shop::new(Arc::new(store.clone()), Catalog::reference());
        store.increment(&SkuKey::new("shoes", "red"), 1).await.unwrap();
        shop.refresh_snapshot().await.unwrap();

        handle.abort();
        let _ = handle.await;

        assert!(matches!(
            shop.refresh_snapshot().await,
            Err(ShopError::Store(crate::store::StoreError::Unavailable(_)))
        ));
        assert_eq!(shop.snapshot().await[0], Product::new("shoes", "red", 1));
    }
}
