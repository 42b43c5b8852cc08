//! Folds decoded unit records into the counter store.

use crate::model::Product;
use crate::store::AtomicCounterStore;
use crate::warehouse::WarehouseError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Where the warehouse puts what it receives.
#[async_trait]
pub trait WarehouseStorage: Send + Sync {
    /// Decodes one record and stores it, returning the decoded product.
    async fn store(&self, data: &[u8]) -> Result<Product, WarehouseError>;
}

/// Adds each record's quantity to its `name:color` counter.
#[derive(Clone)]
pub struct CounterWarehouseStorage {
    store: Arc<dyn AtomicCounterStore>,
}

impl CounterWarehouseStorage {
    pub fn new(store: Arc<dyn AtomicCounterStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WarehouseStorage for CounterWarehouseStorage {
    #[instrument(skip_all, fields(bytes = data.len()))]
    async fn store(&self, data: &[u8]) -> Result<Product, WarehouseError> {
        let product: Product = serde_json::from_slice(data)?;
        let stock = self.store.increment(&product.key(), product.quantity).await?;
        debug!(key = %product.key(), stock, "Stored product");
        Ok(product)
    }
}
