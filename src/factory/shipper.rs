//! Ships products onto the message channel.

use crate::channel::{PublishChannel, Record};
use crate::factory::{FactoryError, Shipper};
use crate::model::Product;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Publishes each product as a flat JSON record, keyed by `name:color`.
#[derive(Clone)]
pub struct ChannelShipper {
    channel: Arc<dyn PublishChannel>,
    topic: String,
}

impl ChannelShipper {
    pub fn new(channel: Arc<dyn PublishChannel>, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Shipper for ChannelShipper {
    async fn ship(&self, products: Vec<Product>) -> Result<(), FactoryError> {
        let records = products
            .iter()
            .map(|product| Ok(Record::new(product.key().as_str(), serde_json::to_vec(product)?)))
            .collect::<Result<Vec<_>, FactoryError>>()?;

        self.channel.publish_batch(&self.topic, records).await?;
        info!(count = products.len(), topic = %self.topic, "Shipped products");
        Ok(())
    }
}
