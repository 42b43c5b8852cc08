//! Error types for the warehouse.

use crate::channel::ChannelError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur while receiving and storing products.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// A record on the topic is not a valid product.
    #[error("failed to decode product record: {0}")]
    Decode(#[from] serde_json::Error),

    /// The counter store rejected the increment.
    #[error("failed to store product: {0}")]
    Store(#[from] StoreError),

    /// The consumer group failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
