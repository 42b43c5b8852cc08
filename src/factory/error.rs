//! Error types for the factory.

use crate::channel::ChannelError;
use thiserror::Error;

/// Errors that can occur while making or shipping products.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// A product could not be serialised into a channel record.
    #[error("failed to encode product: {0}")]
    Encode(#[from] serde_json::Error),

    /// The channel rejected the batch.
    #[error("failed to ship products: {0}")]
    Channel(#[from] ChannelError),

    /// An order asked for more units than the factory makes at once.
    #[error("order for {requested} units exceeds the limit of {limit}")]
    QuantityTooLarge { requested: i64, limit: u64 },
}

impl FactoryError {
    /// Whether the factory can no longer ship anything.
    pub fn is_fatal(&self) -> bool {
        match self {
            FactoryError::Channel(e) => e.is_fatal(),
            FactoryError::Encode(_) | FactoryError::QuantityTooLarge { .. } => false,
        }
    }
}
