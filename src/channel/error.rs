//! Error types for the message channel.

use thiserror::Error;

/// Errors raised by publishers, consumer groups and the broker.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChannelError {
    /// The broker is gone or stopped answering.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// This consumer group handle was closed.
    #[error("consumer group closed")]
    GroupClosed,

    #[error("unknown partition {partition} for topic {topic}")]
    UnknownPartition { topic: String, partition: u32 },

    /// A consumer-group handler failed its setup, claim or cleanup.
    #[error("consumer handler failed: {0}")]
    Handler(String),

    #[error("broker error: {0}")]
    Broker(String),
}

impl ChannelError {
    /// Whether the caller can no longer make progress through this channel.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChannelError::GroupClosed | ChannelError::Unavailable(_))
    }
}
