//! # Message Channel
//!
//! Ordered, partitioned, at-least-once publish/subscribe transport that carries
//! product unit records from the factory to the warehouse.
//!
//! ## Capabilities
//!
//! - [`PublishChannel`] - append a batch of records to a topic, all or nothing
//! - [`ConsumerGroup`] - join a group, get partitions assigned, run a
//!   [`ConsumerGroupHandler`] over each claimed partition
//!
//! The reference backend is an in-process broker: a [`ResourceActor`](crate::framework::ResourceActor)
//! over [`Topic`] entities ([`broker`]), with consumer-group sessions layered on
//! top ([`group`]).
//!
//! ## Delivery
//!
//! Records with the same key land on the same partition and are delivered in
//! append order. A record is redelivered to a group only if nobody marked it:
//! marking commits `offset + 1` for that partition. New groups start from the
//! oldest record.

pub mod broker;
pub mod error;
pub mod group;
pub mod topic;

pub use broker::{BrokerClient, BrokerSettings};
pub use error::*;
pub use group::{GroupSession, MemoryConsumerGroup, PartitionClaim, SessionState};
pub use topic::Topic;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// A record handed to [`PublishChannel::publish_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Partitioning key. Keyless records are spread round-robin.
    pub key: Option<String>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }
}

/// A record as stored in, and delivered from, a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: Option<String>,
    pub value: Vec<u8>,
    pub timestamp: SystemTime,
}

/// Publishing half of the channel.
#[async_trait]
pub trait PublishChannel: Send + Sync {
    /// Appends every record or none of them.
    async fn publish_batch(&self, topic: &str, records: Vec<Record>) -> Result<(), ChannelError>;
}

/// Callbacks a consumer-group member runs for each session.
///
/// `consume_claim` is called once per assigned partition, concurrently across
/// partitions. It should return when the claim runs dry or the session's
/// [`GroupSession::context`] is cancelled.
#[async_trait]
pub trait ConsumerGroupHandler: Send + Sync {
    /// Runs once a session is established, before any claim.
    async fn setup(&self, _session: &GroupSession) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Runs after every claim of the session has returned.
    async fn cleanup(&self, _session: &GroupSession) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn consume_claim(
        &self,
        session: &GroupSession,
        claim: &mut PartitionClaim,
    ) -> Result<(), ChannelError>;
}

/// Consuming half of the channel: one member of one consumer group.
#[async_trait]
pub trait ConsumerGroup: Send + Sync {
    /// Joins the group and runs one session to completion.
    ///
    /// Returns `Ok(())` when the session ends because of a rebalance or because
    /// `token` was cancelled; callers loop to rejoin. Returns
    /// [`ChannelError::GroupClosed`] once [`ConsumerGroup::close`] has been called.
    async fn consume(
        &self,
        token: &CancellationToken,
        handler: Arc<dyn ConsumerGroupHandler>,
    ) -> Result<(), ChannelError>;

    /// Leaves the group. Any running session ends and later `consume` calls fail.
    async fn close(&self) -> Result<(), ChannelError>;
}
