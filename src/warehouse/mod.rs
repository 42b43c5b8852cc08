//! # Warehouse
//!
//! Durable consumer of the product topic. Every unit record it receives is
//! added to the counter store, then marked consumed.
//!
//! A record is marked whether or not it could be decoded or stored, so one
//! bad record never stalls its partition. Such a record's stock is lost.

pub mod error;
pub mod storage;

pub use error::*;
pub use storage::{CounterWarehouseStorage, WarehouseStorage};

use crate::channel::{ChannelError, ConsumerGroup, ConsumerGroupHandler, GroupSession, PartitionClaim};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Consumer-group handler that stores every claimed record.
pub struct ProductHandler {
    storage: Arc<dyn WarehouseStorage>,
    ready: watch::Sender<bool>,
}

impl ProductHandler {
    pub fn new(storage: Arc<dyn WarehouseStorage>) -> Self {
        let (ready, _) = watch::channel(false);
        Self { storage, ready }
    }

    /// `true` while a session is set up and claims may arrive.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }
}

#[async_trait]
impl ConsumerGroupHandler for ProductHandler {
    async fn setup(&self, session: &GroupSession) -> Result<(), ChannelError> {
        info!(generation = session.generation(), partitions = ?session.partitions(), "Warehouse ready");
        self.ready.send_replace(true);
        Ok(())
    }

    async fn cleanup(&self, _session: &GroupSession) -> Result<(), ChannelError> {
        self.ready.send_replace(false);
        Ok(())
    }

    async fn consume_claim(
        &self,
        session: &GroupSession,
        claim: &mut PartitionClaim,
    ) -> Result<(), ChannelError> {
        loop {
            let message = tokio::select! {
                _ = session.context().cancelled() => return Ok(()),
                message = claim.next() => message,
            };
            let Some(message) = message else {
                info!(partition = claim.partition(), "Message channel was closed");
                return Ok(());
            };

            info!(
                partition = message.partition,
                offset = message.offset,
                topic = %message.topic,
                "Message claimed"
            );
            if let Err(e) = self.storage.store(&message.value).await {
                error!(error = %e, offset = message.offset, "Failed to store");
            }
            session.mark_message(&message).await?;
        }
    }
}

/// One member of the warehouse consumer group.
pub struct Warehouse {
    group: Arc<dyn ConsumerGroup>,
    handler: Arc<ProductHandler>,
}

impl Warehouse {
    pub fn new(group: Arc<dyn ConsumerGroup>, storage: Arc<dyn WarehouseStorage>) -> Self {
        Self {
            group,
            handler: Arc::new(ProductHandler::new(storage)),
        }
    }

    pub fn handler(&self) -> &ProductHandler {
        &self.handler
    }

    /// Runs one consumer-group session.
    ///
    /// Errors that leave the group unusable are returned; anything else is
    /// logged and the next call rejoins.
    pub async fn pick_and_store(&self, token: &CancellationToken) -> Result<(), WarehouseError> {
        match self.group.consume(token, self.handler.clone()).await {
            Err(ChannelError::GroupClosed) => {
                info!("Consumer group closed");
                return Err(ChannelError::GroupClosed.into());
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Consumer group can no longer make progress");
                return Err(e.into());
            }
            Err(e) => warn!(error = %e, "Failed to consume messages"),
            Ok(()) => {}
        }
        Ok(())
    }

    /// Calls [`Warehouse::pick_and_store`] until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) -> Result<(), WarehouseError> {
        while !token.is_cancelled() {
            self.pick_and_store(&token).await?;
        }
        info!("Warehouse stopped");
        Ok(())
    }
}
