//! # In-memory Broker
//!
//! A [`ResourceActor`] over [`Topic`] entities. Topics are created on first use
//! with the configured partition count. [`BrokerClient`] is the typed handle
//! that publishers and consumer groups share.

use crate::channel::topic::{Assignment, Topic, TopicAction, TopicActionResult};
use crate::channel::{ChannelError, Message, PublishChannel, Record};
use crate::framework::{ActorClient, FrameworkError, ResourceActor, ResourceClient};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Settings every topic is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerSettings {
    pub partitions: u32,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self { partitions: 3 }
    }
}

/// Creates the broker actor and a client for it.
///
/// Spawn the actor with `actor.run(settings)`.
pub fn new(buffer_size: usize) -> (ResourceActor<Topic>, BrokerClient) {
    let (actor, client) = ResourceActor::new(buffer_size);
    (actor, BrokerClient::from_client(client))
}

#[derive(Clone)]
pub struct BrokerClient {
    inner: ResourceClient<Topic>,
}

fn unexpected(result: TopicActionResult) -> ChannelError {
    ChannelError::Broker(format!("unexpected broker response: {result:?}"))
}

impl BrokerClient {
    pub fn from_client(inner: ResourceClient<Topic>) -> Self {
        Self { inner }
    }

    /// Appends `records` and returns how many were stored.
    pub async fn append(&self, topic: &str, records: Vec<Record>) -> Result<usize, ChannelError> {
        match self.act(topic.to_string(), TopicAction::Append(records)).await? {
            TopicActionResult::Append(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Up to `max` messages of `partition` starting at `offset`.
    pub async fn read_partition(
        &self,
        topic: &str,
        partition: u32,
        offset: u64,
        max: usize,
    ) -> Result<Vec<Message>, ChannelError> {
        let action = TopicAction::Fetch {
            partition,
            offset,
            max,
        };
        match self.act(topic.to_string(), action).await? {
            TopicActionResult::Fetch(messages) => Ok(messages),
            other => Err(unexpected(other)),
        }
    }

    /// A receiver that changes after every non-empty append to `topic`.
    pub async fn watch(&self, topic: &str) -> Result<watch::Receiver<u64>, ChannelError> {
        match self.act(topic.to_string(), TopicAction::Watch).await? {
            TopicActionResult::Watch(receiver) => Ok(receiver),
            other => Err(unexpected(other)),
        }
    }

    pub async fn join(&self, topic: &str, group: &str, member: &str) -> Result<Assignment, ChannelError> {
        let action = TopicAction::Join {
            group: group.to_string(),
            member: member.to_string(),
        };
        match self.act(topic.to_string(), action).await? {
            TopicActionResult::Join(assignment) => Ok(assignment),
            other => Err(unexpected(other)),
        }
    }

    pub async fn leave(&self, topic: &str, group: &str, member: &str) -> Result<(), ChannelError> {
        let action = TopicAction::Leave {
            group: group.to_string(),
            member: member.to_string(),
        };
        match self.act(topic.to_string(), action).await? {
            TopicActionResult::Leave => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Records `offset` as the next offset `group` reads from `partition`.
    pub async fn commit(
        &self,
        topic: &str,
        group: &str,
        partition: u32,
        offset: u64,
    ) -> Result<(), ChannelError> {
        let action = TopicAction::Commit {
            group: group.to_string(),
            partition,
            offset,
        };
        match self.act(topic.to_string(), action).await? {
            TopicActionResult::Commit => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// The committed offset of `group` on `partition`, zero if none.
    pub async fn committed(&self, topic: &str, group: &str, partition: u32) -> Result<u64, ChannelError> {
        let action = TopicAction::Committed {
            group: group.to_string(),
            partition,
        };
        match self.act(topic.to_string(), action).await? {
            TopicActionResult::Committed(offset) => Ok(offset),
            other => Err(unexpected(other)),
        }
    }

    /// Snapshot of a topic, `None` if nothing ever touched it.
    pub async fn topic(&self, topic: &str) -> Result<Option<Topic>, ChannelError> {
        self.fetch(topic.to_string()).await
    }
}

#[async_trait]
impl ActorClient<Topic> for BrokerClient {
    type Error = ChannelError;

    fn inner(&self) -> &ResourceClient<Topic> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> ChannelError {
        match e {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => {
                ChannelError::Unavailable(e.to_string())
            }
            FrameworkError::EntityError(inner) => match inner.downcast::<ChannelError>() {
                Ok(channel_error) => *channel_error,
                Err(other) => ChannelError::Broker(other.to_string()),
            },
        }
    }
}

#[async_trait]
impl PublishChannel for BrokerClient {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn publish_batch(&self, topic: &str, records: Vec<Record>) -> Result<(), ChannelError> {
        let stored = self.append(topic, records).await?;
        debug!(stored, "Batch appended");
        Ok(())
    }
}
