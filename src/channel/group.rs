//! # Consumer Groups
//!
//! [`MemoryConsumerGroup`] is one member of a consumer group on the in-memory
//! broker. Each call to [`ConsumerGroup::consume`] runs one session:
//!
//! 1. join the group and receive a partition assignment and generation
//! 2. run the handler's `setup`
//! 3. start one fetcher and one `consume_claim` per assigned partition
//! 4. wait until the generation moves on, the caller cancels, or the group is
//!    closed; then stop the claims and run `cleanup`
//!
//! Claims resume from the group's committed offset, so anything not marked in
//! an earlier session is delivered again.

use crate::channel::broker::BrokerClient;
use crate::channel::{ChannelError, ConsumerGroup, ConsumerGroupHandler, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a member's current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unassigned,
    Ready,
    Consuming,
    Rebalancing,
    Closed,
}

/// One generation of group membership, shared by every claim of the session.
pub struct GroupSession {
    broker: BrokerClient,
    topic: String,
    group: String,
    member: String,
    generation: u64,
    partitions: Vec<u32>,
    token: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
}

impl GroupSession {
    pub fn member_id(&self) -> &str {
        &self.member
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Partitions assigned to this member for the session.
    pub fn partitions(&self) -> &[u32] {
        &self.partitions
    }

    /// Cancelled when the session ends.
    pub fn context(&self) -> &CancellationToken {
        &self.token
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Marks `message` as processed: the group resumes after it from now on.
    pub async fn mark_message(&self, message: &Message) -> Result<(), ChannelError> {
        self.broker
            .commit(&self.topic, &self.group, message.partition, message.offset + 1)
            .await
    }
}

/// Messages of one partition, delivered to one handler for one session.
pub struct PartitionClaim {
    topic: String,
    partition: u32,
    initial_offset: u64,
    messages: mpsc::Receiver<Message>,
}

impl PartitionClaim {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Offset the claim started from.
    pub fn initial_offset(&self) -> u64 {
        self.initial_offset
    }

    /// Next message, or `None` once the session is over.
    pub async fn next(&mut self) -> Option<Message> {
        self.messages.recv().await
    }
}

/// A member of a consumer group on the in-memory broker.
pub struct MemoryConsumerGroup {
    broker: BrokerClient,
    topic: String,
    group: String,
    member: String,
    fetch_max: usize,
    closed: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
}

impl MemoryConsumerGroup {
    pub fn new(
        broker: BrokerClient,
        topic: impl Into<String>,
        group: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unassigned);
        Self {
            broker,
            topic: topic.into(),
            group: group.into(),
            member: member.into(),
            fetch_max: 64,
            closed: CancellationToken::new(),
            state: Arc::new(state),
        }
    }

    /// Upper bound on messages pulled from the broker per fetch.
    pub fn with_fetch_max(mut self, fetch_max: usize) -> Self {
        self.fetch_max = fetch_max.max(1);
        self
    }

    pub fn member_id(&self) -> &str {
        &self.member
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follows the state of whichever session is current.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn leave(&self) {
        if let Err(e) = self.broker.leave(&self.topic, &self.group, &self.member).await {
            warn!(member = %self.member, error = %e, "Leaving consumer group failed");
        }
    }

    /// Waits for the first claim or fetcher failure, or for all claims to end.
    async fn drive(
        session: &GroupSession,
        claims: &mut JoinSet<Result<(), ChannelError>>,
        fetchers: &mut JoinSet<Result<(), ChannelError>>,
    ) -> Option<ChannelError> {
        let mut failure = None;
        if claims.is_empty() {
            session.token.cancelled().await;
        }
        while let Some(joined) = claims.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(ChannelError::Handler(e.to_string())));
            if let Err(e) = result {
                session.token.cancel();
                failure.get_or_insert(e);
            }
        }
        session.token.cancel();
        while let Some(joined) = fetchers.join_next().await {
            if let Ok(Err(e)) = joined {
                failure.get_or_insert(e);
            }
        }
        failure
    }
}

/// Pulls one partition from the broker into a claim until the session ends.
async fn run_fetcher(
    broker: BrokerClient,
    topic: String,
    partition: u32,
    mut offset: u64,
    max: usize,
    tx: mpsc::Sender<Message>,
    token: CancellationToken,
) -> Result<(), ChannelError> {
    let mut appended = broker.watch(&topic).await?;
    loop {
        let _ = appended.borrow_and_update();
        let batch = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            batch = broker.read_partition(&topic, partition, offset, max) => batch,
        };
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                token.cancel();
                return Err(e);
            }
        };

        if batch.is_empty() {
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                changed = appended.changed() => {
                    if changed.is_err() {
                        token.cancel();
                        return Err(ChannelError::Unavailable(format!("topic {topic} dropped")));
                    }
                }
            }
            continue;
        }

        for message in batch {
            let next = message.offset + 1;
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                sent = tx.send(message) => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
            offset = next;
        }
    }
}

#[async_trait]
impl ConsumerGroup for MemoryConsumerGroup {
    async fn consume(
        &self,
        token: &CancellationToken,
        handler: Arc<dyn ConsumerGroupHandler>,
    ) -> Result<(), ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::GroupClosed);
        }
        if token.is_cancelled() {
            self.state.send_replace(SessionState::Closed);
            return Ok(());
        }

        let assignment = self.broker.join(&self.topic, &self.group, &self.member).await?;
        let session = Arc::new(GroupSession {
            broker: self.broker.clone(),
            topic: self.topic.clone(),
            group: self.group.clone(),
            member: self.member.clone(),
            generation: assignment.generation,
            partitions: assignment.partitions.clone(),
            token: token.child_token(),
            state: self.state.clone(),
        });
        self.state.send_replace(SessionState::Ready);
        info!(
            member = %self.member,
            generation = session.generation,
            partitions = ?session.partitions,
            "Session established"
        );

        // Ends the session when the generation moves on or the group is closed.
        let watcher = {
            let token = session.token.clone();
            let closed = self.closed.clone();
            let generation = assignment.generation;
            let mut rebalance = assignment.rebalance;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = closed.cancelled() => break,
                        changed = rebalance.changed() => {
                            let current = *rebalance.borrow_and_update();
                            if changed.is_err() || current != generation {
                                break;
                            }
                        }
                    }
                }
                token.cancel();
            })
        };

        let mut failure = None;
        if let Err(e) = handler.setup(&session).await {
            session.token.cancel();
            failure = Some(e);
        } else {
            let mut fetchers = JoinSet::new();
            let mut claims = JoinSet::new();
            for &partition in session.partitions() {
                let initial_offset = match self
                    .broker
                    .committed(&self.topic, &self.group, partition)
                    .await
                {
                    Ok(offset) => offset,
                    Err(e) => {
                        session.token.cancel();
                        failure = Some(e);
                        break;
                    }
                };
                let (tx, rx) = mpsc::channel(self.fetch_max);
                fetchers.spawn(run_fetcher(
                    self.broker.clone(),
                    self.topic.clone(),
                    partition,
                    initial_offset,
                    self.fetch_max,
                    tx,
                    session.token.clone(),
                ));
                let mut claim = PartitionClaim {
                    topic: self.topic.clone(),
                    partition,
                    initial_offset,
                    messages: rx,
                };
                let handler = handler.clone();
                let session = session.clone();
                claims.spawn(async move { handler.consume_claim(&session, &mut claim).await });
                debug!(member = %self.member, partition, initial_offset, "Claim started");
            }
            if failure.is_none() {
                self.state.send_replace(SessionState::Consuming);
            }
            if let Some(e) = Self::drive(&session, &mut claims, &mut fetchers).await {
                failure.get_or_insert(e);
            }
            if let Err(e) = handler.cleanup(&session).await {
                failure.get_or_insert(e);
            }
        }
        watcher.abort();

        if self.closed.is_cancelled() || token.is_cancelled() {
            self.state.send_replace(SessionState::Closed);
            self.leave().await;
            info!(member = %self.member, generation = session.generation, "Session closed");
            if self.closed.is_cancelled() {
                return Err(ChannelError::GroupClosed);
            }
        } else {
            self.state.send_replace(SessionState::Rebalancing);
            info!(member = %self.member, generation = session.generation, "Session ended for rebalance");
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.closed.cancel();
        self.broker.leave(&self.topic, &self.group, &self.member).await
    }
}
