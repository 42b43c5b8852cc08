//! # Topic Entity
//!
//! One topic: a fixed number of append-only partition logs plus the state of
//! every consumer group reading it (members, generation, committed offsets).
//! The broker actor owns all topics, so each action below runs atomically.
//!
//! Offsets are absolute. Once every group has committed past a record it is
//! released, and the partition's base offset moves up to the lowest commit.

use crate::channel::broker::BrokerSettings;
use crate::channel::{ChannelError, Message, Record};
use crate::framework::ActorEntity;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Topic {
    pub name: String,
    partitions: Vec<Partition>,
    next_keyless: u32,
    appended: Arc<watch::Sender<u64>>,
    groups: HashMap<String, GroupState>,
}

#[derive(Debug, Clone, Default)]
struct Partition {
    /// Offset of the first record still held.
    base: u64,
    log: VecDeque<Message>,
}

impl Partition {
    fn end(&self) -> u64 {
        self.base + self.log.len() as u64
    }

    /// Drops every record below `offset`.
    fn release_before(&mut self, offset: u64) -> usize {
        let count = offset.saturating_sub(self.base).min(self.log.len() as u64) as usize;
        self.log.drain(..count);
        self.base += count as u64;
        count
    }
}

#[derive(Debug, Clone)]
struct GroupState {
    members: BTreeSet<String>,
    generation: u64,
    committed: HashMap<u32, u64>,
    rebalance: Arc<watch::Sender<u64>>,
}

impl GroupState {
    fn new() -> Self {
        let (rebalance, _) = watch::channel(0);
        Self {
            members: BTreeSet::new(),
            generation: 0,
            committed: HashMap::new(),
            rebalance: Arc::new(rebalance),
        }
    }

    fn bump(&mut self) {
        self.generation += 1;
        self.rebalance.send_replace(self.generation);
    }

    /// Round-robin over the sorted member list: partition `p` goes to member `p % n`.
    fn partitions_of(&self, member: &str, partition_count: u32) -> Vec<u32> {
        let Some(index) = self.members.iter().position(|m| m == member) else {
            return Vec::new();
        };
        let n = self.members.len();
        (0..partition_count)
            .filter(|p| *p as usize % n == index)
            .collect()
    }
}

/// What a member receives when it joins a group.
#[derive(Debug)]
pub struct Assignment {
    pub generation: u64,
    pub partitions: Vec<u32>,
    /// Changes whenever the group's generation moves past `generation`.
    pub rebalance: watch::Receiver<u64>,
}

#[derive(Debug)]
pub enum TopicAction {
    Append(Vec<Record>),
    Fetch {
        partition: u32,
        offset: u64,
        max: usize,
    },
    /// Subscribe to append notifications.
    Watch,
    Join {
        group: String,
        member: String,
    },
    Leave {
        group: String,
        member: String,
    },
    Commit {
        group: String,
        partition: u32,
        offset: u64,
    },
    Committed {
        group: String,
        partition: u32,
    },
}

#[derive(Debug)]
pub enum TopicActionResult {
    Append(usize),
    Fetch(Vec<Message>),
    Watch(watch::Receiver<u64>),
    Join(Assignment),
    Leave,
    Commit,
    Committed(u64),
}

impl Topic {
    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    /// Offset the next record appended to `partition` will get.
    pub fn log_end(&self, partition: u32) -> Option<u64> {
        self.partitions.get(partition as usize).map(Partition::end)
    }

    /// Offset of the oldest record still held in `partition`.
    pub fn log_start(&self, partition: u32) -> Option<u64> {
        self.partitions.get(partition as usize).map(|p| p.base)
    }

    /// Number of records held in memory for `partition`.
    pub fn retained(&self, partition: u32) -> Option<usize> {
        self.partitions.get(partition as usize).map(|p| p.log.len())
    }

    fn partition_for(&mut self, key: Option<&str>) -> u32 {
        let count = self.partition_count();
        match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % u64::from(count)) as u32
            }
            None => {
                let partition = self.next_keyless % count;
                self.next_keyless = self.next_keyless.wrapping_add(1);
                partition
            }
        }
    }

    fn check_partition(&self, partition: u32) -> Result<(), ChannelError> {
        if partition < self.partition_count() {
            Ok(())
        } else {
            Err(ChannelError::UnknownPartition {
                topic: self.name.clone(),
                partition,
            })
        }
    }

    fn append(&mut self, records: Vec<Record>) -> usize {
        let count = records.len();
        let timestamp = SystemTime::now();
        for record in records {
            let partition = self.partition_for(record.key.as_deref());
            let target = &mut self.partitions[partition as usize];
            let offset = target.end();
            target.log.push_back(Message {
                topic: self.name.clone(),
                partition,
                offset,
                key: record.key,
                value: record.value,
                timestamp,
            });
        }
        if count > 0 {
            self.appended.send_modify(|seq| *seq += 1);
        }
        count
    }

    fn fetch(&self, partition: u32, offset: u64, max: usize) -> Result<Vec<Message>, ChannelError> {
        self.check_partition(partition)?;
        let target = &self.partitions[partition as usize];
        // Offsets below the base were released; resume from the oldest held record.
        let start = offset.saturating_sub(target.base).min(target.log.len() as u64) as usize;
        Ok(target.log.iter().skip(start).take(max).cloned().collect())
    }

    fn commit(&mut self, group: String, partition: u32, offset: u64) -> Result<(), ChannelError> {
        self.check_partition(partition)?;
        let state = self.groups.entry(group).or_insert_with(GroupState::new);
        state
            .committed
            .entry(partition)
            .and_modify(|committed| *committed = (*committed).max(offset))
            .or_insert(offset);
        self.release_committed(partition);
        Ok(())
    }

    /// Releases the records of `partition` that every group has committed past.
    fn release_committed(&mut self, partition: u32) {
        let low_watermark = self
            .groups
            .values()
            .map(|state| state.committed.get(&partition).copied().unwrap_or(0))
            .min();
        if let Some(offset) = low_watermark {
            let released = self.partitions[partition as usize].release_before(offset);
            if released > 0 {
                debug!(topic = %self.name, partition, released, base = offset, "Released committed records");
            }
        }
    }

    fn join(&mut self, group: String, member: String) -> Assignment {
        let count = self.partition_count();
        let state = self.groups.entry(group).or_insert_with(GroupState::new);
        if state.members.insert(member.clone()) {
            state.bump();
        }
        Assignment {
            generation: state.generation,
            partitions: state.partitions_of(&member, count),
            rebalance: state.rebalance.subscribe(),
        }
    }

    fn leave(&mut self, group: &str, member: &str) {
        if let Some(state) = self.groups.get_mut(group) {
            if state.members.remove(member) {
                state.bump();
            }
        }
    }
}

#[async_trait]
impl ActorEntity for Topic {
    type Id = String;
    type Action = TopicAction;
    type ActionResult = TopicActionResult;
    type Context = BrokerSettings;
    type Error = ChannelError;

    fn vacant(id: &String, settings: &BrokerSettings) -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            name: id.clone(),
            partitions: vec![Partition::default(); settings.partitions.max(1) as usize],
            next_keyless: 0,
            appended: Arc::new(appended),
            groups: HashMap::new(),
        }
    }

    async fn handle_action(
        &mut self,
        action: TopicAction,
        _settings: &BrokerSettings,
    ) -> Result<TopicActionResult, ChannelError> {
        match action {
            TopicAction::Append(records) => Ok(TopicActionResult::Append(self.append(records))),
            TopicAction::Fetch {
                partition,
                offset,
                max,
            } => self
                .fetch(partition, offset, max)
                .map(TopicActionResult::Fetch),
            TopicAction::Watch => Ok(TopicActionResult::Watch(self.appended.subscribe())),
            TopicAction::Join { group, member } => {
                Ok(TopicActionResult::Join(self.join(group, member)))
            }
            TopicAction::Leave { group, member } => {
                self.leave(&group, &member);
                Ok(TopicActionResult::Leave)
            }
            TopicAction::Commit {
                group,
                partition,
                offset,
            } => {
                self.commit(group, partition, offset)?;
                Ok(TopicActionResult::Commit)
            }
            TopicAction::Committed { group, partition } => {
                self.check_partition(partition)?;
                let offset = self
                    .groups
                    .get(&group)
                    .and_then(|state| state.committed.get(&partition).copied())
                    .unwrap_or(0);
                Ok(TopicActionResult::Committed(offset))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(partitions: u32) -> Topic {
        Topic::vacant(&"products".to_string(), &BrokerSettings { partitions })
    }

    fn record(key: &str) -> Record {
        Record::new(key, key.as_bytes().to_vec())
    }

    #[test]
    fn test_same_key_lands_on_same_partition_in_order() {
        let mut topic = topic(3);
        topic.append(vec![record("shoes:red"), record("hat:blue"), record("shoes:red")]);

        let shoes: Vec<&Message> = topic
            .partitions
            .iter()
            .flat_map(|p| p.log.iter())
            .filter(|m| m.key.as_deref() == Some("shoes:red"))
            .collect();
        assert_eq!(shoes.len(), 2);
        assert_eq!(shoes[0].partition, shoes[1].partition);
        assert_eq!(shoes[0].offset + 1, shoes[1].offset);
    }

    #[test]
    fn test_fetch_clamps_to_log_end() {
        let mut topic = topic(1);
        topic.append(vec![record("a"), record("b"), record("c")]);

        assert_eq!(topic.fetch(0, 1, 10).unwrap().len(), 2);
        assert!(topic.fetch(0, 7, 10).unwrap().is_empty());
        assert!(matches!(
            topic.fetch(4, 0, 10),
            Err(ChannelError::UnknownPartition { partition: 4, .. })
        ));
    }

    #[test]
    fn test_assignment_is_round_robin_over_sorted_members() {
        let mut topic = topic(3);
        let b = topic.join("g".into(), "b".into());
        assert_eq!(b.partitions, vec![0, 1, 2]);
        assert_eq!(b.generation, 1);

        let a = topic.join("g".into(), "a".into());
        assert_eq!(a.generation, 2);
        assert_eq!(a.partitions, vec![0, 2]);

        let b = topic.join("g".into(), "b".into());
        assert_eq!(b.generation, 2);
        assert_eq!(b.partitions, vec![1]);
    }

    #[test]
    fn test_leave_bumps_generation_once() {
        let mut topic = topic(2);
        let first = topic.join("g".into(), "a".into());
        topic.join("g".into(), "b".into());
        assert!(first.rebalance.has_changed().unwrap());

        topic.leave("g", "b");
        topic.leave("g", "b");
        assert_eq!(topic.groups["g"].generation, 3);
    }

    #[tokio::test]
    async fn test_commit_only_moves_forward() {
        let mut topic = topic(2);
        let settings = BrokerSettings { partitions: 2 };
        for offset in [5, 3] {
            topic
                .handle_action(
                    TopicAction::Commit {
                        group: "g".into(),
                        partition: 1,
                        offset,
                    },
                    &settings,
                )
                .await
                .unwrap();
        }

        let result = topic
            .handle_action(
                TopicAction::Committed {
                    group: "g".into(),
                    partition: 1,
                },
                &settings,
            )
            .await
            .unwrap();
        assert!(matches!(result, TopicActionResult::Committed(5)));
    }

    #[test]
    fn test_records_are_released_once_every_group_commits() {
        let mut topic = topic(1);
        topic.append((0..10).map(|i| record(&i.to_string())).collect());

        topic.commit("warehouse".into(), 0, 6).unwrap();
        assert_eq!(topic.retained(0), Some(4));
        assert_eq!(topic.log_start(0), Some(6));
        assert_eq!(topic.log_end(0), Some(10));

        // A slower group holds records back until it catches up.
        topic.commit("audit".into(), 0, 2).unwrap();
        topic.commit("warehouse".into(), 0, 10).unwrap();
        assert_eq!(topic.retained(0), Some(4));
        topic.commit("audit".into(), 0, 10).unwrap();
        assert_eq!(topic.retained(0), Some(0));

        topic.append(vec![record("k")]);
        let fetched = topic.fetch(0, 0, 10).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].offset, 10);
        assert_eq!(topic.log_end(0), Some(11));
    }
}
