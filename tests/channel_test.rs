use async_trait::async_trait;
use inventory_pipeline::channel::broker::{self, BrokerClient, BrokerSettings};
use inventory_pipeline::channel::{
    ChannelError, ConsumerGroup, ConsumerGroupHandler, GroupSession, MemoryConsumerGroup,
    PartitionClaim, PublishChannel, Record, SessionState,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Records `(key, sequence)` pairs in delivery order and marks every message.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, u64)>>,
}

#[async_trait]
impl ConsumerGroupHandler for Recorder {
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
            let Some(message) = message else { return Ok(()) };

            let sequence: u64 = String::from_utf8_lossy(&message.value).parse().unwrap();
            self.seen
                .lock()
                .unwrap()
                .push((message.key.clone().unwrap_or_default(), sequence));
            session.mark_message(&message).await?;
        }
    }
}

impl Recorder {
    fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

fn spawn_broker(partitions: u32) -> BrokerClient {
    let (actor, client) = broker::new(128);
    tokio::spawn(actor.run(BrokerSettings { partitions }));
    client
}

fn batch(keys: &[&str], from: u64, count: u64) -> Vec<Record> {
    (from..from + count)
        .flat_map(|seq| keys.iter().map(move |k| Record::new(*k, seq.to_string().into_bytes())))
        .collect()
}

async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(10), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

fn spawn_member(
    broker: &BrokerClient,
    member: &str,
    handler: Arc<Recorder>,
    token: CancellationToken,
) -> (Arc<MemoryConsumerGroup>, tokio::task::JoinHandle<Result<(), ChannelError>>) {
    let group = Arc::new(MemoryConsumerGroup::new(broker.clone(), "products", "warehouse", member));
    let task = tokio::spawn({
        let group = group.clone();
        async move {
            // Rejoin after every rebalance until told to stop
            while !token.is_cancelled() {
                group.consume(&token, handler.clone()).await?;
            }
            Ok(())
        }
    });
    (group, task)
}

#[tokio::test]
async fn test_per_key_order_is_preserved() {
    let broker = spawn_broker(4);
    let keys = ["shoes:red", "hat:blue", "socks:green"];
    broker.publish_batch("products", batch(&keys, 0, 50)).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    let token = CancellationToken::new();
    let (_group, task) = spawn_member(&broker, "m1", recorder.clone(), token.clone());

    wait_until("all records to arrive", || recorder.len() == 150).await;
    token.cancel();
    task.await.unwrap().unwrap();

    let mut last: HashMap<String, u64> = HashMap::new();
    for (key, sequence) in recorder.seen.lock().unwrap().iter() {
        if let Some(previous) = last.insert(key.clone(), *sequence) {
            assert!(previous < *sequence, "{key}: {sequence} after {previous}");
        }
    }
}

#[tokio::test]
async fn test_rebalance_loses_nothing_and_commits_everything() {
    let broker = spawn_broker(3);
    let keys = ["shoes:red", "hat:blue", "socks:green", "pants:black", "shirt:yellow"];
    let recorder = Arc::new(Recorder::default());
    let token = CancellationToken::new();

    // First member alone
    let (first, first_task) = spawn_member(&broker, "a", recorder.clone(), token.clone());
    let mut states = first.subscribe_state();
    states.wait_for(|s| *s == SessionState::Consuming).await.unwrap();
    broker.publish_batch("products", batch(&keys, 0, 20)).await.unwrap();

    // Second member joins; the first one's session ends and it rejoins
    let (_second, second_task) = spawn_member(&broker, "b", recorder.clone(), token.clone());
    broker.publish_batch("products", batch(&keys, 20, 20)).await.unwrap();

    // At least once: every record arrives, some may arrive twice
    wait_until("every record to be delivered", || {
        let seen = recorder.seen.lock().unwrap();
        keys.iter().all(|key| {
            (0..40).all(|seq| seen.iter().any(|(k, s)| k == key && *s == seq))
        })
    })
    .await;

    let topic = broker.topic("products").await.unwrap().unwrap();
    for partition in 0..topic.partition_count() {
        let end = topic.log_end(partition).unwrap();
        let broker = broker.clone();
        tokio::time::timeout(Duration::from_secs(10), async move {
            while broker.committed("products", "warehouse", partition).await.unwrap() < end {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("offsets were not committed");
    }

    token.cancel();
    first_task.await.unwrap().unwrap();
    second_task.await.unwrap().unwrap();
    assert_eq!(first.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_closed_group_is_terminal() {
    let broker = spawn_broker(2);
    let recorder = Arc::new(Recorder::default());
    let token = CancellationToken::new();
    let (group, task) = spawn_member(&broker, "a", recorder, token);
    let mut states = group.subscribe_state();
    states.wait_for(|s| *s == SessionState::Consuming).await.unwrap();

    group.close().await.unwrap();
    assert_eq!(task.await.unwrap(), Err(ChannelError::GroupClosed));
}
