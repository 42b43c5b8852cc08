//! # In-memory Counter Store
//!
//! A [`ResourceActor`] over [`Counter`] entities. The actor handles one request
//! at a time, so concurrent increments and decrements on a key serialize and
//! sum exactly, the same guarantee Redis gives `INCRBY`/`DECRBY`.

use crate::framework::{ActorClient, FrameworkError, ResourceActor, ResourceClient};
use crate::model::SkuKey;
use crate::store::counter::{Counter, CounterAction};
use crate::store::{AtomicCounterStore, StoreError};
use async_trait::async_trait;
use tracing::instrument;

/// Creates the counter actor and a store handle for it.
///
/// The actor must be spawned with `actor.run(())`. It stops once every clone
/// of the returned store has been dropped.
pub fn new(buffer_size: usize) -> (ResourceActor<Counter>, MemoryCounterStore) {
    let (actor, client) = ResourceActor::new(buffer_size);
    (actor, MemoryCounterStore::from_client(client))
}

/// Client-side handle to the in-memory counter actor.
#[derive(Clone)]
pub struct MemoryCounterStore {
    inner: ResourceClient<Counter>,
}

impl MemoryCounterStore {
    pub fn from_client(inner: ResourceClient<Counter>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ActorClient<Counter> for MemoryCounterStore {
    type Error = StoreError;

    fn inner(&self) -> &ResourceClient<Counter> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> StoreError {
        match e {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => {
                StoreError::Unavailable(e.to_string())
            }
            FrameworkError::EntityError(inner) => match inner.downcast::<StoreError>() {
                Ok(store_error) => *store_error,
                Err(other) => StoreError::Command(other.to_string()),
            },
        }
    }
}

#[async_trait]
impl AtomicCounterStore for MemoryCounterStore {
    #[instrument(skip(self))]
    async fn increment(&self, key: &SkuKey, amount: i64) -> Result<i64, StoreError> {
        self.act(key.clone(), CounterAction::IncrementBy(amount)).await
    }

    #[instrument(skip(self))]
    async fn decrement(&self, key: &SkuKey, amount: i64) -> Result<i64, StoreError> {
        self.act(key.clone(), CounterAction::DecrementBy(amount)).await
    }

    async fn get(&self, key: &SkuKey) -> Result<i64, StoreError> {
        Ok(self
            .fetch(key.clone())
            .await?
            .map(|counter| counter.value)
            .unwrap_or(0))
    }
}
