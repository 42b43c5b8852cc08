//! Redis adapter for [`AtomicCounterStore`].

use crate::model::SkuKey;
use crate::store::{AtomicCounterStore, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, instrument};

/// Counter store backed by Redis `INCRBY`, `DECRBY` and `GET`.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
}

impl RedisCounterStore {
    /// Connects to `redis_url` (e.g. `redis://localhost:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(map_redis_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        info!(redis_url, "connected to redis");
        Ok(Self { conn })
    }
}

fn map_redis_error(e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl AtomicCounterStore for RedisCounterStore {
    #[instrument(skip(self))]
    async fn increment(&self, key: &SkuKey, amount: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.incr(key.as_str(), amount).await.map_err(map_redis_error)
    }

    #[instrument(skip(self))]
    async fn decrement(&self, key: &SkuKey, amount: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.decr(key.as_str(), amount).await.map_err(map_redis_error)
    }

    async fn get(&self, key: &SkuKey) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(key.as_str()).await.map_err(map_redis_error)?;
        Ok(value.unwrap_or(0))
    }
}
