//! # Counter Store
//!
//! The atomic integer store keyed by `name:color` that both the warehouse
//! (increments) and the shop (reads, decrements) talk to.
//!
//! Pipeline components depend only on [`AtomicCounterStore`]. Two adapters exist:
//!
//! - [`MemoryCounterStore`] - an in-process actor, the default backend
//! - [`RedisCounterStore`] - `INCRBY`/`DECRBY`/`GET` against Redis (feature `redis`)
//!
//! There is no cross-key transaction: touching N keys is N independent atomic
//! operations.

pub mod counter;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_counter;

pub use error::*;
pub use memory::MemoryCounterStore;
#[cfg(feature = "redis")]
pub use redis_counter::RedisCounterStore;

use crate::model::SkuKey;
use async_trait::async_trait;

/// Atomic per-key integer counters.
///
/// Implementations must make concurrent `increment`/`decrement` calls on the
/// same key serialize without lost updates.
#[async_trait]
pub trait AtomicCounterStore: Send + Sync {
    /// Adds `amount` and returns the new value.
    async fn increment(&self, key: &SkuKey, amount: i64) -> Result<i64, StoreError>;

    /// Subtracts `amount` and returns the new value, which may be negative.
    async fn decrement(&self, key: &SkuKey, amount: i64) -> Result<i64, StoreError>;

    /// Current value; a key that was never written reads as zero.
    async fn get(&self, key: &SkuKey) -> Result<i64, StoreError>;
}
