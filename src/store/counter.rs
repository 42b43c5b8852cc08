//! The per-key counter entity behind [`MemoryCounterStore`](crate::store::MemoryCounterStore).

use crate::framework::ActorEntity;
use crate::model::SkuKey;
use crate::store::StoreError;
use async_trait::async_trait;

/// One stock counter. Starts at zero the first time its key is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub key: SkuKey,
    pub value: i64,
}

/// Operations on a counter. Both return the value after the change.
#[derive(Debug, Clone)]
pub enum CounterAction {
    IncrementBy(i64),
    DecrementBy(i64),
}

#[async_trait]
impl ActorEntity for Counter {
    type Id = SkuKey;
    type Action = CounterAction;
    type ActionResult = i64;
    type Context = ();
    type Error = StoreError;

    fn vacant(key: &SkuKey, _ctx: &()) -> Self {
        Self {
            key: key.clone(),
            value: 0,
        }
    }

    /// Applies the change or leaves the value untouched on overflow.
    /// No lower bound: a decrement may take the value below zero.
    async fn handle_action(&mut self, action: CounterAction, _ctx: &()) -> Result<i64, StoreError> {
        let next = match action {
            CounterAction::IncrementBy(amount) => self.value.checked_add(amount),
            CounterAction::DecrementBy(amount) => self.value.checked_sub(amount),
        };
        self.value = next.ok_or_else(|| StoreError::Overflow {
            key: self.key.to_string(),
        })?;
        Ok(self.value)
    }
}
