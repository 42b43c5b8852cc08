//! Error types for the counter store.

use thiserror::Error;

/// Errors returned by an [`AtomicCounterStore`](crate::store::AtomicCounterStore).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The increment or decrement would leave the `i64` range.
    #[error("increment or decrement would overflow counter {key}")]
    Overflow { key: String },

    /// The store could not be reached.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but rejected or failed the command.
    #[error("counter store command failed: {0}")]
    Command(String),
}
