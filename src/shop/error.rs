//! Error types for the shop and its HTTP client.

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur while listing or buying products.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The counter store failed the read or decrement.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The shop could not be reached.
    #[error("shop request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The shop answered with an error status.
    #[error("shop returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// The request was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
