//! Top-level error of the pipeline process, plus the JSON error body shared
//! by the HTTP surfaces.

use crate::buyer::BuyerError;
use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::factory::FactoryError;
use crate::shop::ShopError;
use crate::store::StoreError;
use crate::warehouse::WarehouseError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Shop(#[from] ShopError),

    #[error(transparent)]
    Buyer(#[from] BuyerError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server failed: {0}")]
    Serve(std::io::Error),

    #[error("task panicked: {0}")]
    TaskPanicked(String),
}

/// `{"error": code, "message": text}` with `status`.
pub(crate) fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
