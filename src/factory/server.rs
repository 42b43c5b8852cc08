//! HTTP surface of the factory: `POST /make`.

use crate::error::json_error;
use crate::factory::{FactoryError, ProductFactory};
use crate::model::Product;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::error;

pub fn router(factory: Arc<ProductFactory>) -> Router {
    Router::new()
        .route("/make", post(make))
        .layer(Extension(factory))
}

async fn make(Extension(factory): Extension<Arc<ProductFactory>>, body: Bytes) -> Response {
    let order: Product = match serde_json::from_slice(&body) {
        Ok(order) => order,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()),
    };

    match factory.make(&order).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e @ FactoryError::QuantityTooLarge { .. }) => {
            json_error(StatusCode::BAD_REQUEST, "quantity_too_large", e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Failed to ship products");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "ship_failed", e.to_string())
        }
    }
}
