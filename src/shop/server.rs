//! HTTP surface of the shop.
//!
//! | Route | Body | Reply |
//! |---|---|---|
//! | `GET /products` | - | `{"products": [...]}` |
//! | `POST /buy` | `{name, surname, product}` | the requested product |

use crate::error::json_error;
use crate::model::BuyProductRequest;
use crate::shop::{ShopApi, ShopError};
use crate::store::StoreError;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub fn router(shop: Arc<dyn ShopApi>) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/buy", post(buy_product))
        .layer(Extension(shop))
}

fn error_response(e: ShopError) -> Response {
    let (status, code) = match &e {
        ShopError::Store(StoreError::Unavailable(_)) => (StatusCode::BAD_GATEWAY, "store_unavailable"),
        ShopError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        ShopError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_body"),
        ShopError::Transport(_) | ShopError::Remote { .. } => {
            (StatusCode::BAD_GATEWAY, "upstream_error")
        }
    };
    json_error(status, code, e.to_string())
}

async fn list_products(Extension(shop): Extension<Arc<dyn ShopApi>>) -> Response {
    match shop.list_products().await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

async fn buy_product(Extension(shop): Extension<Arc<dyn ShopApi>>, body: Bytes) -> Response {
    let request: BuyProductRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(ShopError::InvalidRequest(e.to_string())),
    };

    match shop.buy_product(request).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => error_response(e),
    }
}
