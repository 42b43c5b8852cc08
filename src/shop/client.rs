//! Calls a remote shop over HTTP.

use crate::model::{BuyProductRequest, ListProductsResponse, Product};
use crate::shop::{ShopApi, ShopError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Clone)]
pub struct HttpShopClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpShopClient {
    /// `base_url` is the shop's root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ShopError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(ShopError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ShopApi for HttpShopClient {
    async fn list_products(&self) -> Result<ListProductsResponse, ShopError> {
        let response = self
            .http
            .get(format!("{}/products", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn buy_product(&self, request: BuyProductRequest) -> Result<Product, ShopError> {
        let response = self
            .http
            .post(format!("{}/buy", self.base_url))
            .json(&request)
            .send()
            .await?;
        Self::decode(response).await
    }
}
