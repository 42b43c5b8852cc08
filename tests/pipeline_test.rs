use inventory_pipeline::config::Config;
use inventory_pipeline::lifecycle::Pipeline;
use inventory_pipeline::model::{BuyProductRequest, Product, SkuKey};
use inventory_pipeline::shop::{HttpShopClient, ShopApi};
use inventory_pipeline::PipelineError;
use std::future::Future;
use std::time::Duration;

/// Production is effectively off (`max_production = 1` always draws zero units),
/// so only `/make` orders add stock.
const QUIET: &str = r#"
[factory]
listen = "127.0.0.1:0"
max_production = 1
shipping_interval_ms = 3600000

[shop]
listen = "127.0.0.1:0"
inventory_update_interval_ms = 50

[warehouse]
members = 2

[buyer]
enabled = false
"#;

async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let waited = tokio::time::timeout(Duration::from_secs(10), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

async fn make(pipeline: &Pipeline, name: &str, color: &str, quantity: i64) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("http://{}/make", pipeline.factory_addr()))
        .json(&Product::new(name, color, quantity))
        .send()
        .await
        .expect("factory unreachable")
        .status()
}

async fn listed(shop: &HttpShopClient, name: &str, color: &str) -> i64 {
    shop.list_products()
        .await
        .expect("shop unreachable")
        .products
        .into_iter()
        .find(|p| p.name == name && p.color == color)
        .map(|p| p.quantity)
        .expect("row missing from snapshot")
}

/// One unit of red shoes travels the whole pipeline and is bought back.
#[tokio::test]
async fn test_unit_travels_from_factory_to_buyer() {
    let pipeline = Pipeline::start(&Config::from_toml(QUIET).unwrap(), Some(7))
        .await
        .expect("pipeline failed to start");
    let shop = &HttpShopClient::new(format!("http://{}", pipeline.shop_addr()));
    let key = &SkuKey::new("shoes", "red");
    let p = &pipeline;

    // The factory ships one unit
    assert_eq!(make(&pipeline, "shoes", "red", 1).await, reqwest::StatusCode::OK);

    // The warehouse stores it
    eventually("warehouse to store the unit", move || async move {
        p.stock(key).await.unwrap() == 1
    })
    .await;

    // The next refresh lists it
    eventually("shop to list the unit", move || async move {
        listed(shop, "shoes", "red").await == 1
    })
    .await;

    // Buying it hits the store at once, the snapshot later
    let bought = shop
        .buy_product(BuyProductRequest {
            name: "John".into(),
            surname: "Doe".into(),
            product: Product::new("shoes", "red", 1),
        })
        .await
        .unwrap();
    assert_eq!(bought, Product::new("shoes", "red", 1));
    assert_eq!(pipeline.stock(key).await.unwrap(), 0);

    eventually("shop to list the purchase", move || async move {
        listed(shop, "shoes", "red").await == 0
    })
    .await;

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stock_adds_up_across_orders() {
    let pipeline = Pipeline::start(&Config::from_toml(QUIET).unwrap(), Some(1)).await.unwrap();

    let orders = [("hat", "blue", 3), ("hat", "blue", 4), ("socks", "green", 2), ("hat", "blue", 0)];
    for (name, color, quantity) in orders {
        assert_eq!(make(&pipeline, name, color, quantity).await, reqwest::StatusCode::OK);
    }

    let p = &pipeline;
    eventually("all orders to be stored", move || async move {
        p.stock(&SkuKey::new("hat", "blue")).await.unwrap() == 7
            && p.stock(&SkuKey::new("socks", "green")).await.unwrap() == 2
    })
    .await;
    assert_eq!(pipeline.stock(&SkuKey::new("shoes", "red")).await.unwrap(), 0);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_make_is_rejected() {
    let pipeline = Pipeline::start(&Config::from_toml(QUIET).unwrap(), None).await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/make", pipeline.factory_addr()))
        .body("{\"name\": 5")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_busy_port_fails_startup() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = Config::from_toml(QUIET).unwrap();
    config.shop.listen = taken.local_addr().unwrap().to_string();

    let err = Pipeline::start(&config, None).await.err().expect("startup should fail");
    assert!(matches!(err, PipelineError::Bind { .. }));
}

/// Everything on, fast intervals: the pipeline runs and stops cleanly.
#[tokio::test]
async fn test_full_pipeline_runs_and_shuts_down() {
    let config = Config::from_toml(
        r#"
        [factory]
        listen = "127.0.0.1:0"
        shipping_interval_ms = 20

        [shop]
        listen = "127.0.0.1:0"
        inventory_update_interval_ms = 20

        [buyer]
        buying_interval_ms = 20
        "#,
    )
    .unwrap();
    let pipeline = Pipeline::start(&config, Some(42)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    tokio::time::timeout(Duration::from_secs(10), pipeline.shutdown())
        .await
        .expect("shutdown hung")
        .unwrap();
}
