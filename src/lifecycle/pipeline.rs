use crate::buyer::RandomBuyer;
use crate::channel::broker::{self, BrokerClient, BrokerSettings};
use crate::channel::MemoryConsumerGroup;
use crate::config::{Config, StoreBackend};
use crate::error::PipelineError;
use crate::factory::server::router as factory_router;
use crate::factory::{ChannelShipper, ProductFactory};
use crate::lifecycle::periodic::run_periodic;
use crate::lifecycle::tasks::TaskGroup;
use crate::model::SkuKey;
use crate::shop::server::router as shop_router;
use crate::shop::{HttpShopClient, Shop};
use crate::store::{memory, AtomicCounterStore};
use crate::warehouse::{CounterWarehouseStorage, Warehouse};
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The whole supply chain in one process.
///
/// `start` wires the counter store, the broker, the factory, the warehouse
/// members, the shop and the buyer, then spawns:
///
/// - `factory-production` - one production batch per shipping interval
/// - `factory-server` - `POST /make`
/// - `warehouse` - one per consumer-group member
/// - `shop-refresh` - one snapshot refresh per update interval
/// - `shop-server` - `GET /products`, `POST /buy`
/// - `buyer` - one shopping trip per buying interval (if enabled)
///
/// All tasks share one [`CancellationToken`]. The first task to fail cancels it.
///
/// ```ignore
/// let pipeline = Pipeline::start(&config, Some(42)).await?;
/// let token = pipeline.cancellation();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     token.cancel();
/// });
/// pipeline.wait().await?;
/// ```
pub struct Pipeline {
    tasks: TaskGroup,
    store: Arc<dyn AtomicCounterStore>,
    broker: BrokerClient,
    topic: String,
    shop_addr: SocketAddr,
    factory_addr: SocketAddr,
    actors: Vec<JoinHandle<()>>,
}

async fn bind(addr: &str) -> Result<(TcpListener, SocketAddr), PipelineError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| PipelineError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    let local = listener.local_addr().map_err(PipelineError::Serve)?;
    Ok((listener, local))
}

async fn serve(listener: TcpListener, app: Router, token: CancellationToken) -> Result<(), PipelineError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(PipelineError::Serve)
}

async fn connect_store(
    config: &Config,
    actors: &mut Vec<JoinHandle<()>>,
) -> Result<Arc<dyn AtomicCounterStore>, PipelineError> {
    match config.store.backend {
        StoreBackend::Memory => {
            let (actor, store) = memory::new(config.store.buffer_size);
            actors.push(tokio::spawn(actor.run(())));
            Ok(Arc::new(store))
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            let store = crate::store::RedisCounterStore::connect(&config.store.redis_url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(crate::config::ConfigError::Invalid(
            "store.backend = \"redis\" needs the `redis` feature".to_string(),
        )
        .into()),
    }
}

impl Pipeline {
    /// Builds every component and starts the tasks.
    ///
    /// `seed` makes production and buying reproducible. Fails without starting
    /// anything if the config is invalid, a listener cannot bind, or the shop's
    /// first snapshot cannot be read.
    pub async fn start(config: &Config, seed: Option<u64>) -> Result<Self, PipelineError> {
        config.validate()?;
        let catalog = config.catalog()?;
        let (factory_rng, buyer_rng) = match seed {
            Some(seed) => (StdRng::seed_from_u64(seed), StdRng::seed_from_u64(seed.wrapping_add(1))),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };

        let mut actors = Vec::new();
        let store = connect_store(config, &mut actors).await?;

        let (broker_actor, broker) = broker::new(config.channel.buffer_size);
        actors.push(tokio::spawn(broker_actor.run(BrokerSettings {
            partitions: config.channel.partitions,
        })));

        let shop = Arc::new(Shop::new(store.clone(), catalog.clone()));
        if let Err(e) = shop.refresh_snapshot().await {
            error!(error = %e, "Failed to update inventory");
            return Err(e.into());
        }

        let (factory_listener, factory_addr) = bind(&config.factory.listen).await?;
        let (shop_listener, shop_addr) = bind(&config.shop.listen).await?;

        let mut tasks = TaskGroup::new(CancellationToken::new());
        let token = tasks.token();

        let shipper = Arc::new(ChannelShipper::new(Arc::new(broker.clone()), config.channel.topic.clone()));
        let product_factory = Arc::new(ProductFactory::new(
            catalog,
            config.factory.max_production,
            shipper,
            factory_rng,
        )
        .with_max_order(config.factory.max_order_quantity));
        tasks.spawn("factory-production", {
            let product_factory = product_factory.clone();
            let period = config.factory.shipping_interval();
            let token = token.clone();
            async move {
                run_periodic("factory-production", period, token, || {
                    let product_factory = product_factory.clone();
                    async move { product_factory.produce().await.map(|_| ()) }
                })
                .await
                .map_err(PipelineError::from)
            }
        });
        tasks.spawn(
            "factory-server",
            serve(factory_listener, factory_router(product_factory), token.clone()),
        );
        info!(addr = %factory_addr, "Factory listening");

        let storage = Arc::new(CounterWarehouseStorage::new(store.clone()));
        for i in 0..config.warehouse.members {
            let group = MemoryConsumerGroup::new(
                broker.clone(),
                config.channel.topic.clone(),
                config.warehouse.consumer_group.clone(),
                format!("{}-{i}", config.warehouse.consumer_group),
            )
            .with_fetch_max(config.channel.fetch_max);
            let warehouse = Warehouse::new(Arc::new(group), storage.clone());
            let token = token.clone();
            tasks.spawn("warehouse", async move {
                warehouse.run(token).await.map_err(PipelineError::from)
            });
        }

        tasks.spawn("shop-refresh", {
            let shop = shop.clone();
            let period = config.shop.inventory_update_interval();
            let token = token.clone();
            async move {
                run_periodic("shop-refresh", period, token, || {
                    let shop = shop.clone();
                    async move { shop.refresh_snapshot().await }
                })
                .await
                .map_err(PipelineError::from)
            }
        });
        tasks.spawn("shop-server", serve(shop_listener, shop_router(shop), token.clone()));
        info!(addr = %shop_addr, "Shop listening");

        if config.buyer.enabled {
            let url = config
                .buyer
                .shop_url
                .clone()
                .unwrap_or_else(|| format!("http://{shop_addr}"));
            let buyer = Arc::new(RandomBuyer::new(Arc::new(HttpShopClient::new(url)), buyer_rng));
            let period = config.buyer.buying_interval();
            let token = token.clone();
            tasks.spawn("buyer", async move {
                run_periodic("buyer", period, token, || {
                    let buyer = buyer.clone();
                    async move { buyer.buy().await.map(|_| ()) }
                })
                .await
                .map_err(PipelineError::from)
            });
        }

        Ok(Self {
            tasks,
            store,
            broker,
            topic: config.channel.topic.clone(),
            shop_addr,
            factory_addr,
            actors,
        })
    }

    /// Cancelling this token stops the pipeline.
    pub fn cancellation(&self) -> CancellationToken {
        self.tasks.token()
    }

    pub fn shop_addr(&self) -> SocketAddr {
        self.shop_addr
    }

    pub fn factory_addr(&self) -> SocketAddr {
        self.factory_addr
    }

    /// Current counter value for `key`, read straight from the store.
    pub async fn stock(&self, key: &SkuKey) -> Result<i64, PipelineError> {
        Ok(self.store.get(key).await?)
    }

    /// Committed offset of the warehouse group on `partition`.
    pub async fn committed(&self, group: &str, partition: u32) -> Result<u64, PipelineError> {
        Ok(self.broker.committed(&self.topic, group, partition).await?)
    }

    /// Waits for every task, then stops the actors.
    ///
    /// Returns the first task error, if any.
    pub async fn wait(self) -> Result<(), PipelineError> {
        let Self {
            tasks,
            store,
            broker,
            actors,
            ..
        } = self;
        let result = tasks.wait().await;

        info!("Shutting down actors...");
        drop(store);
        drop(broker);
        for handle in actors {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(PipelineError::TaskPanicked(e.to_string()));
            }
        }
        info!("Pipeline stopped");
        result
    }

    /// Cancels every task and waits for them.
    pub async fn shutdown(self) -> Result<(), PipelineError> {
        self.cancellation().cancel();
        self.wait().await
    }
}
