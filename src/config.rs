//! Pipeline configuration, read from a TOML file.
//!
//! Every field has a default, so an empty or missing file runs the whole
//! pipeline in-process with the reference catalog:
//!
//! ```toml
//! [store]
//! backend = "memory"          # or "redis" (feature `redis`)
//!
//! [channel]
//! topic = "products"
//! partitions = 3
//!
//! [factory]
//! listen = "127.0.0.1:8081"
//! max_production = 10
//! max_order_quantity = 10000
//! shipping_interval_ms = 1000
//!
//! [shop]
//! listen = "127.0.0.1:8080"
//! inventory_update_interval_ms = 2000
//! ```

use crate::model::Catalog;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub factory: FactoryConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub shop: ShopConfig,
    #[serde(default)]
    pub buyer: BuyerConfig,
}

/// The closed set of SKU names and colors every component agrees on.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_names")]
    pub names: Vec<String>,
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            names: default_names(),
            colors: default_colors(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Only used by the redis backend.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Request queue of the in-memory counter actor.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    /// Request queue of the broker actor.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Messages pulled per fetch, and buffered per claim.
    #[serde(default = "default_fetch_max")]
    pub fetch_max: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            partitions: default_partitions(),
            buffer_size: default_buffer_size(),
            fetch_max: default_fetch_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactoryConfig {
    #[serde(default = "default_factory_listen")]
    pub listen: String,
    /// Exclusive upper bound on units per production batch.
    #[serde(default = "default_max_production")]
    pub max_production: u32,
    /// Most units a single `POST /make` order may ask for.
    #[serde(default = "default_max_order_quantity")]
    pub max_order_quantity: u64,
    #[serde(default = "default_shipping_interval_ms")]
    pub shipping_interval_ms: u64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            listen: default_factory_listen(),
            max_production: default_max_production(),
            max_order_quantity: default_max_order_quantity(),
            shipping_interval_ms: default_shipping_interval_ms(),
        }
    }
}

impl FactoryConfig {
    pub fn shipping_interval(&self) -> Duration {
        Duration::from_millis(self.shipping_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Consumer-group members run by this process.
    #[serde(default = "default_members")]
    pub members: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            consumer_group: default_consumer_group(),
            members: default_members(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopConfig {
    #[serde(default = "default_shop_listen")]
    pub listen: String,
    #[serde(default = "default_inventory_update_interval_ms")]
    pub inventory_update_interval_ms: u64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            listen: default_shop_listen(),
            inventory_update_interval_ms: default_inventory_update_interval_ms(),
        }
    }
}

impl ShopConfig {
    pub fn inventory_update_interval(&self) -> Duration {
        Duration::from_millis(self.inventory_update_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuyerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_buying_interval_ms")]
    pub buying_interval_ms: u64,
    /// Shop to buy from; defaults to the shop this process serves.
    #[serde(default)]
    pub shop_url: Option<String>,
}

impl Default for BuyerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buying_interval_ms: default_buying_interval_ms(),
            shop_url: None,
        }
    }
}

impl BuyerConfig {
    pub fn buying_interval(&self) -> Duration {
        Duration::from_millis(self.buying_interval_ms)
    }
}

impl Config {
    /// Loads and validates `path`. A missing file yields the defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.factory.max_production == 0 {
            return invalid("factory.max_production must be positive");
        }
        if self.factory.max_order_quantity == 0 {
            return invalid("factory.max_order_quantity must be positive");
        }
        if self.channel.partitions == 0 {
            return invalid("channel.partitions must be positive");
        }
        if self.channel.fetch_max == 0 || self.channel.buffer_size == 0 || self.store.buffer_size == 0 {
            return invalid("buffer sizes must be positive");
        }
        if self.factory.shipping_interval_ms == 0
            || self.shop.inventory_update_interval_ms == 0
            || self.buyer.buying_interval_ms == 0
        {
            return invalid("intervals must be positive");
        }
        if self.warehouse.members == 0 {
            return invalid("warehouse.members must be positive");
        }
        self.catalog().map(|_| ())
    }

    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        Catalog::new(self.catalog.names.clone(), self.catalog.colors.clone())
            .ok_or_else(|| ConfigError::Invalid("catalog needs at least one name and one color".into()))
    }
}

fn default_names() -> Vec<String> {
    Catalog::reference().names().to_vec()
}

fn default_colors() -> Vec<String> {
    Catalog::reference().colors().to_vec()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_buffer_size() -> usize {
    256
}

fn default_topic() -> String {
    "products".to_string()
}

fn default_partitions() -> u32 {
    3
}

fn default_fetch_max() -> usize {
    64
}

fn default_factory_listen() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_max_production() -> u32 {
    10
}

fn default_max_order_quantity() -> u64 {
    crate::factory::DEFAULT_MAX_ORDER
}

fn default_shipping_interval_ms() -> u64 {
    1000
}

fn default_consumer_group() -> String {
    "warehouse".to_string()
}

fn default_members() -> usize {
    1
}

fn default_shop_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_inventory_update_interval_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_buying_interval_ms() -> u64 {
    1500
}
