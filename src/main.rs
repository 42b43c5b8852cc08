use clap::Parser;
use inventory_pipeline::config::{Config, StoreBackend};
use inventory_pipeline::lifecycle::{setup_tracing, Pipeline};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "inventory-pipeline")]
#[command(about = "Factory, warehouse, shop and buyer running over one counter store", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "pipeline.toml")]
    config: PathBuf,

    /// Seed for production and buying, for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Counter store backend, overriding the config file
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();
    let args = Args::parse();

    let mut config = Config::from_path(&args.config)?;
    if let Some(backend) = args.store {
        config.store.backend = backend;
    }

    let pipeline = Pipeline::start(&config, args.seed).await?;
    info!(shop = %pipeline.shop_addr(), factory = %pipeline.factory_addr(), "Pipeline started");

    let token = pipeline.cancellation();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("ctrl-c received, shutting down");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for ctrl-c"),
        }
    });

    pipeline.wait().await?;
    Ok(())
}
