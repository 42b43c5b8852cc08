//! # Tracing
//!
//! Structured logs through `tracing`, printed in the compact format without
//! module paths. `RUST_LOG` picks the level:
//!
//! ```bash
//! # Stage-level events: batches shipped, messages claimed, inventory updates
//! RUST_LOG=info inventory-pipeline
//!
//! # Every actor request, fetch and commit
//! RUST_LOG=debug inventory-pipeline
//!
//! # Only the shop
//! RUST_LOG=inventory_pipeline::shop=debug inventory-pipeline
//! ```
//!
//! With `RUST_LOG=info` one unit travelling the pipeline looks like:
//!
//! ```text
//! INFO produce: Produced products count=1
//! INFO produce: Shipped products count=1 topic=products
//! INFO Message claimed partition=2 offset=0 topic=products
//! INFO refresh_snapshot: Inventory updated count=25
//! INFO buy_product: Product bought product=Product { name: "shoes", color: "red", quantity: 1 } remaining=0
//! ```
//!
//! The actors log their type instead of a module path (`entity_type=Counter`,
//! `entity_type=Topic`).

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
