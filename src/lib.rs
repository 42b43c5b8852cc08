#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Inventory Pipeline
//!
//! > **A small supply chain: factory, message channel, warehouse, counter store, shop, buyer.**
//!
//! ```text
//! Factory ──publish──▶ Message Channel ──consume──▶ Warehouse ──increment──▶ Counter Store
//!                                                                              ▲      │
//!                                                           decrement (buy) ───┘      │ get (refresh)
//!                                                                      Shop ◀─────────┘
//!                                                                       ▲
//!                                                                 Buyer ┘
//! ```
//!
//! ## 🏗️ Consistency Model
//!
//! - **Stock is eventually consistent.** A shipped unit is counted only once the
//!   warehouse has consumed it.
//! - **Counters are atomic per key.** Increments from the warehouse and
//!   decrements from the shop never lose updates. There is no cross-key
//!   transaction.
//! - **Snapshots are whole.** The shop swaps its inventory list under a
//!   reader/writer lock, so a listing is always one complete refresh.
//! - **Purchases bypass the snapshot.** They show up in listings at the next
//!   refresh, and nothing stops a counter from going negative.
//! - **Delivery is at least once.** Records are marked consumed after they are
//!   stored, or after storing them failed.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! The generic `ResourceActor<T>`. Both in-memory backends are actors over a
//! different [`ActorEntity`](framework::ActorEntity): [`Counter`](store::counter::Counter)
//! and [`Topic`](channel::Topic).
//!
//! ### 2. The Backends ([`store`], [`channel`])
//! Capability traits the stages depend on ([`AtomicCounterStore`](store::AtomicCounterStore),
//! [`PublishChannel`](channel::PublishChannel), [`ConsumerGroup`](channel::ConsumerGroup)) and
//! their adapters.
//!
//! ### 3. The Stages ([`factory`], [`warehouse`], [`shop`], [`buyer`])
//! The business logic, plus the HTTP surfaces of the factory and the shop.
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! [`Pipeline`](lifecycle::Pipeline) wires everything together under one
//! [`TaskGroup`](lifecycle::TaskGroup): the first task to fail stops the rest.
//!
//! ## 🚀 Running
//!
//! ```bash
//! RUST_LOG=info cargo run -- --config pipeline.toml --seed 42
//! curl localhost:8080/products
//! curl -XPOST localhost:8081/make -d '{"name":"shoes","color":"red","quantity":3}'
//! ```

pub mod buyer;
pub mod channel;
pub mod config;
pub mod error;
pub mod factory;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod shop;
pub mod store;
pub mod warehouse;

pub use error::PipelineError;
