//! # ActorEntity Trait
//!
//! The `ActorEntity` trait is the contract every keyed resource (a stock counter, a
//! topic log) implements to be managed by the generic [`ResourceActor`](crate::framework::ResourceActor).
//!
//! Entities are addressed by id and materialised lazily: the first action that
//! touches an id builds the entity through [`ActorEntity::vacant`]. This is what
//! gives counters their "never written reads as zero" behaviour and lets topics
//! be auto-created on first publish.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any keyed resource must implement to be managed by `ResourceActor`.
///
/// # Async & Context
/// Hooks are `#[async_trait]` so an entity may await other actors. The `Context`
/// type is injected at `run()` time rather than at construction ("late binding"),
/// which is how the broker hands its partition settings to every topic it creates.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The key this entity is stored under (e.g. a `SkuKey` or a topic name).
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// Enum of resource-specific operations (e.g. `IncrementBy`).
    type Action: Send + Sync + Debug;

    /// Result type returned by actions; variants usually mirror `Action` 1:1.
    type ActionResult: Send + Sync + Debug;

    /// Runtime dependencies injected into the actor. Use `()` if none.
    type Context: Send + Sync;

    /// The per-actor error type.
    ///
    /// One enum for the whole actor rather than one per action. `CounterAction::Read`
    /// can never overflow, but it still shares `StoreError` with `IncrementBy`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds the entity for an id that has never been touched.
    fn vacant(id: &Self::Id, ctx: &Self::Context) -> Self;

    /// Handle a resource-specific action. Runs with exclusive access to `self`.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
