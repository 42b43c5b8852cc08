//! # ActorClient Trait
//!
//! Common interface for domain clients that wrap a generic `ResourceClient`.

use crate::framework::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for domain clients built on a `ResourceClient`.
///
/// Implementors supply the inner client and an error mapping; `fetch` and
/// `act` are then provided with the domain error type.
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The domain-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the domain error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch an entity by id without materialising it.
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Run an action against an entity.
    async fn act(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, Self::Error> {
        self.inner()
            .perform_action(id, action)
            .await
            .map_err(Self::map_error)
    }
}
