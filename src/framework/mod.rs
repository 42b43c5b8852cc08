//! Generic keyed-actor framework.
//!
//! The in-memory backends of this crate (the atomic counter store and the
//! partitioned message broker) are both a [`ResourceActor`] over a different
//! [`ActorEntity`]. The actor processes one request at a time, so every action on
//! an entity is atomic with respect to every other action on it.
//!
//! # Main Components
//!
//! - [`ActorEntity`] - trait a keyed resource implements
//! - [`ResourceActor`] - the actor that owns the entities
//! - [`ResourceClient`] - cloneable, type-safe handle to the actor
//! - [`ActorClient`] - base trait for domain clients wrapping a `ResourceClient`
//! - [`FrameworkError`] - plumbing errors
//!
//! # Testing
//!
//! See [`mock`] for utilities to test clients without spawning actors.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};

#[cfg(test)]
mod tests {
    use super::mock::MockClient;
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Tally {
        name: String,
        total: u32,
    }

    #[derive(Debug)]
    enum TallyAction {
        Add(u32),
        Fail,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("tally refused")]
    struct TallyError;

    #[async_trait]
    impl ActorEntity for Tally {
        type Id = String;
        type Action = TallyAction;
        type ActionResult = u32;
        type Context = u32;
        type Error = TallyError;

        fn vacant(id: &String, start: &u32) -> Self {
            Self {
                name: id.clone(),
                total: *start,
            }
        }

        async fn handle_action(&mut self, action: TallyAction, _: &u32) -> Result<u32, TallyError> {
            match action {
                TallyAction::Add(n) => {
                    self.total += n;
                    Ok(self.total)
                }
                TallyAction::Fail => Err(TallyError),
            }
        }
    }

    #[tokio::test]
    async fn test_vacant_entity_is_built_from_context() {
        let (actor, client) = ResourceActor::<Tally>::new(8);
        let handle = tokio::spawn(actor.run(10));

        assert!(client.get("a".into()).await.unwrap().is_none());
        assert_eq!(client.perform_action("a".into(), TallyAction::Add(5)).await.unwrap(), 15);

        let tally = client.get("a".into()).await.unwrap().unwrap();
        assert_eq!(tally, Tally { name: "a".into(), total: 15 });

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_actions_are_serialized() {
        let (actor, client) = ResourceActor::<Tally>::new(8);
        let handle = tokio::spawn(actor.run(0));

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                client.perform_action("k".into(), TallyAction::Add(2)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(client.get("k".into()).await.unwrap().unwrap().total, 100);

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_entity_error_is_wrapped() {
        let (actor, client) = ResourceActor::<Tally>::new(8);
        tokio::spawn(actor.run(0));

        let err = client.perform_action("k".into(), TallyAction::Fail).await.unwrap_err();
        assert!(matches!(err, FrameworkError::EntityError(_)));
        assert!(err.to_string().contains("tally refused"));
    }

    #[tokio::test]
    async fn test_closed_actor_reports_actor_closed() {
        let (actor, client) = ResourceActor::<Tally>::new(8);
        drop(actor);

        let err = client.get("k".into()).await.unwrap_err();
        assert!(matches!(err, FrameworkError::ActorClosed));
    }

    #[tokio::test]
    async fn test_mock_client_replays_expectations() {
        let mut mock = MockClient::<Tally>::new();
        mock.expect_action().return_ok(7);
        mock.expect_get().return_ok(None);

        let client = mock.client();
        assert_eq!(client.perform_action("x".into(), TallyAction::Add(1)).await.unwrap(), 7);
        assert!(client.get("x".into()).await.unwrap().is_none());

        mock.verify();
    }
}
