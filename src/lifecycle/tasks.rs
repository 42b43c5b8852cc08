//! A set of long-lived tasks sharing one cancellation token.

use crate::error::PipelineError;
use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs tasks until they all finish. The first task to fail cancels the shared
/// token, and [`TaskGroup::wait`] reports that first error once every task has
/// returned.
pub struct TaskGroup {
    token: CancellationToken,
    tasks: JoinSet<(&'static str, Result<(), PipelineError>)>,
}

impl TaskGroup {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            tasks: JoinSet::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        info!(task = name, "Starting task");
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Waits for every task. Returns the first error, if any.
    pub async fn wait(mut self) -> Result<(), PipelineError> {
        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next().await {
            let (name, result) = match joined {
                Ok(finished) => finished,
                Err(e) => ("unknown", Err(PipelineError::TaskPanicked(e.to_string()))),
            };
            match result {
                Ok(()) => info!(task = name, "Task finished"),
                Err(e) => {
                    error!(task = name, error = %e, "Task failed");
                    self.token.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_error_cancels_the_rest() {
        let token = CancellationToken::new();
        let mut group = TaskGroup::new(token.clone());

        for _ in 0..3 {
            let token = token.clone();
            group.spawn("waiter", async move {
                token.cancelled().await;
                Ok(())
            });
        }
        group.spawn("failing", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(PipelineError::from(ChannelError::GroupClosed))
        });
        group.spawn("late", async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(PipelineError::from(ChannelError::Unavailable("late".into())))
        });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, PipelineError::Channel(ChannelError::GroupClosed)));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_clean_exit_does_not_cancel() {
        let token = CancellationToken::new();
        let mut group = TaskGroup::new(token.clone());
        group.spawn("done", async { Ok(()) });

        group.wait().await.unwrap();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let mut group = TaskGroup::new(CancellationToken::new());
        group.spawn("panicking", async {
            let fail = true;
            if fail {
                panic!("boom");
            }
            Ok(())
        });

        assert!(matches!(group.wait().await, Err(PipelineError::TaskPanicked(_))));
    }
}
