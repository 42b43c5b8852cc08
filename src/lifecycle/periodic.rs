//! Ticker-driven tasks.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Calls `tick` every `period` until `token` is cancelled.
///
/// The first call happens one period after start. A failing tick ends the task
/// with that error; a tick in flight when `token` is cancelled is dropped.
pub async fn run_periodic<F, Fut, E>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    mut tick: F,
) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        debug!(task = name, "Tick");

        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = tick() => result,
        };
        if let Err(e) = result {
            error!(task = name, error = %e, "Periodic task failed");
            return Err(e);
        }
    }

    info!(task = name, "Stopped");
    Ok(())
}
