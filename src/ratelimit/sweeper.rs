//! Background removal of expired rate limit entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::limiter::RateLimiter;

/// Handle to a running sweep task.
///
/// Call [`shutdown`](Self::shutdown) to stop it cleanly; dropping the handle
/// aborts the task.
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Spawn a task that sweeps `limiter` every `period`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(limiter: Arc<RateLimiter>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(period_secs = period.as_secs(), "Rate limit sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        debug!(removed, tracked = limiter.len(), "Sweep finished");
                    }
                    _ = &mut stop_rx => break,
                }
            }
            info!("Rate limit sweeper stopped");
        });

        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop the sweep task and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Rate limit sweeper ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
