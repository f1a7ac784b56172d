//! Cancellable periodic tasks
//!
//! Every recurring activity (sampling, presence polling, heatmap polling) runs
//! as its own task owned by a [`TaskHandle`]. Stopping the handle cancels the
//! pending tick and any in-flight cycle, then joins the task; no cycle starts
//! after cancellation has been requested.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shared cancellation flag
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of a spawned periodic task
///
/// Dropping the handle cancels and aborts the task; [`TaskHandle::stop`] does
/// the same but also waits for it to wind down.
pub struct TaskHandle {
    name: &'static str,
    token: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Cancel the task and wait until it has exited
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                if e.is_panic() {
                    tracing::error!(task = self.name, "periodic task panicked");
                }
            }
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

/// Run `cycle` once per `period` until `token` is cancelled.
///
/// The first cycle runs immediately. Ticks missed while a cycle is running are
/// delayed rather than bunched up. Cancellation drops an in-flight cycle at its
/// next suspension point.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancelToken,
    mut cycle: F,
) -> TaskHandle
where
    F: FnMut(CancelToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let task_token = token.clone();
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(
            task = name,
            period_ms = period.as_millis() as u64,
            "periodic task started"
        );

        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if task_token.is_cancelled() {
                break;
            }

            tokio::select! {
                biased;
                _ = task_token.cancelled() => break,
                _ = cycle(task_token.clone()) => {}
            }
        }

        tracing::debug!(task = name, "periodic task stopped");
    });

    TaskHandle {
        name,
        token,
        join: Some(join),
    }
}
