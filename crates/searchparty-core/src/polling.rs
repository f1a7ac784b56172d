//! Periodic presence and heatmap refresh
//!
//! Each poller runs on its own cadence and publishes the latest result over a
//! watch channel. A failed refresh is logged and the previous view stays
//! published.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::heatmap::{HeatmapAggregator, HeatmapPoint};
use crate::model::{ParticipantId, PartyId};
use crate::presence::{PresenceMerger, PresenceView};
use crate::task::{spawn_periodic, CancelToken, TaskHandle};

/// Owner of a running poller and its published view
pub struct PollerHandle<T> {
    task: TaskHandle,
    view: watch::Receiver<Option<T>>,
}

impl<T: Clone> PollerHandle<T> {
    /// Receiver that observes every refresh
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.view.clone()
    }

    /// Most recent successful result, `None` before the first one
    pub fn latest(&self) -> Option<T> {
        self.view.borrow().clone()
    }

    pub async fn stop(self) {
        self.task.stop().await;
    }
}

fn spawn_poller<T, F, Fut>(name: &'static str, period: Duration, fetch: F) -> PollerHandle<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let (tx, view) = watch::channel(None);
    let tx = Arc::new(tx);
    let fetch = Arc::new(fetch);

    let task = spawn_periodic(name, period, CancelToken::new(), move |token| {
        let tx = Arc::clone(&tx);
        let fetch = Arc::clone(&fetch);
        async move {
            match fetch().await {
                Ok(value) if !token.is_cancelled() => {
                    tx.send_replace(Some(value));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(poller = name, error = %e, "refresh failed, keeping previous view");
                }
            }
        }
    });

    PollerHandle { task, view }
}

/// Refreshes a [`PresenceView`] for one participant
pub struct PresencePoller {
    merger: PresenceMerger,
    party: PartyId,
    self_id: ParticipantId,
    period: Duration,
}

impl PresencePoller {
    pub fn new(
        merger: PresenceMerger,
        party: PartyId,
        self_id: ParticipantId,
        period: Duration,
    ) -> Self {
        Self {
            merger,
            party,
            self_id,
            period,
        }
    }

    pub fn spawn(self) -> PollerHandle<PresenceView> {
        let Self {
            merger,
            party,
            self_id,
            period,
        } = self;

        spawn_poller("presence", period, move || {
            let merger = merger.clone();
            let party = party.clone();
            let self_id = self_id.clone();
            async move { merger.merge(&party, &self_id).await }
        })
    }
}

/// Refreshes the heatmap overlay for one participant
pub struct HeatmapPoller {
    aggregator: Arc<HeatmapAggregator>,
    party: PartyId,
    self_id: ParticipantId,
    window: chrono::Duration,
    period: Duration,
    clock: Arc<dyn Clock>,
}

impl HeatmapPoller {
    pub fn new(
        aggregator: Arc<HeatmapAggregator>,
        party: PartyId,
        self_id: ParticipantId,
        window: chrono::Duration,
        period: Duration,
    ) -> Self {
        Self {
            aggregator,
            party,
            self_id,
            window,
            period,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn spawn(self) -> PollerHandle<Vec<HeatmapPoint>> {
        let Self {
            aggregator,
            party,
            self_id,
            window,
            period,
            clock,
        } = self;

        spawn_poller("heatmap", period, move || {
            let aggregator = Arc::clone(&aggregator);
            let party = party.clone();
            let self_id = self_id.clone();
            let now = clock.now();
            async move { aggregator.aggregate(&party, &self_id, window, now).await }
        })
    }
}
