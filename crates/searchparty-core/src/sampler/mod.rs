//! Periodic sampling of the local participant's position
//!
//! A [`Sampler`] is the only writer for its participant's records. On each tick
//! it reads the device position and, when that succeeds, persists a history
//! sample and a current-position overwrite under one capture timestamp.
//!
//! Failures never end the loop: denied permission and failed reads skip the
//! cycle, failed writes are logged and the next tick proceeds independently.
//!
//! Teardown drops an in-flight write at its next suspension point. If that
//! lands between the history append and the current-position overwrite, the
//! history sample stays and the current position keeps its previous value
//! until the next session samples again.

mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

pub use state::SamplerState;

use crate::clock::{Clock, SystemClock};
use crate::config::{SamplingConfig, MIN_SAMPLE_INTERVAL_MS};
use crate::error::AcquireError;
use crate::model::{ParticipantId, PartyId, Timestamp};
use crate::source::PositionSource;
use crate::store::{record_sample, LocationStore};
use crate::task::{spawn_periodic, CancelToken, TaskHandle};

/// Notifications for the hosting UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerEvent {
    /// Location access is missing; sent once per run of consecutive denials
    PermissionDenied,
    /// A sample was persisted
    Sampled { timestamp: Timestamp },
}

/// Result of a single sampling cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Written(Timestamp),
    PermissionDenied,
    AcquisitionFailed,
    WriteFailed,
    /// Teardown was requested before the write step; nothing was written
    Cancelled,
}

/// Sampling loop for one participant in one party
pub struct Sampler {
    party: PartyId,
    participant: ParticipantId,
    source: Arc<dyn PositionSource>,
    store: Arc<dyn LocationStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    last_timestamp: Option<Timestamp>,
    denial_reported: bool,
    state: Arc<watch::Sender<SamplerState>>,
    events: Option<mpsc::Sender<SamplerEvent>>,
}

impl Sampler {
    pub fn new(
        party: PartyId,
        participant: ParticipantId,
        source: Arc<dyn PositionSource>,
        store: Arc<dyn LocationStore>,
    ) -> Self {
        let (state, _rx) = watch::channel(SamplerState::Idle);
        Self {
            party,
            participant,
            source,
            store,
            clock: Arc::new(SystemClock),
            interval: SamplingConfig::default().interval(),
            last_timestamp: None,
            denial_reported: false,
            state: Arc::new(state),
            events: None,
        }
    }

    pub fn from_config(
        party: PartyId,
        participant: ParticipantId,
        source: Arc<dyn PositionSource>,
        store: Arc<dyn LocationStore>,
        config: &SamplingConfig,
    ) -> Self {
        Self::new(party, participant, source, store).with_interval(config.interval())
    }

    /// Set the sampling interval, raised to the one-second floor if shorter
    pub fn with_interval(mut self, interval: Duration) -> Self {
        let floor = Duration::from_millis(MIN_SAMPLE_INTERVAL_MS);
        if interval < floor {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "sampling interval below minimum, using {}ms",
                MIN_SAMPLE_INTERVAL_MS
            );
        }
        self.interval = interval.max(floor);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Route [`SamplerEvent`]s to `sink`; events are dropped if it is full
    pub fn with_events(mut self, sink: mpsc::Sender<SamplerEvent>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SamplerState {
        *self.state.borrow()
    }

    /// Run one acquire-then-write cycle
    pub async fn sample_once(&mut self, token: &CancelToken) -> SampleOutcome {
        if token.is_cancelled() {
            return SampleOutcome::Cancelled;
        }

        self.transition(SamplerState::Acquiring);
        let acquired = self.source.acquire().await;

        if token.is_cancelled() {
            return SampleOutcome::Cancelled;
        }

        let position = match acquired {
            Ok(position) => position,
            Err(AcquireError::PermissionDenied) => {
                self.transition(SamplerState::Idle);
                if self.denial_reported {
                    tracing::debug!(participant = %self.participant, "location permission still denied");
                } else {
                    tracing::warn!(
                        party = %self.party,
                        participant = %self.participant,
                        "location permission denied, will retry next tick"
                    );
                    self.denial_reported = true;
                    self.emit(SamplerEvent::PermissionDenied);
                }
                return SampleOutcome::PermissionDenied;
            }
            Err(AcquireError::AcquisitionFailed(reason)) => {
                self.transition(SamplerState::Idle);
                tracing::warn!(
                    participant = %self.participant,
                    reason = %reason,
                    "position acquisition failed, skipping cycle"
                );
                return SampleOutcome::AcquisitionFailed;
            }
        };

        self.denial_reported = false;
        let timestamp = self.next_timestamp();
        self.transition(SamplerState::Writing);

        let written = record_sample(
            self.store.as_ref(),
            &self.party,
            &self.participant,
            position,
            timestamp,
        )
        .await;
        // Consumed even on failure so a retry never reuses the key
        self.last_timestamp = Some(timestamp);
        self.transition(SamplerState::Idle);

        match written {
            Ok(()) => {
                tracing::debug!(
                    party = %self.party,
                    participant = %self.participant,
                    timestamp = timestamp.as_millis(),
                    "sample written"
                );
                self.emit(SamplerEvent::Sampled { timestamp });
                SampleOutcome::Written(timestamp)
            }
            Err(e) => {
                tracing::error!(
                    party = %self.party,
                    participant = %self.participant,
                    error = %e,
                    "failed to write sample"
                );
                SampleOutcome::WriteFailed
            }
        }
    }

    /// Start the periodic loop; the first sample is taken immediately
    pub fn spawn(self) -> SamplerHandle {
        let interval = self.interval;
        let state = Arc::clone(&self.state);
        let sampler = Arc::new(tokio::sync::Mutex::new(self));

        let task = spawn_periodic("sampler", interval, CancelToken::new(), move |token| {
            let sampler = Arc::clone(&sampler);
            async move {
                let mut sampler = sampler.lock().await;
                sampler.sample_once(&token).await;
            }
        });

        SamplerHandle {
            task: Some(task),
            state,
        }
    }

    /// Capture time for the next sample, strictly after the previous one
    fn next_timestamp(&self) -> Timestamp {
        let now = self.clock.now();
        match self.last_timestamp {
            Some(last) if now <= last => last.saturating_add_millis(1),
            _ => now,
        }
    }

    fn transition(&self, next: SamplerState) {
        self.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                *current = next;
                true
            } else {
                false
            }
        });
    }

    fn emit(&self, event: SamplerEvent) {
        if let Some(sink) = &self.events {
            if sink.try_send(event).is_err() {
                tracing::debug!(?event, "sampler event dropped");
            }
        }
    }
}

/// Owner of a running [`Sampler`]
pub struct SamplerHandle {
    task: Option<TaskHandle>,
    state: Arc<watch::Sender<SamplerState>>,
}

impl SamplerHandle {
    /// Observe state changes
    pub fn state(&self) -> watch::Receiver<SamplerState> {
        self.state.subscribe()
    }

    /// Cancel the pending tick and any in-flight acquisition or write, then
    /// wait for the loop to exit
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.token().cancel();
            self.state.send_replace(SamplerState::Stopped);
            task.stop().await;
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.state.send_replace(SamplerState::Stopped);
    }
}
