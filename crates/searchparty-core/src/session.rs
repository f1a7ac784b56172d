//! Party view lifetime
//!
//! A [`PartySession`] owns the three periodic tasks that run while a
//! participant has a party open: the sampler, the presence poller and the
//! heatmap poller. Stopping the session tears all three down; none of them
//! outlives it.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::clock::Clock;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::heatmap::{HeatmapAggregator, HeatmapPoint};
use crate::identity::IdentityProvider;
use crate::model::{ParticipantId, PartyId};
use crate::polling::{HeatmapPoller, PollerHandle, PresencePoller};
use crate::presence::{PresenceMerger, PresenceView};
use crate::sampler::{Sampler, SamplerEvent, SamplerHandle, SamplerState};
use crate::source::PositionSource;
use crate::store::LocationStore;

const EVENT_BUFFER: usize = 16;

/// Running tasks for one open party view
pub struct PartySession {
    party: PartyId,
    participant: ParticipantId,
    sampler: SamplerHandle,
    presence: PollerHandle<PresenceView>,
    heatmap: PollerHandle<Vec<HeatmapPoint>>,
    events: Option<mpsc::Receiver<SamplerEvent>>,
}

impl PartySession {
    /// Resolve the participant, prompt for location access and start sampling
    /// and polling.
    ///
    /// Fails with `NotAuthenticated` when the identity provider has no
    /// participant, or with a config error if `config` does not validate.
    pub async fn start(
        party: PartyId,
        identity: &dyn IdentityProvider,
        source: Arc<dyn PositionSource>,
        store: Arc<dyn LocationStore>,
        clock: Arc<dyn Clock>,
        config: &SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let participant = identity.require_participant()?;

        if !source.request_permission().await {
            // Sampling still starts; it retries every tick until access is granted
            tracing::warn!(party = %party, participant = %participant, "location permission not granted");
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let sampler = Sampler::from_config(
            party.clone(),
            participant.clone(),
            source,
            Arc::clone(&store),
            &config.sampling,
        )
        .with_clock(Arc::clone(&clock))
        .with_events(event_tx)
        .spawn();

        let presence = PresencePoller::new(
            PresenceMerger::new(Arc::clone(&store)),
            party.clone(),
            participant.clone(),
            config.presence.poll_interval(),
        )
        .spawn();

        let heatmap = HeatmapPoller::new(
            Arc::new(HeatmapAggregator::from_config(store, &config.heatmap)),
            party.clone(),
            participant.clone(),
            config.heatmap.window(),
            config.heatmap.poll_interval(),
        )
        .with_clock(clock)
        .spawn();

        tracing::info!(party = %party, participant = %participant, "party session started");

        Ok(Self {
            party,
            participant,
            sampler,
            presence,
            heatmap,
            events: Some(event_rx),
        })
    }

    pub fn party(&self) -> &PartyId {
        &self.party
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn sampler_state(&self) -> watch::Receiver<SamplerState> {
        self.sampler.state()
    }

    pub fn presence(&self) -> watch::Receiver<Option<PresenceView>> {
        self.presence.subscribe()
    }

    pub fn heatmap(&self) -> watch::Receiver<Option<Vec<HeatmapPoint>>> {
        self.heatmap.subscribe()
    }

    /// Sampler notifications; can be taken once
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SamplerEvent>> {
        self.events.take()
    }

    /// Tear down sampling and both pollers, waiting for each to exit
    pub async fn stop(self) {
        let Self {
            party,
            participant,
            sampler,
            presence,
            heatmap,
            ..
        } = self;

        tokio::join!(sampler.stop(), presence.stop(), heatmap.stop());
        tracing::info!(party = %party, participant = %participant, "party session stopped");
    }
}
