//! Heatmap aggregation over live positions and windowed history

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::curve::{DecayCurve, LinearDecay};
use crate::config::HeatmapConfig;
use crate::error::{Result, SearchError};
use crate::model::{ParticipantId, PartyId, Position, Timestamp, MAX_CLOCK_SKEW_MS};
use crate::store::LocationStore;

/// Intensity of live (self / other-live) points, which never decay
pub const DEFAULT_LIVE_INTENSITY: f64 = 1.0;

/// What a heatmap point represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointCategory {
    /// The caller's own current position
    #[serde(rename = "self")]
    Own,
    /// Another participant's current position
    #[serde(rename = "other-live")]
    OtherLive,
    /// A past sample inside the decay window
    #[serde(rename = "history")]
    History,
}

impl std::fmt::Display for PointCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointCategory::Own => write!(f, "self"),
            PointCategory::OtherLive => write!(f, "other-live"),
            PointCategory::History => write!(f, "history"),
        }
    }
}

/// A renderable, transient heatmap point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Visual weight in [0, 1]
    pub intensity: f64,
    pub category: PointCategory,
    pub participant: ParticipantId,
    pub timestamp: Timestamp,
}

impl HeatmapPoint {
    fn new(
        position: Position,
        intensity: f64,
        category: PointCategory,
        participant: ParticipantId,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            intensity,
            category,
            participant,
            timestamp,
        }
    }
}

/// Reads live positions and windowed history and turns them into points.
///
/// Stateless and side-effect free; the caller drives the polling cadence.
pub struct HeatmapAggregator {
    store: Arc<dyn LocationStore>,
    curve: Arc<dyn DecayCurve>,
    live_intensity: f64,
    history_limit: Option<usize>,
    clock_skew_ms: i64,
}

impl HeatmapAggregator {
    /// Aggregator with the default linear curve and no history ceiling
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        Self {
            store,
            curve: Arc::new(LinearDecay::default()),
            live_intensity: DEFAULT_LIVE_INTENSITY,
            history_limit: None,
            clock_skew_ms: MAX_CLOCK_SKEW_MS,
        }
    }

    pub fn from_config(store: Arc<dyn LocationStore>, config: &HeatmapConfig) -> Self {
        Self {
            store,
            curve: config.curve(),
            live_intensity: config.live_intensity,
            history_limit: Some(config.history_limit),
            clock_skew_ms: MAX_CLOCK_SKEW_MS,
        }
    }

    pub fn with_curve(mut self, curve: impl DecayCurve + 'static) -> Self {
        self.curve = Arc::new(curve);
        self
    }

    pub fn with_live_intensity(mut self, intensity: f64) -> Self {
        self.live_intensity = intensity.clamp(0.0, 1.0);
        self
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// How far ahead of `now` a history sample may be and still count as fresh
    pub fn with_clock_skew(mut self, skew_ms: i64) -> Self {
        self.clock_skew_ms = skew_ms.max(0);
        self
    }

    /// Build the overlay for `party` as seen by `self_id` at `now`.
    ///
    /// Output order is fixed: the caller's own point, other live points by
    /// participant id, then history newest first (ties by participant id).
    /// An unknown or empty party yields an empty list.
    pub async fn aggregate(
        &self,
        party: &PartyId,
        self_id: &ParticipantId,
        window: Duration,
        now: Timestamp,
    ) -> Result<Vec<HeatmapPoint>> {
        let window_ms = window.num_milliseconds();
        if window_ms <= 0 {
            return Err(SearchError::InvalidWindow(window_ms));
        }
        let since = now.saturating_sub(window);

        let (live, history) = tokio::join!(
            self.store.list_current(party),
            self.store.query_history(party, since, self.history_limit)
        );
        let mut live = live?;
        let mut history = history?;

        live.sort_by(|a, b| a.participant.cmp(&b.participant));
        history.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.participant.cmp(&b.participant))
        });

        let mut points = Vec::with_capacity(live.len() + history.len());

        if let Some(own) = live.iter().find(|c| &c.participant == self_id) {
            points.push(HeatmapPoint::new(
                own.position,
                self.live_intensity,
                PointCategory::Own,
                own.participant.clone(),
                own.timestamp,
            ));
        }

        points.extend(
            live.iter()
                .filter(|c| &c.participant != self_id)
                .map(|c| {
                    HeatmapPoint::new(
                        c.position,
                        self.live_intensity,
                        PointCategory::OtherLive,
                        c.participant.clone(),
                        c.timestamp,
                    )
                }),
        );

        let before_history = points.len();
        let mut future_dated = 0usize;
        points.extend(history.into_iter().filter_map(|sample| {
            if sample.timestamp.is_ahead_of(now, self.clock_skew_ms) {
                future_dated += 1;
                return None;
            }
            // age-out is enforced here even if the store returned the sample
            let age_ms = sample.timestamp.age_at(now);
            self.curve.intensity(age_ms, window_ms).map(|intensity| {
                HeatmapPoint::new(
                    sample.position,
                    intensity,
                    PointCategory::History,
                    sample.participant,
                    sample.timestamp,
                )
            })
        }));

        if future_dated > 0 {
            tracing::warn!(
                party = %party,
                skipped = future_dated,
                "history samples dated beyond clock-skew tolerance"
            );
        }

        tracing::debug!(
            party = %party,
            live = before_history,
            history = points.len() - before_history,
            window_ms,
            "heatmap aggregated"
        );

        Ok(points)
    }
}
