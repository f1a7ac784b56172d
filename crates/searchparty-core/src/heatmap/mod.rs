//! Decay-weighted heatmap overlays
//!
//! Converts a trailing window of position history into map points whose
//! intensity fades with age, plus undecayed points for every participant's
//! live position.

mod aggregator;
mod curve;

pub use aggregator::{HeatmapAggregator, HeatmapPoint, PointCategory, DEFAULT_LIVE_INTENSITY};
pub use curve::{
    decay, DecayCurve, ExponentialDecay, LinearDecay, DEFAULT_MAX_INTENSITY,
    DEFAULT_MIN_INTENSITY,
};
