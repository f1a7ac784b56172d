//! Freshness weighting for history samples
//!
//! A decay curve maps a sample's age inside the decay window to an intensity.
//! Samples older than the window get no intensity at all (`None`).
//!
//! The default curve is linear:
//! ```text
//! intensity = max - (age / window) × (max - min)
//! ```
//! evaluated as `max × (1 - t) + min × t` with `t = age / window`, so both
//! boundaries are exact: `age = 0 → max`, `age = window → min`.

use serde::{Deserialize, Serialize};

/// Intensity of a sample at the start of the window
pub const DEFAULT_MAX_INTENSITY: f64 = 0.8;

/// Intensity of a sample exactly at the window boundary
pub const DEFAULT_MIN_INTENSITY: f64 = 0.1;

/// Maps sample age to a visual intensity
pub trait DecayCurve: Send + Sync {
    /// Intensity for a sample `age_ms` old inside a `window_ms` window.
    ///
    /// Returns `None` once `age_ms > window_ms`. Negative ages (capture time
    /// after `now`) are treated as zero.
    fn intensity(&self, age_ms: i64, window_ms: i64) -> Option<f64>;
}

/// Linear fade from `max` (fresh) to `min` (window boundary)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearDecay {
    pub min: f64,
    pub max: f64,
}

impl Default for LinearDecay {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_INTENSITY,
            max: DEFAULT_MAX_INTENSITY,
        }
    }
}

impl DecayCurve for LinearDecay {
    fn intensity(&self, age_ms: i64, window_ms: i64) -> Option<f64> {
        let t = window_fraction(age_ms, window_ms)?;
        Some(self.max * (1.0 - t) + self.min * t)
    }
}

/// Exponential fade with a half-life, floored at `min` and cut at the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecay {
    pub min: f64,
    pub max: f64,
    pub half_life_ms: i64,
}

impl DecayCurve for ExponentialDecay {
    fn intensity(&self, age_ms: i64, window_ms: i64) -> Option<f64> {
        window_fraction(age_ms, window_ms)?;
        let age = age_ms.max(0) as f64;
        let factor = 0.5_f64.powf(age / self.half_life_ms.max(1) as f64);
        Some(self.min + (self.max - self.min) * factor)
    }
}

/// Position of `age` inside the window as a fraction in [0, 1]
fn window_fraction(age_ms: i64, window_ms: i64) -> Option<f64> {
    if window_ms <= 0 || age_ms > window_ms {
        return None;
    }
    Some(age_ms.max(0) as f64 / window_ms as f64)
}

/// Default linear decay with the recommended 0.1–0.8 range
pub fn decay(age_ms: i64, window_ms: i64) -> Option<f64> {
    LinearDecay::default().intensity(age_ms, window_ms)
}
