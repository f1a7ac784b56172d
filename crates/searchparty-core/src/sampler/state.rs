//! Sampler state machine
//!
//! State transitions:
//! ```text
//! Idle → Acquiring → Writing → Idle
//!          ↓
//!        Idle        (denied / failed acquisition)
//!
//! any non-terminal state → Stopped
//! ```

use serde::{Deserialize, Serialize};

/// Where the sampling loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerState {
    /// Waiting for the next tick
    Idle,
    /// Reading the device position
    Acquiring,
    /// Persisting the sampled position
    Writing,
    /// Torn down; no further writes
    Stopped,
}

impl SamplerState {
    /// Check if a state transition is valid
    pub fn can_transition_to(&self, target: &SamplerState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, target) {
            (SamplerState::Idle, SamplerState::Acquiring) => true,

            // Acquisition either succeeds into a write or falls back to idle
            (SamplerState::Acquiring, SamplerState::Writing) => true,
            (SamplerState::Acquiring, SamplerState::Idle) => true,

            (SamplerState::Writing, SamplerState::Idle) => true,

            (_, SamplerState::Stopped) => true,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SamplerState::Stopped)
    }
}

impl Default for SamplerState {
    fn default() -> Self {
        SamplerState::Idle
    }
}

impl std::fmt::Display for SamplerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerState::Idle => write!(f, "IDLE"),
            SamplerState::Acquiring => write!(f, "ACQUIRING"),
            SamplerState::Writing => write!(f, "WRITING"),
            SamplerState::Stopped => write!(f, "STOPPED"),
        }
    }
}
