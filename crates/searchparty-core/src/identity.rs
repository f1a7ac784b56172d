//! Authenticated participant identity
//!
//! Authentication itself happens outside the core; sessions only ask who the
//! current participant is.

use crate::error::{Result, SearchError};
use crate::model::ParticipantId;

/// Supplies the signed-in participant, if any
pub trait IdentityProvider: Send + Sync {
    fn current_participant(&self) -> Option<ParticipantId>;

    /// Like [`current_participant`](Self::current_participant) but fails
    /// with [`SearchError::NotAuthenticated`] when nobody is signed in
    fn require_participant(&self) -> Result<ParticipantId> {
        self.current_participant()
            .ok_or(SearchError::NotAuthenticated)
    }
}

/// Fixed identity, or none
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<ParticipantId>);

impl StaticIdentity {
    pub fn signed_in(participant: impl Into<ParticipantId>) -> Self {
        Self(Some(participant.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_participant(&self) -> Option<ParticipantId> {
        self.0.clone()
    }
}
