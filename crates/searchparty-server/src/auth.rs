//! Caller identity
//!
//! Authentication happens at the gateway in front of this server, which
//! forwards the signed-in participant in the `x-participant-id` header.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use searchparty_core::ParticipantId;

/// Header carrying the authenticated participant id
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// The participant making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub ParticipantId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        participant_from_parts(parts)
            .map(Caller)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                format!("missing {} header", PARTICIPANT_HEADER),
            ))
    }
}

fn participant_from_parts(parts: &Parts) -> Option<ParticipantId> {
    let value = parts.headers.get(PARTICIPANT_HEADER)?.to_str().ok()?.trim();
    validate_participant_id(value).then(|| ParticipantId::from(value))
}

/// Participant ids are opaque but must be non-empty printable ASCII
pub fn validate_participant_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && id.chars().all(|c| c.is_ascii_graphic())
}
