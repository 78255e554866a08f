use crate::sams::{FeedEnvelope, MatchUpdatePayload};
use crate::{MatchUpdate, Serving};
use std::fmt;

pub const MATCH_UPDATE: &str = "MATCH_UPDATE";

/// One decoded text frame from the live feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    MatchUpdate(MatchUpdate),
    /// Any other message type. Kept only so it can be logged.
    Other { kind: Option<String> },
}

#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    MissingPayload,
    NoSets,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "invalid feed message: {e}"),
            DecodeError::MissingPayload => write!(f, "{MATCH_UPDATE} without payload"),
            DecodeError::NoSets => write!(f, "{MATCH_UPDATE} without any match sets"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e)
    }
}

/// Decode a feed frame. The whole payload is validated here so that callers
/// can apply an update in one step or not at all.
pub fn decode(text: &str) -> Result<FeedEvent, DecodeError> {
    let envelope: FeedEnvelope = serde_json::from_str(text)?;

    if envelope.kind.as_deref() != Some(MATCH_UPDATE) {
        return Ok(FeedEvent::Other { kind: envelope.kind });
    }

    let payload = envelope.payload.ok_or(DecodeError::MissingPayload)?;
    let payload: MatchUpdatePayload = serde_json::from_value(payload)?;
    Ok(FeedEvent::MatchUpdate(map_payload(payload)?))
}

fn map_payload(payload: MatchUpdatePayload) -> Result<MatchUpdate, DecodeError> {
    let last_set = payload.match_sets.last().ok_or(DecodeError::NoSets)?;

    Ok(MatchUpdate {
        match_id: payload.match_uuid,
        sets: (payload.set_points.team1, payload.set_points.team2),
        score: (last_set.set_score.team1, last_set.set_score.team2),
        serving: Serving::from_wire(payload.serving.as_deref()),
        finalized: payload.finalized.unwrap_or(false),
    })
}
