use sams_api::feed::{self, DecodeError, FeedEvent};
use sams_api::{CandidateMatch, CandidateSet, MatchUpdate};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedTicker = Arc<Mutex<TickerState>>;

/// The record served by `/api/match`. `id` is `None` while no match is
/// followed; the other fields are meaningless in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentMatch {
    pub id: Option<String>,
    pub team1: String,
    pub team2: String,
    pub score1: u32,
    pub score2: u32,
    pub set1: u32,
    pub set2: u32,
    pub serving: u8,
}

/// What became of a feed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The match ended. `next` is the newly selected match, if any remained.
    Finalized { next: Option<String> },
    Untracked { match_id: Option<String> },
    Ignored { kind: Option<String> },
}

/// Candidate set plus the followed match. Both live behind one lock so an
/// update and any re-selection it triggers are seen as a single change.
#[derive(Debug, Default)]
pub struct TickerState {
    candidates: CandidateSet,
    current: CurrentMatch,
}

impl TickerState {
    pub fn shared() -> SharedTicker {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn current(&self) -> &CurrentMatch {
        &self.current
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    /// Install the result of a fresh listing fetch.
    pub fn replace_candidates(&mut self, candidates: CandidateSet) {
        self.candidates = candidates;
    }

    /// Follow the candidate closest to `now_ms`, resetting the counters.
    /// Leaves the record untouched and returns `false` when there is none.
    pub fn select_active(&mut self, now_ms: i64) -> bool {
        let Some(closest) = closest_match(&self.candidates, now_ms) else {
            return false;
        };

        self.current = CurrentMatch {
            id: Some(closest.id.clone()),
            team1: closest.team1_name.clone().unwrap_or_else(|| "Team 1".into()),
            team2: closest.team2_name.clone().unwrap_or_else(|| "Team 2".into()),
            ..CurrentMatch::default()
        };
        true
    }

    /// Decode one text frame and apply it.
    pub fn handle_frame(&mut self, text: &str, now_ms: i64) -> Result<UpdateOutcome, DecodeError> {
        match feed::decode(text)? {
            FeedEvent::MatchUpdate(update) => Ok(self.apply(update, now_ms)),
            FeedEvent::Other { kind } => Ok(UpdateOutcome::Ignored { kind }),
        }
    }

    pub fn apply(&mut self, update: MatchUpdate, now_ms: i64) -> UpdateOutcome {
        let Some(match_id) = update
            .match_id
            .as_deref()
            .filter(|id| self.candidates.contains_key(*id))
        else {
            return UpdateOutcome::Untracked { match_id: update.match_id };
        };

        let current = &mut self.current;
        (current.set1, current.set2) = update.sets;
        (current.score1, current.score2) = update.score;
        current.serving = update.serving.as_index();

        if !update.finalized {
            return UpdateOutcome::Applied;
        }

        self.candidates.remove(match_id);
        if self.select_active(now_ms) {
            UpdateOutcome::Finalized { next: self.current.id.clone() }
        } else {
            UpdateOutcome::Finalized { next: None }
        }
    }
}

/// The candidate whose start is nearest to `now_ms`; the first in key order
/// wins a tie.
pub fn closest_match(candidates: &CandidateSet, now_ms: i64) -> Option<&CandidateMatch> {
    candidates.values().min_by_key(|m| m.distance_from(now_ms))
}
