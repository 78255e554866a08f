pub mod client;
pub mod feed;
pub mod sams;

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the SAMS wire format
// ---------------------------------------------------------------------------

/// Candidate matches keyed by match UUID. Ordered so that selection ties
/// resolve the same way on every run.
pub type CandidateSet = BTreeMap<String, CandidateMatch>;

/// A scheduled match involving the tracked team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateMatch {
    pub id: String,
    pub team1_id: Option<String>,
    pub team2_id: Option<String>,
    pub team1_name: Option<String>,
    pub team2_name: Option<String>,
    /// Scheduled start, epoch milliseconds.
    pub date: Option<i64>,
}

impl CandidateMatch {
    pub fn involves(&self, team_id: &str) -> bool {
        self.team1_id.as_deref() == Some(team_id) || self.team2_id.as_deref() == Some(team_id)
    }

    /// Absolute distance between the scheduled start and `now_ms`. A match
    /// without a date is never closer than one with a date.
    pub fn distance_from(&self, now_ms: i64) -> u64 {
        self.date
            .map(|date| date.abs_diff(now_ms))
            .unwrap_or(u64::MAX)
    }
}

/// Which side currently serves. Serialised as `0` (team 1) or `1` (team 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Serving {
    #[default]
    Team1,
    Team2,
}

impl Serving {
    /// Anything other than `"team1"`, null included, means the second team
    /// serves.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("team1") => Serving::Team1,
            _ => Serving::Team2,
        }
    }

    pub fn as_index(self) -> u8 {
        match self {
            Serving::Team1 => 0,
            Serving::Team2 => 1,
        }
    }
}

/// A decoded `MATCH_UPDATE` payload, reduced to the fields the ticker shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchUpdate {
    pub match_id: Option<String>,
    pub sets: (u32, u32),
    /// Points of the latest set only.
    pub score: (u32, u32),
    pub serving: Serving,
    pub finalized: bool,
}
