/// SAMS ticker raw wire types — serde shapes for the listing and feed payloads.
/// These map to our clean domain types in client.rs and feed.rs.
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Schedule listing  (live/indoor/tickers/{association})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TickerResponse {
    #[serde(default)]
    pub match_days: Vec<MatchDay>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MatchDay {
    #[serde(default)]
    pub matches: Vec<SamsMatch>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SamsMatch {
    pub id: String,
    pub team1: Option<String>, // team UUID
    pub team2: Option<String>,
    pub team_description1: Option<String>, // display name
    pub team_description2: Option<String>,
    pub date: Option<i64>, // epoch millis
}

// ---------------------------------------------------------------------------
// Push feed  (wss indoor/{association})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct FeedEnvelope {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpdatePayload {
    pub match_uuid: Option<String>,
    pub set_points: TeamPair,
    #[serde(default)]
    pub match_sets: Vec<MatchSet>,
    /// A missing key means team1 serves; an explicit null does not.
    #[serde(default = "team1_serving")]
    pub serving: Option<String>, // "team1" | "team2"
    #[serde(default)]
    pub finalized: Option<bool>,
}

fn team1_serving() -> Option<String> {
    Some("team1".to_owned())
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchSet {
    pub set_score: TeamPair,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct TeamPair {
    #[serde(default)]
    pub team1: u32,
    #[serde(default)]
    pub team2: u32,
}
