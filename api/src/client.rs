use crate::sams::{SamsMatch, TickerResponse};
use crate::{CandidateMatch, CandidateSet};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const SAMS_HOME: &str = "https://vvb.sams-ticker.de/";
pub const SAMS_LISTING: &str = "https://backend.sams-ticker.de/live/indoor/tickers/vvb";

/// Matches that started longer ago than this are no longer candidates.
pub const RECENT_WINDOW_MS: i64 = 3 * 60 * 60 * 1000;

/// SAMS ticker client. Keeps cookies between calls so the listing request
/// carries whatever session the public ticker page hands out.
#[derive(Debug, Clone)]
pub struct SamsApi {
    client: Client,
    home_url: String,
    listing_url: String,
    timeout: Duration,
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl SamsApi {
    /// Build a client against the public SAMS endpoints.
    pub fn new(user_agent: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Other(format!("could not build http client: {e}")))?;

        Ok(Self {
            client,
            home_url: SAMS_HOME.to_owned(),
            listing_url: SAMS_LISTING.to_owned(),
            timeout: Duration::from_secs(10),
        })
    }

    pub fn with_endpoints(mut self, home_url: impl Into<String>, listing_url: impl Into<String>) -> Self {
        self.home_url = home_url.into();
        self.listing_url = listing_url.into();
        self
    }

    /// Load the public ticker page once, the way a browser would before the
    /// backend is queried.
    pub async fn open_ticker(&self) -> ApiResult<()> {
        let url = self.home_url.as_str();
        self.client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?
            .error_for_status()
            .map_err(|e| ApiError::Api(e, url.to_owned()))?;
        Ok(())
    }

    /// Fetch the schedule listing and keep the recent matches of `team_id`.
    pub async fn fetch_matches(&self, team_id: &str, now_ms: i64) -> ApiResult<CandidateSet> {
        let raw: TickerResponse = self.get(&self.listing_url).await?;
        Ok(filter_matches(raw, team_id, now_ms))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        response
            .error_for_status()
            .map_err(|e| ApiError::Api(e, url.to_owned()))?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Mapping: SAMS wire types → clean domain types
// ---------------------------------------------------------------------------

/// Keep matches involving `team_id` whose start lies within the recency
/// window. The window applies to both team slots.
pub fn filter_matches(raw: TickerResponse, team_id: &str, now_ms: i64) -> CandidateSet {
    let cutoff = now_ms - RECENT_WINDOW_MS;

    raw.match_days
        .into_iter()
        .flat_map(|day| day.matches)
        .map(map_match)
        .filter(|m| m.involves(team_id) && m.date.unwrap_or(0) > cutoff)
        .map(|m| (m.id.clone(), m))
        .collect()
}

fn map_match(raw: SamsMatch) -> CandidateMatch {
    CandidateMatch {
        id: raw.id,
        team1_id: raw.team1,
        team2_id: raw.team2,
        team1_name: raw.team_description1,
        team2_name: raw.team_description2,
        date: raw.date,
    }
}
