use std::env;
use std::time::Duration;

pub const DEFAULT_TEAM_ID: &str = "3b1fa79e-1276-4496-9e55-5366d60df69a";
pub const DEFAULT_BIND: &str = "0.0.0.0:10000";
pub const DEFAULT_FEED_URL: &str = "wss://backend.sams-ticker.de/indoor/vvb";
pub const FEED_ORIGIN: &str = "https://vvb.sams-ticker.de";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Settings {
    pub team_id: String,
    pub bind_addr: String,
    pub feed_url: String,
    pub home_url: String,
    pub listing_url: String,
    pub origin: String,
    pub user_agent: String,
    pub reconnect_delay: Duration,
    pub discovery_retry: Duration,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            team_id: DEFAULT_TEAM_ID.to_owned(),
            bind_addr: DEFAULT_BIND.to_owned(),
            feed_url: DEFAULT_FEED_URL.to_owned(),
            home_url: sams_api::client::SAMS_HOME.to_owned(),
            listing_url: sams_api::client::SAMS_LISTING.to_owned(),
            origin: FEED_ORIGIN.to_owned(),
            user_agent: USER_AGENT.to_owned(),
            reconnect_delay: Duration::from_secs(5),
            discovery_retry: Duration::from_secs(60),
            log_filter: "info".to_owned(),
        }
    }
}

impl Settings {
    /// Built-in defaults, overridden by any non-empty environment variable.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            team_id: get("SAMS_TICKER_TEAM_ID").unwrap_or(defaults.team_id),
            bind_addr: get("SAMS_TICKER_BIND").unwrap_or(defaults.bind_addr),
            feed_url: get("SAMS_TICKER_FEED_URL").unwrap_or(defaults.feed_url),
            home_url: get("SAMS_TICKER_HOME_URL").unwrap_or(defaults.home_url),
            listing_url: get("SAMS_TICKER_LISTING_URL").unwrap_or(defaults.listing_url),
            log_filter: get("RUST_LOG").unwrap_or(defaults.log_filter),
            ..defaults
        }
    }
}
