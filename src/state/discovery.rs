use crate::state::shutdown::Shutdown;
use crate::state::ticker::SharedTicker;
use chrono::Utc;
use log::{error, info, warn};
use sams_api::client::SamsApi;
use std::time::Duration;

/// Finds the match to follow. Retries the whole fetch on a fixed interval
/// until the listing yields at least one candidate.
pub struct Discovery {
    api: SamsApi,
    team_id: String,
    retry: Duration,
    state: SharedTicker,
    shutdown: Shutdown,
}

impl Discovery {
    pub fn new(api: SamsApi, team_id: String, retry: Duration, state: SharedTicker, shutdown: Shutdown) -> Self {
        Self { api, team_id, retry, state, shutdown }
    }

    /// Returns `true` once a match is selected, `false` on shutdown.
    pub async fn run(mut self) -> bool {
        if let Err(e) = self.api.open_ticker().await {
            warn!("could not open ticker page: {e}");
        }

        loop {
            if self.fetch_and_select().await {
                return true;
            }

            info!("no matches found, retrying in {} seconds", self.retry.as_secs());
            if !self.shutdown.sleep(self.retry).await {
                return false;
            }
        }
    }

    async fn fetch_and_select(&self) -> bool {
        let now_ms = Utc::now().timestamp_millis();
        let candidates = match self.api.fetch_matches(&self.team_id, now_ms).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("failed to fetch matches: {e}");
                return false;
            }
        };
        info!("found {} matches: {:?}", candidates.len(), candidates.keys().collect::<Vec<_>>());

        let mut guard = self.state.lock().await;
        guard.replace_candidates(candidates);
        let selected = guard.select_active(now_ms);
        if selected {
            info!("active match: {:?}", guard.current());
        }
        selected
    }
}
