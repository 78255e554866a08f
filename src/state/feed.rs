use crate::state::shutdown::Shutdown;
use crate::state::ticker::{SharedTicker, UpdateOutcome};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use std::fmt;
use tokio::net::TcpStream;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

#[derive(Debug)]
pub enum FeedError {
    Request(String),
    Connect(tungstenite::Error),
    Transport(tungstenite::Error),
    Closed,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Request(msg) => write!(f, "invalid feed request: {msg}"),
            FeedError::Connect(e) => write!(f, "connect failed: {e}"),
            FeedError::Transport(e) => write!(f, "read failed: {e}"),
            FeedError::Closed => write!(f, "connection closed by server"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Opens a connection to the live feed.
pub trait FeedConnector: Send + Sync {
    type Stream: Stream<Item = Result<Message, tungstenite::Error>> + Send + Unpin;

    fn connect(&self) -> impl Future<Output = Result<Self::Stream, FeedError>> + Send;
}

/// Secure websocket to the SAMS backend. Certificates are checked against
/// the bundled webpki roots.
#[derive(Debug, Clone)]
pub struct WsConnector {
    pub url: String,
    pub origin: String,
    pub user_agent: String,
}

impl FeedConnector for WsConnector {
    type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect(&self) -> Result<Self::Stream, FeedError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| FeedError::Request(e.to_string()))?;

        let headers = request.headers_mut();
        for (name, value) in [("Origin", &self.origin), ("User-Agent", &self.user_agent)] {
            let value = HeaderValue::from_str(value).map_err(|e| FeedError::Request(format!("{name}: {e}")))?;
            headers.insert(name, value);
        }

        let (stream, _) = connect_async(request).await.map_err(FeedError::Connect)?;
        Ok(stream)
    }
}

/// Keeps the feed connection up for the lifetime of the process and applies
/// every frame to the shared ticker state.
pub struct FeedWorker<C> {
    connector: C,
    state: SharedTicker,
    reconnect_delay: Duration,
    shutdown: Shutdown,
}

impl<C: FeedConnector> FeedWorker<C> {
    pub fn new(connector: C, state: SharedTicker, reconnect_delay: Duration, shutdown: Shutdown) -> Self {
        Self { connector, state, reconnect_delay, shutdown }
    }

    pub async fn run(mut self) {
        loop {
            match self.session().await {
                Ok(()) => return,
                Err(e) => warn!(
                    "feed connection error: {e}, retrying in {} seconds",
                    self.reconnect_delay.as_secs()
                ),
            }

            if !self.shutdown.sleep(self.reconnect_delay).await {
                return;
            }
        }
    }

    /// One connection, start to drop. `Ok` only when shutdown was requested.
    async fn session(&mut self) -> Result<(), FeedError> {
        let mut stream = tokio::select! {
            connected = self.connector.connect() => connected?,
            _ = self.shutdown.triggered() => return Ok(()),
        };
        info!("connected to live feed");

        loop {
            let inbound = tokio::select! {
                inbound = stream.next() => inbound,
                _ = self.shutdown.triggered() => return Ok(()),
            };

            match inbound {
                Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => return Err(FeedError::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(FeedError::Transport(e)),
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        let now_ms = Utc::now().timestamp_millis();
        let mut guard = self.state.lock().await;

        match guard.handle_frame(text, now_ms) {
            Ok(UpdateOutcome::Applied) => info!("update for our match: {:?}", guard.current()),
            Ok(UpdateOutcome::Finalized { next: Some(next) }) => {
                info!("match finished, now following {next}: {:?}", guard.current())
            }
            Ok(UpdateOutcome::Finalized { next: None }) => info!(
                "match finished, {} matches left to follow: {:?}",
                guard.candidates().len(),
                guard.current()
            ),
            Ok(UpdateOutcome::Untracked { match_id }) => debug!("update for untracked match {match_id:?}"),
            Ok(UpdateOutcome::Ignored { kind }) => debug!("feed message of other type {kind:?}"),
            Err(e) => warn!("error processing feed message: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::get_current_match;
    use crate::state::discovery::Discovery;
    use crate::state::ticker::TickerState;
    use futures_util::stream;
    use sams_api::client::SamsApi;
    use sams_api::CandidateMatch;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type ScriptedStream = stream::Iter<std::vec::IntoIter<Result<Message, tungstenite::Error>>>;

    /// Plays back one entry per connection attempt. `None` fails the attempt.
    /// With nothing scripted, connect waits until an entry is pushed.
    #[derive(Clone, Default)]
    struct ScriptedConnector {
        script: Arc<Mutex<VecDeque<Option<Vec<Message>>>>>,
        attempts: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedConnector {
        fn new(script: Vec<Option<Vec<Message>>>) -> Self {
            Self { script: Arc::new(Mutex::new(script.into())), ..Default::default() }
        }

        fn push(&self, messages: Vec<Message>) {
            self.script.lock().unwrap().push_back(Some(messages));
        }

        fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl FeedConnector for ScriptedConnector {
        type Stream = ScriptedStream;

        async fn connect(&self) -> Result<Self::Stream, FeedError> {
            self.attempts.lock().unwrap().push(Instant::now());
            loop {
                let next = self.script.lock().unwrap().pop_front();
                match next {
                    Some(Some(messages)) => {
                        return Ok(stream::iter(messages.into_iter().map(Ok).collect::<Vec<_>>()));
                    }
                    Some(None) => return Err(FeedError::Connect(tungstenite::Error::ConnectionClosed)),
                    None => tokio::time::sleep(Duration::from_millis(5)).await,
                }
            }
        }
    }

    fn text(json: serde_json::Value) -> Message {
        Message::Text(json.to_string().into())
    }

    fn update(id: &str, set_score: (u32, u32), serving: &str, finalized: bool) -> Message {
        text(serde_json::json!({
            "type": "MATCH_UPDATE",
            "payload": {
                "matchUuid": id,
                "setPoints": {"team1": 1, "team2": 0},
                "matchSets": [{"setScore": {"team1": set_score.0, "team2": set_score.1}}],
                "serving": serving,
                "finalized": finalized
            }
        }))
    }

    async fn tracking(id: &str) -> SharedTicker {
        let state = TickerState::shared();
        let mut guard = state.lock().await;
        guard.replace_candidates(
            [(id.to_string(), CandidateMatch { id: id.into(), date: Some(Utc::now().timestamp_millis()), ..Default::default() })]
                .into_iter()
                .collect(),
        );
        guard.select_active(Utc::now().timestamp_millis());
        drop(guard);
        state
    }

    async fn wait_for(state: &SharedTicker, done: impl Fn(&TickerState) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if done(&*state.lock().await) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("ticker state never reached the expected condition");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_waits_flat_delay_before_retry() {
        let connector = ScriptedConnector::new(vec![None]);
        let worker = FeedWorker::new(connector.clone(), TickerState::shared(), Duration::from_secs(5), Shutdown::never());
        let task = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(connector.attempts().len(), 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1] - attempts[0], Duration::from_secs(5));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn transport_drop_reconnects_after_one_delay() {
        let connector = ScriptedConnector::new(vec![Some(vec![update("m", (3, 1), "team1", false)])]);
        let state = tracking("m").await;
        let worker = FeedWorker::new(connector.clone(), state.clone(), Duration::from_secs(5), Shutdown::never());
        let task = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_secs(12)).await;
        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1] - attempts[0], Duration::from_secs(5));
        assert_eq!(state.lock().await.current().score1, 3);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn bad_frames_do_not_end_the_session() {
        let connector = ScriptedConnector::new(vec![Some(vec![
            Message::Text("{not json".into()),
            text(serde_json::json!({"type": "MATCH_UPDATE", "payload": {"matchUuid": "m"}})),
            Message::Ping(Vec::new().into()),
            text(serde_json::json!({"type": "SOMETHING_ELSE"})),
            update("m", (15, 10), "team2", false),
        ])]);
        let state = tracking("m").await;
        let worker = FeedWorker::new(connector.clone(), state.clone(), Duration::from_secs(5), Shutdown::never());
        let task = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(connector.attempts().len(), 1);
        let current = state.lock().await.current().clone();
        assert_eq!((current.score1, current.score2, current.serving), (15, 10, 1));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_reconnect_loop() {
        let connector = ScriptedConnector::new(vec![None, None, None]);
        let (tx, shutdown) = Shutdown::new();
        let worker = FeedWorker::new(connector.clone(), TickerState::shared(), Duration::from_secs(5), shutdown);
        let task = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(connector.attempts().len(), 1);
    }

    #[tokio::test]
    async fn follows_discovered_match_until_it_is_final() {
        let team = "team-a";
        let now = Utc::now().timestamp_millis();
        let hour = 60 * 60 * 1000;
        let mut server = mockito::Server::new_async().await;
        let _home = server.mock("GET", "/").with_status(200).create_async().await;
        let _listing = server
            .mock("GET", "/listing")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({"matchDays": [{"matches": [
                    {"id": "earlier", "team1": team, "team2": "x", "teamDescription1": "VC Home", "teamDescription2": "TV Away", "date": now - hour},
                    {"id": "later", "team1": "y", "team2": team, "teamDescription1": "SV Next", "date": now + 2 * hour}
                ]}]})
                .to_string(),
            )
            .create_async()
            .await;
        let api = SamsApi::new("test-agent")
            .unwrap()
            .with_endpoints(format!("{}/", server.url()), format!("{}/listing", server.url()));

        let state = TickerState::shared();
        let discovery = Discovery::new(api, team.into(), Duration::from_secs(60), state.clone(), Shutdown::never());
        assert!(discovery.run().await);
        assert_eq!(state.lock().await.current().id.as_deref(), Some("earlier"));

        let connector = ScriptedConnector::new(vec![Some(vec![update("earlier", (15, 10), "team2", false)])]);
        let worker = FeedWorker::new(connector.clone(), state.clone(), Duration::from_millis(10), Shutdown::never());
        let task = tokio::spawn(worker.run());

        wait_for(&state, |s| s.current().score1 == 15).await;
        let live = get_current_match(&state).await;
        assert_eq!(live.id.as_deref(), Some("earlier"));
        assert_eq!((live.set1, live.set2, live.score1, live.score2, live.serving), (1, 0, 15, 10, 1));

        connector.push(vec![update("earlier", (25, 23), "team1", true)]);
        wait_for(&state, |s| !s.candidates().contains_key("earlier")).await;
        let next = get_current_match(&state).await;
        assert_eq!(next.id.as_deref(), Some("later"));
        assert_eq!((next.team1.as_str(), next.team2.as_str()), ("SV Next", "Team 2"));
        assert_eq!((next.set1, next.score1, next.score2, next.serving), (0, 0, 0, 0));
        task.abort();
    }
}
