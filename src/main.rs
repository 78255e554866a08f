mod server;
mod state;

use crate::state::discovery::Discovery;
use crate::state::feed::{FeedWorker, WsConnector};
use crate::state::settings::Settings;
use crate::state::shutdown::Shutdown;
use crate::state::ticker::{SharedTicker, TickerState};
use log::{error, info};
use sams_api::client::SamsApi;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let settings = Settings::load();
    setup_logging(&settings.log_filter);

    let (shutdown_tx, shutdown) = Shutdown::new();

    info!("starting SAMS ticker client for team {}", settings.team_id);
    let app = match SamsApi::new(&settings.user_agent) {
        Ok(api) => {
            let api = api.with_endpoints(settings.home_url.clone(), settings.listing_url.clone());
            let state = TickerState::shared();
            tokio::spawn(track(api, settings.clone(), state.clone(), shutdown.clone()));
            info!("live feed running in background");
            server::router(state)
        }
        Err(e) => {
            error!("failed to initialize the ticker: {e}");
            server::fallback_router()
        }
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    info!("web server listening on http://{}", settings.bind_addr);

    let mut server_shutdown = shutdown;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.triggered().await })
        .await?;

    Ok(())
}

/// Discovery first, then the live feed for as long as the process runs.
async fn track(api: SamsApi, settings: Settings, state: SharedTicker, shutdown: Shutdown) {
    let discovery = Discovery::new(
        api,
        settings.team_id,
        settings.discovery_retry,
        state.clone(),
        shutdown.clone(),
    );
    if !discovery.run().await {
        return;
    }

    let connector = WsConnector {
        url: settings.feed_url,
        origin: settings.origin,
        user_agent: settings.user_agent,
    };
    FeedWorker::new(connector, state, settings.reconnect_delay, shutdown)
        .run()
        .await;
}

fn setup_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("sams-ticker {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "sams-ticker - follow a SAMS volleyball match and serve its live score

Usage:
  sams-ticker
  sams-ticker --help
  sams-ticker --version

Endpoints:
  GET /            status page
  GET /api/match   current match as JSON

Environment:
  SAMS_TICKER_TEAM_ID       Team UUID to follow
  SAMS_TICKER_BIND          Listen address (default 0.0.0.0:10000)
  SAMS_TICKER_FEED_URL      Live feed websocket (default wss://backend.sams-ticker.de/indoor/vvb)
  SAMS_TICKER_HOME_URL      Public ticker page loaded before the listing
  SAMS_TICKER_LISTING_URL   Schedule listing URL
  RUST_LOG                  Log filter (default info)"
}
