use crate::state::ticker::{CurrentMatch, SharedTicker};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn router(state: SharedTicker) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/match", get(get_match))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Served when the ticker could not be set up at all.
pub fn fallback_router() -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Error initializing the app") }),
        )
        .route(
            "/api/match",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "App not initialized" })),
                )
            }),
        )
        .layer(TraceLayer::new_for_http())
}

/// Snapshot of the followed match. The lock is held only for the clone.
pub async fn get_current_match(state: &SharedTicker) -> CurrentMatch {
    state.lock().await.current().clone()
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn get_match(State(state): State<SharedTicker>) -> impl IntoResponse {
    Json(get_current_match(&state).await)
}
