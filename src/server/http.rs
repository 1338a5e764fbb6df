//! HTTP surface: WebSocket upgrade, status endpoints, viewer assets

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::Error;
use crate::server::config::ServerConfig;
use crate::server::connection::serve_socket;
use crate::server::relay::RelayHandle;
use crate::stats::Uptime;

const SERVER_NAME: &str = "Atmos WebRTC Signaling Server";

pub(crate) const HEALTH_PATH: &str = "/health";
pub(crate) const SERVER_INFO_PATH: &str = "/api/server-info";
pub(crate) const DEBUG_PATH: &str = "/api/debug";

/// Fixed routes the WebSocket endpoint may not shadow
pub(crate) const STATUS_PATHS: [&str; 3] = [HEALTH_PATH, SERVER_INFO_PATH, DEBUG_PATH];

/// Shared state for every route
#[derive(Clone)]
pub(crate) struct AppState {
    pub relay: RelayHandle,
    pub config: Arc<ServerConfig>,
    pub permits: Option<Arc<Semaphore>>,
    pub uptime: Uptime,
}

/// Build the router
///
/// Expects a config that passed [`ServerConfig::validate`].
pub(crate) fn app(state: AppState) -> Router {
    let ws_path = state.config.ws_path.clone();
    let static_dir = state.config.static_dir.clone();

    let mut router = Router::new()
        .route(HEALTH_PATH, get(health))
        .route(SERVER_INFO_PATH, get(server_info))
        .route(DEBUG_PATH, get(debug_info))
        .route(&ws_path, get(ws_upgrade));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let permit = match state.permits {
        Some(ref sem) => match sem.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer, "Connection rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let relay = state.relay.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            serve_socket(socket, peer, relay).await;
        })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": now_rfc3339(),
    }))
}

async fn server_info(State(state): State<AppState>) -> Response {
    match state.relay.snapshot().await {
        Ok(snapshot) => Json(json!({
            "status": "online",
            "broadcasters": snapshot.live_broadcasters,
            "serverTime": now_rfc3339(),
        }))
        .into_response(),
        Err(e) => unavailable(e),
    }
}

async fn debug_info(State(state): State<AppState>) -> Response {
    match state.relay.snapshot().await {
        Ok(snapshot) => Json(json!({
            "status": "online",
            "server": SERVER_NAME,
            "broadcasters": {
                "count": snapshot.broadcasters.len(),
                "active": snapshot.broadcasters,
            },
            "connections": snapshot.connections,
            "stats": snapshot.stats,
            "serverTime": now_rfc3339(),
            "uptime": state.uptime.elapsed().as_secs_f64(),
        }))
        .into_response(),
        Err(e) => unavailable(e),
    }
}

fn unavailable(error: Error) -> Response {
    tracing::error!(error = %error, "Status request failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "unavailable", "error": error.to_string() })),
    )
        .into_response()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
