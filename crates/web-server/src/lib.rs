// In crates/web-server/src/lib.rs

use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Json},
    routing::get,
};
use app_config::ServerSettings;
use core_types::{AlertRecord, Symbol};
use engine::MonitorState;
use events::{EventSender, MonitorEvent, ReplayCache, SnapshotUpdate};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use types::{
    AdviceEntry, CooldownEntry, MAX_PAGE_SIZE, PaginatedResponse, PaginationParams, StatusResponse,
};

pub mod error;
pub mod types;

// Re-export our custom error type for convenience.
pub use error::{Error, Result};

/// The shared application state that is available to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<MonitorState>,
    pub ws_tx: EventSender,     // For broadcasting live messages
    pub ws_cache: ReplayCache, // For replaying recent messages
}

/// Creates the main application router with all routes and middleware.
pub fn create_router(app_state: AppState) -> Router {
    // The surface is read-only, so any origin may read it.
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let api_router = Router::new()
        .route("/status", get(get_status_handler))
        .route("/alerts", get(get_alerts_handler))
        .route("/snapshots", get(get_snapshots_handler))
        .route("/snapshots/{symbol}", get(get_snapshot_handler))
        .route("/advice", get(get_advice_handler));

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check_handler))
        .nest("/api", api_router)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn health_check_handler() -> &'static str {
    "OK"
}

/// Handler for `GET /api/status`: loop phase, symbols, last tick and cooldowns.
async fn get_status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let cooldowns = state
        .monitor
        .cooldown()
        .entries()
        .into_iter()
        .map(|(symbol, record)| CooldownEntry {
            symbol,
            last_alert: record.last_alert,
            dispatches: record.dispatches,
        })
        .collect();

    Json(StatusResponse {
        status: state.monitor.status(),
        cooldowns,
    })
}

/// Handler for `GET /api/alerts`. Newest first.
async fn get_alerts_handler(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<AlertRecord>>> {
    if params.page == 0 || params.page_size == 0 || params.page_size > MAX_PAGE_SIZE {
        return Err(Error::BadRequest(format!(
            "page must be at least 1 and page_size between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let (items, total_items) = state.monitor.alerts_page(params.page, params.page_size);

    Ok(Json(PaginatedResponse {
        items,
        total_items,
        page: params.page,
        page_size: params.page_size,
    }))
}

/// Handler for `GET /api/snapshots`
async fn get_snapshots_handler(State(state): State<AppState>) -> Json<Vec<SnapshotUpdate>> {
    Json(state.monitor.snapshots())
}

/// Handler for `GET /api/snapshots/{symbol}`
async fn get_snapshot_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<SnapshotUpdate>> {
    let symbol = Symbol::parse(&symbol).map_err(|e| Error::BadRequest(e.to_string()))?;

    state
        .monitor
        .snapshots()
        .into_iter()
        .find(|s| s.symbol == symbol)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("No snapshot for {} yet", symbol)))
}

/// Handler for `GET /api/advice`: the latest advisory text per symbol.
async fn get_advice_handler(State(state): State<AppState>) -> Json<Vec<AdviceEntry>> {
    let entries = state
        .monitor
        .advice()
        .into_iter()
        .map(|(symbol, cached)| AdviceEntry {
            symbol,
            text: cached.text,
            at: cached.at,
        })
        .collect();
    Json(entries)
}

/// The handler for `GET /ws`.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Replays the cache, then streams live events until the client goes away.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("New WebSocket client connected.");

    // --- 1. The "Replay" ---
    for msg in state.ws_cache.snapshot() {
        if send_event(&mut socket, &msg).await.is_err() {
            tracing::info!("WebSocket client disconnected during replay.");
            return;
        }
    }

    // --- 2. "Going Live" ---
    let mut rx = state.ws_tx.subscribe();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(msg) => {
                    if send_event(&mut socket, &msg).await.is_err() {
                        tracing::info!("WebSocket client disconnected.");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket client lagged behind; messages dropped.");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("WebSocket client sent close frame.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket receive error.");
                    break;
                }
            },
        }
    }
    tracing::info!("WebSocket client connection closed.");
}

async fn send_event(socket: &mut WebSocket, msg: &MonitorEvent) -> std::result::Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json_msg) => socket.send(Message::Text(json_msg.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize event; skipping.");
            Ok(())
        }
    }
}

/// The main entry point for running the web server.
///
/// Runs until the process is terminated or the listener fails.
pub async fn run(settings: &ServerSettings, app_state: AppState) -> Result<()> {
    let app = create_router(app_state);

    let address = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&address).await.map_err(Error::ServerBindError)?;
    tracing::info!("Web server listening on {}", address);

    axum::serve(listener, app).await.map_err(Error::ServeError)
}
