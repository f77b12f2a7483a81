//! WebSocket server and connection handling
//!
//! A single configured path accepts persistent push connections. Upgrades on
//! any other path get a structured `error` payload followed by a
//! policy-violation close and are never registered.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        State,
    },
    http::Uri,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use types::message::RelayMessage;

use crate::cache::TickerCache;
use crate::registry::{ClientRegistry, RegistrationGuard};

/// Subscriber-visible code for a connection on the wrong path.
pub const UNSUPPORTED_PATH: &str = "UNSUPPORTED_PATH";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub cache: Arc<TickerCache>,
    pub shutdown: CancellationToken,
}

/// Build the router: the one subscriber path, a health probe, and a
/// rejecting fallback for everything else.
pub fn create_router(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/health", get(health_handler))
        .fallback(reject_handler)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "clients": state.registry.len() }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Upgrade attempts on any other path: one error message, then close 1008.
async fn reject_handler(ws: WebSocketUpgrade, uri: Uri) -> impl IntoResponse {
    ws.on_upgrade(move |socket| reject_socket(socket, uri))
}

async fn reject_socket(mut socket: WebSocket, uri: Uri) {
    warn!(path = %uri.path(), "rejecting connection on unsupported path");
    let payload = RelayMessage::error(
        UNSUPPORTED_PATH,
        format!("unsupported path: {}", uri.path()),
    );
    if let Ok(text) = serde_json::to_string(&payload) {
        let _ = socket.send(Message::Text(Utf8Bytes::from(text))).await;
    }
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: Utf8Bytes::from_static("unsupported path"),
        })))
        .await;
}

/// One task per subscriber connection.
///
/// Registration is guard-scoped: the client is deregistered on every exit
/// path, including cancellation. The cached snapshot is queued before
/// registration so a late joiner sees it strictly before any live
/// broadcast.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let handle = state.registry.new_handle(tx.clone());
    let client_id = handle.id;

    if let Some(snapshot) = state.cache.get() {
        match serde_json::to_string(&RelayMessage::Ticker(snapshot)) {
            Ok(text) => {
                let _ = tx.send(Message::Text(Utf8Bytes::from(text)));
            }
            Err(err) => warn!(%err, "failed to serialize cached snapshot"),
        }
    }

    let _registration = RegistrationGuard::register(state.registry.clone(), handle);

    // Forward queued messages to the socket; ends when the peer is gone or
    // every sender is dropped.
    let forward = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    // This is a push-only feed: inbound frames are drained and ignored.
    // The task blocks here until the peer closes, errors, or we shut down.
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(client_id, %err, "websocket receive error");
                    break;
                }
            },
        }
    }

    forward.abort();
    // RegistrationGuard drop deregisters the client here.
}
