//! Speak WebSocket handler
//!
//! Upgrades `GET /ws?model=<name>` and runs one [`Session`] over the socket.

use axum::{
    Extension,
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info};

use crate::core::relay::WsFrameSink;
use crate::middleware::{ClientIp, ConnectionGuard};
use crate::state::AppState;

use super::messages::SpeakQuery;
use super::session::Session;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Speak WebSocket handler
///
/// # Arguments
/// * `ws` - The WebSocket upgrade request from Axum
/// * `query` - Optional `model` query parameter
/// * `state` - Application state containing configuration and the backend factory
/// * `client_ip` - Set by the connection limit middleware when a slot was taken
pub async fn speak_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<SpeakQuery>,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    info!(model = ?query.model, "Speak WebSocket connection upgrade requested");

    // Released when the session ends, or when the upgrade never completes and
    // the callback below is dropped unused.
    let guard = client_ip.map(|Extension(ClientIp(ip))| ConnectionGuard::new(state.clone(), ip));

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_failed_upgrade(|e| error!("Failed to upgrade speak WebSocket: {}", e))
        .on_upgrade(move |socket| handle_speak_socket(socket, state, query, guard))
}

async fn handle_speak_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    query: SpeakQuery,
    guard: Option<ConnectionGuard>,
) {
    let options = state.config.speak_options(query.model.as_deref());
    if query.model.as_deref().is_none_or(str::is_empty) {
        info!("No model specified, using default model {}", options.model);
    }

    let (sender, receiver) = socket.split();
    let sink = Arc::new(WsFrameSink::new(sender));

    let session = Session::new(options, state.config.header_quiet_interval(), sink);
    let outcome = session.run(state.speak_factory.as_ref(), receiver).await;

    drop(guard);
    info!(end = ?outcome.end, "Speak WebSocket connection terminated");
}
