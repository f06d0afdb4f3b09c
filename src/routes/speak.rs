//! Speak WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::speak::speak_ws_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the speak WebSocket router
///
/// # Endpoint
///
/// `GET /ws?model=<name>` - WebSocket upgrade for text-to-speech relay
///
/// # Example
///
/// ```json
/// // Client sends text
/// {"text": "Hello there"}
///
/// // Server relays backend status frames
/// {"type": "Open"}
/// {"type": "Flushed", "sequence_id": 1}
///
/// // ...and binary frames: a WAV header, then linear16 audio chunks
/// ```
pub fn create_speak_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(speak_ws_handler))
        .layer(TraceLayer::new_for_http())
}
