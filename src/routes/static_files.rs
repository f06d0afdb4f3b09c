//! Static asset route for the browser UI.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Serve `dir` at the root path. Missing files fall through to a 404.
pub fn create_static_router(dir: impl AsRef<Path>) -> Router<Arc<AppState>> {
    Router::new()
        .fallback_service(ServeDir::new(dir.as_ref()).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
}
