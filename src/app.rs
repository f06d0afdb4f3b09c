//! Application router assembly shared by the binary and the integration tests.

use std::sync::Arc;

use axum::{Router, middleware};
use http::{Method, header::CONTENT_TYPE};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::middleware::connection_limit_middleware;
use crate::routes;
use crate::state::AppState;

/// Build the full router: `/ws` behind the connection limiter, static assets
/// at `/`, plus CORS and security headers.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// connection limiter keys on the peer address.
pub fn create_app(state: Arc<AppState>) -> Router {
    let speak_routes = routes::create_speak_router().layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));
    let static_routes = routes::create_static_router(&state.config.static_dir);

    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    speak_routes
        .merge(static_routes)
        .with_state(state)
        .layer(cors)
        .layer(security_headers)
}

/// CORS from a comma-separated origin list, `*` for any origin, or
/// same-origin only when unset.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    match origins {
        Some("*") => base.allow_origin(Any).allow_credentials(false),
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            base.allow_origin(origins).allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            base.allow_credentials(false)
        }
    }
}
