//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use viab_core::config::ViabConfig;
use viab_core::error::ViabError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// The chat page may be opened from another origin during development, so
/// CORS allows any origin and exposes the run identifier headers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            HeaderName::from_static("x-session-id"),
            HeaderName::from_static("x-run-id"),
        ]);

    let body_limit = (state.config.server.max_body_mb as usize).saturating_mul(1024 * 1024);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ui", get(handlers::ui))
        .route("/agents", get(handlers::agents))
        .route("/runs", post(handlers::create_run))
        .route("/analyze-image", post(handlers::analyze_image))
        .route("/sessions", get(handlers::sessions))
        .route("/sessions/{session_id}/runs", get(handlers::session_runs))
        .route("/memories", get(handlers::memories))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind to `server.host:server.port` and serve until the process exits.
pub async fn start_server(config: &ViabConfig, state: AppState) -> Result<(), ViabError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ViabError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| ViabError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
