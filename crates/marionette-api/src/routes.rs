//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Localhost origins only; the surface is an operator console, not a
    // public API.
    let port = state.config.api.port;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            format!("http://127.0.0.1:{}", port)
                .parse::<HeaderValue>()
                .unwrap(),
            format!("http://localhost:{}", port)
                .parse::<HeaderValue>()
                .unwrap(),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/actions", post(handlers::submit_action))
        .route("/results/recent", get(handlers::recent_results))
        .route("/recovery/resume", post(handlers::resume))
        .route("/handlers/reload", post(handlers::reload_handlers))
        .route("/stream", get(handlers::stream))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to the configured host (localhost by default).
pub async fn start_server(state: AppState) -> Result<(), marionette_core::error::MarionetteError> {
    let addr = format!("{}:{}", state.config.api.host, state.config.api.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        marionette_core::error::MarionetteError::Api(format!("Failed to bind: {}", e))
    })?;

    axum::serve(listener, router)
        .await
        .map_err(|e| marionette_core::error::MarionetteError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
