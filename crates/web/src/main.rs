use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chess_sight_core::{EngineConfig, EngineManager};

mod routes;

pub struct AppState {
    pub engine: Arc<EngineManager>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/analyze", post(routes::analyze))
        .route("/engine/restart", post(routes::restart_engine))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the engine handshake off the startup path so the listener binds
/// immediately; `/health` reports the state until the handshake settles.
pub fn start_in_background(engine: Arc<EngineManager>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = engine.start().await {
            tracing::warn!("running without an engine: {}", e);
        }
    })
}

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.to_lowercase()))
        .init();

    let engine = Arc::new(EngineManager::new(EngineConfig::from_env()));
    start_in_background(engine.clone());

    let state = Arc::new(AppState {
        engine: engine.clone(),
    });
    let app = router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(9090);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind port {}: {}", port, e));

    tracing::info!("ChessSight Engine API running at http://localhost:{}", port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {}", e);
    }

    engine.shutdown().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
