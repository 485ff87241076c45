// Turn Arena backend: turn-based multiplayer game server

pub mod db;
pub mod errors;
pub mod games;
pub mod http;
pub mod locks;
pub mod manager;
mod middleware;
pub use middleware::cors_layer;
pub mod models;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use state::AppState;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Request deadline at the HTTP boundary; the core itself never times a
/// move out, so a deadline that fires while a request waits for its
/// per-game lock simply drops it from the queue without side effects.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the full router (REST + WebSocket) around shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(http::create_http_routes(state.clone()))
        .merge(ws::create_ws_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .fallback(|| async { "404 Not Found" })
}

/// Start the HTTP API server
pub async fn start_server() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    // Initialize application state (registry, store, locks, hub, AI driver)
    let state = AppState::new().await?;
    let port = state.config.port;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("Server listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Handle graceful shutdown on SIGTERM or Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, shutting down");
        },
        _ = terminate => {
            tracing::info!("SIGTERM received, shutting down");
        },
    }
}
