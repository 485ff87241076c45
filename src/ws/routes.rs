use axum::{Router, routing::get};

use crate::state::AppState;
use crate::ws::handler::ws_handler;

/// Create WebSocket routes.
///
/// Routes:
/// - GET `/ws?userId=...` - push-event socket with subscribe/unsubscribe frames
pub fn create_ws_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}
