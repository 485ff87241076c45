// HTTP routing: compose and mount sub-routers under `/api`.
use axum::Router;

use crate::state::AppState;

pub mod api;

/// Build the top-level HTTP router with all API routes under `/api`.
pub fn create_http_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::routes())
        .with_state(state)
}
