// Game API routes mounted under `/api`.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    http::handlers::game::{
        apply_move, create_game, get_game, join_game, list_game_types, list_games, render_board,
        validate_move,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games", post(create_game).get(list_games))
        .route("/games/{game_id}", get(get_game))
        .route("/games/{game_id}/join", post(join_game))
        .route("/games/{game_id}/moves", post(apply_move))
        .route("/games/{game_id}/moves/validate", post(validate_move))
        .route("/games/{game_id}/board", get(render_board))
        .route("/game-types", get(list_game_types))
}
