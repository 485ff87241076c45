// Game HTTP handlers: create, join, list, fetch, move, validate, render.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    games::{GameTypeInfo, MoveValidity},
    manager::{games, moves},
    models::{GameFilter, GameState, Lifecycle, Page, PagedGames},
    state::AppState,
};

/// Query parameters for listing games
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGamesQuery {
    /// Only games this player is seated in
    pub player_id: Option<String>,
    /// Lifecycle filter, e.g. "ACTIVE"
    pub lifecycle: Option<Lifecycle>,
    /// Game type filter, e.g. "tic-tac-toe"
    pub game_type: Option<String>,
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

/// Create a new game instance. Returns the created state.
pub async fn create_game(
    State(state): State<AppState>,
    Json(payload): Json<games::CreateGameRequest>,
) -> Result<Json<GameState>, (StatusCode, String)> {
    let game = games::create_game(&state, payload).await.map_err(|e| {
        tracing::error!("Failed to create game: {}", e);
        e.to_response()
    })?;
    Ok(Json(game))
}

/// Join an existing game as a new seat.
pub async fn join_game(
    Path(game_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<games::JoinGameRequest>,
) -> Result<Json<GameState>, (StatusCode, String)> {
    let game = games::join_game(&state, game_id, payload)
        .await
        .map_err(|e| {
            tracing::error!("Failed to join game {}: {}", game_id, e);
            e.to_response()
        })?;
    Ok(Json(game))
}

/// List games with filters and pagination.
pub async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<PagedGames>, (StatusCode, String)> {
    let params = games::ListGamesParams {
        player_id: query.player_id,
        filter: GameFilter {
            lifecycle: query.lifecycle,
            game_type: query.game_type,
        },
        page: Page::new(query.page, query.page_size),
    };

    let paged = games::list_games(&state, params).await.map_err(|e| {
        tracing::error!("Failed to list games: {}", e);
        e.to_response()
    })?;

    tracing::debug!(
        "Listed {} of {} games (page {})",
        paged.games.len(),
        paged.total,
        paged.page
    );
    Ok(Json(paged))
}

/// Get a game by id. Returns the state or `404`.
pub async fn get_game(
    Path(game_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<GameState>, (StatusCode, String)> {
    let game = games::get_game(&state, game_id)
        .await
        .map_err(|e| e.to_response())?;
    Ok(Json(game))
}

/// Submit a move. Returns the post-move (and post-AI-chain) state.
pub async fn apply_move(
    Path(game_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<moves::MoveRequest>,
) -> Result<Json<GameState>, (StatusCode, String)> {
    let game = moves::apply_move(&state, game_id, payload)
        .await
        .map_err(|e| {
            tracing::warn!("Move rejected for game {}: {}", game_id, e);
            e.to_response()
        })?;
    Ok(Json(game))
}

/// Dry-run a move against the engine's rules without applying it.
pub async fn validate_move(
    Path(game_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<moves::MoveRequest>,
) -> Result<Json<MoveValidity>, (StatusCode, String)> {
    let validity = moves::validate_move(&state, game_id, payload)
        .await
        .map_err(|e| e.to_response())?;
    Ok(Json(validity))
}

/// List the registered game types.
pub async fn list_game_types(
    State(state): State<AppState>,
) -> Json<Vec<GameTypeInfo>> {
    Json(state.registry.list())
}

/// Text rendering of the board, for the renderer collaborator.
pub async fn render_board(
    Path(game_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<String, (StatusCode, String)> {
    let game = games::get_game(&state, game_id)
        .await
        .map_err(|e| e.to_response())?;
    let engine = state
        .registry
        .get(&game.game_type)
        .ok_or_else(|| crate::errors::AppError::UnknownGameType(game.game_type.clone()).to_response())?;
    engine.render_board(&game).map_err(|e| e.to_response())
}
