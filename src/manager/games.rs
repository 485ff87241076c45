// Game manager: create and join games, list and fetch them, and keep the
// lifecycle consistent with the engine's player-count bounds.
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{GameFilter, GameState, Lifecycle, Page, PagedGames, Player};
use crate::state::AppState;

/// Body of `POST /api/games`. Seats may be declared up front; AI seats are
/// materialized into players with generated ids.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub game_type: String,
    #[serde(default)]
    pub config: Value,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator_id: Option<String>,
    #[serde(default)]
    pub players: Vec<SeatRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    pub id: Option<String>,
    pub name: String,
    #[serde(default, rename = "isAI")]
    pub is_ai: bool,
    pub strategy_id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub player: PlayerRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ListGamesParams {
    pub player_id: Option<String>,
    pub filter: GameFilter,
    pub page: Page,
}

fn materialize_seat(seat: SeatRequest) -> Player {
    let id = seat.id.unwrap_or_else(|| {
        if seat.is_ai {
            format!("ai-{}", Uuid::new_v4())
        } else {
            Uuid::new_v4().to_string()
        }
    });
    let mut player = Player::new(id, seat.name);
    player.metadata = seat.metadata;
    if seat.is_ai {
        player.metadata.insert("isAI".into(), Value::Bool(true));
        let strategy = seat
            .strategy_id
            .unwrap_or_else(|| crate::manager::ai::DEFAULT_STRATEGY.to_string());
        player
            .metadata
            .insert("strategyId".into(), Value::String(strategy));
    }
    player
}

fn initial_lifecycle(player_count: usize, min_players: usize) -> Lifecycle {
    if player_count == 0 {
        Lifecycle::Created
    } else if player_count < min_players {
        Lifecycle::WaitingForPlayers
    } else {
        Lifecycle::Active
    }
}

/// Create a game instance, persist it, and fire the creation hooks.
pub async fn create_game(
    state: &AppState,
    req: CreateGameRequest,
) -> Result<GameState, AppError> {
    let engine = state
        .registry
        .get(&req.game_type)
        .ok_or_else(|| AppError::UnknownGameType(req.game_type.clone()))?;

    let players: Vec<Player> = req.players.into_iter().map(materialize_seat).collect();
    if players.len() > engine.max_players() {
        return Err(AppError::GameFull);
    }
    for (i, player) in players.iter().enumerate() {
        if players[..i].iter().any(|p| p.id == player.id) {
            return Err(AppError::PlayerAlreadyPresent(player.id.clone()));
        }
    }

    let lifecycle = initial_lifecycle(players.len(), engine.min_players());

    let mut game = engine.initialize_game(&players, &req.config)?;
    game.lifecycle = lifecycle;
    game.version = 1;
    let now = Utc::now();
    game.created_at = now;
    game.updated_at = now;
    if let Some(creator_id) = req.creator_id {
        game.metadata
            .insert("createdBy".into(), Value::String(creator_id));
    }
    if let Some(name) = req.name {
        game.metadata.insert("name".into(), Value::String(name));
    }
    if let Some(description) = req.description {
        game.metadata
            .insert("description".into(), Value::String(description));
    }

    let saved = state.store.save(&game).await?;
    tracing::info!(
        "Created game {} ({}) with {} players, lifecycle {}",
        saved.game_id,
        saved.game_type,
        saved.players.len(),
        saved.lifecycle
    );

    engine.on_game_created(&saved);
    if saved.lifecycle == Lifecycle::Active {
        engine.on_game_started(&saved);
    }

    Ok(saved.with_ai_summary())
}

/// Join an existing game. Runs under the per-game lock; the repository CAS
/// is the second line of defense across processes.
pub async fn join_game(
    state: &AppState,
    game_id: Uuid,
    req: JoinGameRequest,
) -> Result<GameState, AppError> {
    state
        .locks
        .with_lock(game_id, || join_game_locked(state, game_id, req))
        .await
}

async fn join_game_locked(
    state: &AppState,
    game_id: Uuid,
    req: JoinGameRequest,
) -> Result<GameState, AppError> {
    let current = state
        .store
        .find_by_id(game_id)
        .await?
        .ok_or(AppError::GameNotFound(game_id))?;
    let engine = state
        .registry
        .get(&current.game_type)
        .ok_or_else(|| AppError::UnknownGameType(current.game_type.clone()))?;

    if current.players.len() >= engine.max_players() {
        return Err(AppError::GameFull);
    }
    if !matches!(
        current.lifecycle,
        Lifecycle::Created | Lifecycle::WaitingForPlayers | Lifecycle::Active
    ) {
        return Err(AppError::InvalidLifecycle(current.lifecycle));
    }
    if current.has_player(&req.player.id) {
        return Err(AppError::PlayerAlreadyPresent(req.player.id));
    }

    let mut player = Player::new(req.player.id, req.player.name);
    player.metadata = req.player.metadata;

    let mut next = current.clone();
    next.players.push(player.clone());

    let started = matches!(
        current.lifecycle,
        Lifecycle::Created | Lifecycle::WaitingForPlayers
    ) && next.players.len() >= engine.min_players();
    if started {
        next.lifecycle = Lifecycle::Active;
    }

    next.version = current.version + 1;
    next.updated_at = Utc::now();

    let stored = state.store.update(game_id, &next, current.version).await?;
    tracing::info!(
        "Player {} joined game {} ({} seats, lifecycle {})",
        player.id,
        game_id,
        stored.players.len(),
        stored.lifecycle
    );

    if started {
        engine.on_game_started(&stored);
    }
    engine.on_player_joined(&stored, &player);

    Ok(stored.with_ai_summary())
}

/// List games through the repository filters.
pub async fn list_games(
    state: &AppState,
    params: ListGamesParams,
) -> Result<PagedGames, AppError> {
    let mut paged = match &params.player_id {
        Some(player_id) => {
            state
                .store
                .find_by_player(player_id, &params.filter, params.page)
                .await?
        }
        None => state.store.find_all(&params.filter, params.page).await?,
    };
    paged.games = paged
        .games
        .into_iter()
        .map(GameState::with_ai_summary)
        .collect();
    Ok(paged)
}

pub async fn get_game(state: &AppState, game_id: Uuid) -> Result<GameState, AppError> {
    let game = state
        .store
        .find_by_id(game_id)
        .await?
        .ok_or(AppError::GameNotFound(game_id))?;
    Ok(game.with_ai_summary())
}
