// State manager: the move-submission pipeline.
//
// Everything between loading a game and persisting its successor runs
// inside the per-game lock, including the AI chain, so per-game operations
// are totally ordered and the repository CAS almost never fires in-process.
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::games::{GameEngine, MoveValidity};
use crate::models::{GameEvent, GameState, Move};
use crate::state::AppState;

/// Upper bound on consecutive AI turns driven inside one submission.
/// Defense in depth against a plugin whose turn order cycles through AI
/// seats without progress.
pub const MAX_AI_ITERATIONS: usize = 10;

/// Body of `POST /api/games/{id}/moves` and its validate-only sibling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub player_id: String,
    pub action: String,
    #[serde(default)]
    pub parameters: Value,
    pub expected_version: i64,
}

/// Submit a move: lock, load, authorize, validate, apply, persist, publish,
/// then drive any consecutive AI turns. Returns the final persisted state.
pub async fn apply_move(
    state: &AppState,
    game_id: Uuid,
    req: MoveRequest,
) -> Result<GameState, AppError> {
    state
        .locks
        .with_lock(game_id, || apply_move_locked(state, game_id, req))
        .await
}

/// Advisory rule check. Read-only, so it takes no lock.
pub async fn validate_move(
    state: &AppState,
    game_id: Uuid,
    req: MoveRequest,
) -> Result<MoveValidity, AppError> {
    let current = state
        .store
        .find_by_id(game_id)
        .await?
        .ok_or(AppError::GameNotFound(game_id))?;
    let engine = state
        .registry
        .get(&current.game_type)
        .ok_or_else(|| AppError::UnknownGameType(current.game_type.clone()))?;

    let mv = Move {
        player_id: req.player_id.clone(),
        timestamp: Utc::now(),
        action: req.action,
        parameters: req.parameters,
    };
    Ok(engine.validate_move(&current, &req.player_id, &mv))
}

async fn apply_move_locked(
    state: &AppState,
    game_id: Uuid,
    req: MoveRequest,
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

    // Lifecycle gate
    if current.is_completed() {
        return Err(AppError::InvalidMove("Game already completed".into()));
    }
    if !current.is_active() {
        return Err(AppError::InvalidMove(format!(
            "Game is {}, not ACTIVE",
            current.lifecycle
        )));
    }

    // Version gate: a concurrent writer got here first.
    if req.expected_version != current.version {
        return Err(AppError::StaleState {
            expected: req.expected_version,
            stored: current.version,
        });
    }

    // Authorization: membership, then turn
    if !current.has_player(&req.player_id) {
        return Err(AppError::UnauthorizedMove(format!(
            "Player {} is not part of this game",
            req.player_id
        )));
    }
    let on_turn = engine.current_player(&current);
    if on_turn.as_deref() != Some(req.player_id.as_str()) {
        return Err(AppError::UnauthorizedMove(format!(
            "It is not player {}'s turn",
            req.player_id
        )));
    }

    // Enrich with the authoritative player id and server timestamp.
    let mv = Move {
        player_id: req.player_id,
        timestamp: Utc::now(),
        action: req.action,
        parameters: req.parameters,
    };

    let persisted = commit_move(state, engine.as_ref(), &current, &mv).await?;
    tracing::info!(
        "Move applied to game {}: {} by {}, version {} -> {}",
        game_id,
        mv.action,
        mv.player_id,
        current.version,
        persisted.version
    );

    publish_update(state, &persisted, false).await;
    engine.after_apply_move(&current, &persisted, &mv);

    if persisted.is_completed() {
        engine.on_game_ended(&persisted);
        publish_complete(state, &persisted).await;
        return Ok(persisted);
    }

    Ok(run_ai_chain(state, &engine, persisted).await)
}

/// Validate, apply, mark completion, and persist one move under the
/// caller-held lock. Shared by the human path and the AI chain.
async fn commit_move(
    state: &AppState,
    engine: &dyn GameEngine,
    current: &GameState,
    mv: &Move,
) -> Result<GameState, AppError> {
    engine.before_apply_move(current, mv);

    let validity = engine.validate_move(current, &mv.player_id, mv);
    if !validity.valid {
        return Err(AppError::InvalidMove(
            validity.reason.unwrap_or_else(|| "Move rejected".into()),
        ));
    }

    let mut next = engine.apply_move(current, &mv.player_id, mv)?;

    if engine.is_game_over(&next) {
        let winner = engine.get_winner(&next);
        next.mark_completed(winner);
    }

    next.updated_at = Utc::now();
    next.version = current.version + 1;

    state.store.update(current.game_id, &next, current.version).await
}

/// Drive consecutive AI seats forward until a human is on turn, the game
/// ends, a strategy gives up, or the iteration cap is hit. Runs inside the
/// same lock as the triggering move; an AI failure never rolls the human's
/// move back.
async fn run_ai_chain(
    state: &AppState,
    engine: &std::sync::Arc<dyn GameEngine>,
    persisted: GameState,
) -> GameState {
    let game_id = persisted.game_id;
    let mut latest = persisted;

    for iteration in 0..MAX_AI_ITERATIONS {
        if !latest.is_active() {
            break;
        }
        let Some(player_id) = engine.current_player(&latest) else {
            break;
        };
        let is_ai = latest.player(&player_id).is_some_and(|p| p.is_ai());
        if !is_ai {
            break;
        }

        let mv = match state.ai.generate_move(engine.as_ref(), &latest, &player_id).await {
            Ok(mv) => mv,
            Err(e) => {
                tracing::warn!(
                    "AI chain for game {} stopped at iteration {}: {}",
                    game_id,
                    iteration,
                    e
                );
                break;
            }
        };

        if let Err(e) = commit_move(state, engine.as_ref(), &latest, &mv).await {
            tracing::warn!(
                "AI move failed for game {} at iteration {}: {}",
                game_id,
                iteration,
                e
            );
            break;
        }

        // Re-load; the store, not the in-memory copy, is the source of truth.
        latest = match state.store.find_by_id(game_id).await {
            Ok(Some(reloaded)) => reloaded,
            Ok(None) | Err(_) => {
                tracing::error!("Game {} vanished mid AI chain", game_id);
                break;
            }
        };

        if latest.is_completed() {
            engine.on_game_ended(&latest);
            publish_complete(state, &latest).await;
            break;
        }

        publish_update(state, &latest, true).await;
    }

    latest
}

async fn publish_update(state: &AppState, game: &GameState, last_move_by_ai: bool) {
    state
        .hub
        .broadcast_to_game(game.game_id, &GameEvent::update(game, last_move_by_ai))
        .await;

    if game.is_active() {
        if let Some(current) = game.current_player() {
            state
                .hub
                .broadcast_to_game(
                    game.game_id,
                    &GameEvent::turn_notification(game, current.id.clone()),
                )
                .await;
        }
    }
}

async fn publish_complete(state: &AppState, game: &GameState) {
    state
        .hub
        .broadcast_to_game(game.game_id, &GameEvent::complete(game))
        .await;
}
