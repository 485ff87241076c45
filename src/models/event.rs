// Push events published by the move pipeline and consumed by subscribers.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{GameState, Player};

/// Server -> client push frames, discriminated by `type`.
///
/// Delivery is best-effort: a failed send never fails the move that
/// produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    #[serde(rename = "GAME_UPDATE", rename_all = "camelCase")]
    GameUpdate {
        game_id: Uuid,
        game_state: GameState,
        #[serde(rename = "lastMoveByAI")]
        last_move_by_ai: bool,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "GAME_COMPLETE", rename_all = "camelCase")]
    GameComplete {
        game_id: Uuid,
        winner: Option<String>,
        #[serde(rename = "winnerIsAI")]
        winner_is_ai: bool,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "TURN_NOTIFICATION", rename_all = "camelCase")]
    TurnNotification {
        game_id: Uuid,
        current_player: String,
        timestamp: DateTime<Utc>,
    },
}

impl GameEvent {
    pub fn update(state: &GameState, last_move_by_ai: bool) -> Self {
        GameEvent::GameUpdate {
            game_id: state.game_id,
            game_state: state.clone(),
            last_move_by_ai,
            timestamp: Utc::now(),
        }
    }

    pub fn complete(state: &GameState) -> Self {
        let winner_is_ai = state
            .winner
            .as_deref()
            .and_then(|id| state.player(id))
            .map(Player::is_ai)
            .unwrap_or(false);
        GameEvent::GameComplete {
            game_id: state.game_id,
            winner: state.winner.clone(),
            winner_is_ai,
            timestamp: Utc::now(),
        }
    }

    pub fn turn_notification(state: &GameState, current_player: impl Into<String>) -> Self {
        GameEvent::TurnNotification {
            game_id: state.game_id,
            current_player: current_player.into(),
            timestamp: Utc::now(),
        }
    }
}
