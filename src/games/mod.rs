// Game engine infrastructure: the plugin contract and the type registry.
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{GameState, Move, Player};

pub mod registry;
pub mod tic_tac_toe;

pub use registry::{GameRegistry, GameTypeInfo, create_game_registry};

/// Outcome of a rule check. `reason` is set when the move is rejected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveValidity {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MoveValidity {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Rules contract a game type implements to plug into the server.
///
/// `validate_move` and `apply_move` must be pure: same input state, same
/// result. `apply_move` appends the move to `move_history` and advances the
/// turn itself whenever the game is not over; the pipeline never calls
/// `advance_turn` on its own. The lifecycle hooks default to no-ops.
pub trait GameEngine: Send + Sync {
    fn game_type(&self) -> &str;
    fn description(&self) -> &str;
    fn min_players(&self) -> usize;
    fn max_players(&self) -> usize;

    /// Construct the initial state: board, phase, seat 0 on turn, empty
    /// history. Managed fields are overlaid by the game manager afterwards.
    fn initialize_game(&self, players: &[Player], config: &Value) -> Result<GameState, AppError>;

    fn validate_move(&self, state: &GameState, player_id: &str, mv: &Move) -> MoveValidity;

    fn apply_move(&self, state: &GameState, player_id: &str, mv: &Move)
    -> Result<GameState, AppError>;

    fn is_game_over(&self, state: &GameState) -> bool;

    fn get_winner(&self, state: &GameState) -> Option<String>;

    /// Seat currently on turn, derived from `current_player_index`.
    fn current_player(&self, state: &GameState) -> Option<String> {
        state.current_player().map(|p| p.id.clone())
    }

    /// Cyclic increment modulo the seat count.
    fn advance_turn(&self, state: &GameState) -> GameState {
        let mut next = state.clone();
        if !next.players.is_empty() {
            next.current_player_index = (next.current_player_index + 1) % next.players.len();
        }
        next
    }

    /// Text description of the board, consumed by the renderer collaborator.
    fn render_board(&self, state: &GameState) -> Result<String, AppError>;

    // Lifecycle hooks
    fn on_game_created(&self, _state: &GameState) {}
    fn on_player_joined(&self, _state: &GameState, _player: &Player) {}
    fn on_game_started(&self, _state: &GameState) {}
    fn on_game_ended(&self, _state: &GameState) {}

    /// Fired with the pre-move state, before validation.
    fn before_apply_move(&self, _state: &GameState, _mv: &Move) {}

    /// Fired with both states once the move has been applied and persisted.
    fn after_apply_move(&self, _pre: &GameState, _post: &GameState, _mv: &Move) {}
}

/// Space ids for position-based boards are `"row,col"` strings; the random
/// AI strategy relies on this convention to enumerate candidate moves.
pub fn space_id(row: usize, col: usize) -> String {
    format!("{row},{col}")
}

pub fn parse_space_id(id: &str) -> Option<(usize, usize)> {
    let (row, col) = id.split_once(',')?;
    Some((row.trim().parse().ok()?, col.trim().parse().ok()?))
}
