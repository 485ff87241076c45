// Tic-tac-toe reference engine
//
// Rules:
// - 3x3 board, seat 0 plays 'X', seat 1 plays 'O'
// - A move places the seat's mark on an empty cell
// - Win: any of the 8 lines held by one owner
// - Draw: all 9 cells occupied with no line

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::games::{GameEngine, MoveValidity, space_id};
use crate::models::{GameState, Move, Player};

pub const GAME_TYPE: &str = "tic-tac-toe";

const SIZE: usize = 3;

const WIN_LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// A placed mark. `mark` is "X" or "O" by seat order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(rename = "type")]
    pub mark: String,
    pub owner_id: String,
}

/// Typed view of the engine-opaque `board` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Board {
    rows: usize,
    cols: usize,
    spaces: BTreeMap<String, Option<Token>>,
}

impl Board {
    fn empty() -> Self {
        let mut spaces = BTreeMap::new();
        for row in 0..SIZE {
            for col in 0..SIZE {
                spaces.insert(space_id(row, col), None);
            }
        }
        Self {
            rows: SIZE,
            cols: SIZE,
            spaces,
        }
    }

    fn from_value(value: &Value) -> Result<Self, AppError> {
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::Serialization(format!("malformed tic-tac-toe board: {e}")))
    }

    fn to_value(&self) -> Result<Value, AppError> {
        serde_json::to_value(self).map_err(|e| AppError::Serialization(e.to_string()))
    }

    fn get(&self, row: usize, col: usize) -> Option<&Token> {
        self.spaces.get(&space_id(row, col)).and_then(Option::as_ref)
    }

    fn set(&mut self, row: usize, col: usize, token: Token) {
        self.spaces.insert(space_id(row, col), Some(token));
    }

    fn is_full(&self) -> bool {
        self.spaces.values().all(Option::is_some)
    }

    fn line_owner(&self) -> Option<String> {
        for line in WIN_LINES {
            let [a, b, c] = line.map(|(row, col)| self.get(row, col));
            if let (Some(a), Some(b), Some(c)) = (a, b, c) {
                if a.owner_id == b.owner_id && b.owner_id == c.owner_id {
                    return Some(a.owner_id.clone());
                }
            }
        }
        None
    }
}

#[derive(Debug, Deserialize)]
struct PlaceParams {
    row: i64,
    col: i64,
}

fn parse_params(mv: &Move) -> Result<(usize, usize), String> {
    if mv.action != "place" {
        return Err(format!("unsupported action: {}", mv.action));
    }
    let params: PlaceParams = serde_json::from_value(mv.parameters.clone())
        .map_err(|_| "parameters must be {row, col}".to_string())?;
    if !(0..SIZE as i64).contains(&params.row) || !(0..SIZE as i64).contains(&params.col) {
        return Err(format!("({}, {}) is out of bounds", params.row, params.col));
    }
    Ok((params.row as usize, params.col as usize))
}

fn mark_for_seat(seat: usize) -> &'static str {
    if seat == 0 { "X" } else { "O" }
}

pub struct TicTacToe;

impl GameEngine for TicTacToe {
    fn game_type(&self) -> &str {
        GAME_TYPE
    }

    fn description(&self) -> &str {
        "Classic 3x3 tic-tac-toe for two players"
    }

    fn min_players(&self) -> usize {
        2
    }

    fn max_players(&self) -> usize {
        2
    }

    fn initialize_game(&self, players: &[Player], _config: &Value) -> Result<GameState, AppError> {
        let mut state = GameState::new(GAME_TYPE, players.to_vec());
        state.phase = "main".into();
        state.board = Board::empty().to_value()?;
        Ok(state)
    }

    fn validate_move(&self, state: &GameState, player_id: &str, mv: &Move) -> MoveValidity {
        if state.seat_index(player_id).is_none() {
            return MoveValidity::rejected(format!("player {player_id} is not seated"));
        }
        let (row, col) = match parse_params(mv) {
            Ok(cell) => cell,
            Err(reason) => return MoveValidity::rejected(reason),
        };
        let board = match Board::from_value(&state.board) {
            Ok(board) => board,
            Err(e) => return MoveValidity::rejected(e.to_string()),
        };
        if board.get(row, col).is_some() {
            return MoveValidity::rejected(format!("cell ({row}, {col}) is already occupied"));
        }
        MoveValidity::ok()
    }

    fn apply_move(
        &self,
        state: &GameState,
        player_id: &str,
        mv: &Move,
    ) -> Result<GameState, AppError> {
        let seat = state
            .seat_index(player_id)
            .ok_or_else(|| AppError::InvalidMove(format!("player {player_id} is not seated")))?;
        let (row, col) = parse_params(mv).map_err(AppError::InvalidMove)?;

        let mut board = Board::from_value(&state.board)?;
        if board.get(row, col).is_some() {
            return Err(AppError::InvalidMove(format!(
                "cell ({row}, {col}) is already occupied"
            )));
        }
        board.set(
            row,
            col,
            Token {
                mark: mark_for_seat(seat).into(),
                owner_id: player_id.to_string(),
            },
        );

        let mut next = state.clone();
        next.board = board.to_value()?;
        next.move_history.push(mv.clone());

        if !self.is_game_over(&next) {
            next = self.advance_turn(&next);
        }
        Ok(next)
    }

    fn is_game_over(&self, state: &GameState) -> bool {
        match Board::from_value(&state.board) {
            Ok(board) => board.line_owner().is_some() || board.is_full(),
            Err(_) => false,
        }
    }

    fn get_winner(&self, state: &GameState) -> Option<String> {
        Board::from_value(&state.board).ok()?.line_owner()
    }

    fn render_board(&self, state: &GameState) -> Result<String, AppError> {
        let board = Board::from_value(&state.board)?;
        let mut lines = Vec::with_capacity(SIZE * 2 - 1);
        for row in 0..SIZE {
            let cells: Vec<&str> = (0..SIZE)
                .map(|col| board.get(row, col).map(|t| t.mark.as_str()).unwrap_or("."))
                .collect();
            lines.push(format!(" {} ", cells.join(" | ")));
            if row + 1 < SIZE {
                lines.push("---+---+---".to_string());
            }
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn place(player_id: &str, row: usize, col: usize) -> Move {
        Move {
            player_id: player_id.into(),
            timestamp: Utc::now(),
            action: "place".into(),
            parameters: json!({"row": row, "col": col}),
        }
    }

    fn new_game() -> GameState {
        let players = vec![Player::new("A", "Alice"), Player::new("B", "Bob")];
        TicTacToe
            .initialize_game(&players, &Value::Null)
            .expect("init")
    }

    fn play(mut state: GameState, moves: &[(&str, usize, usize)]) -> GameState {
        for (player, row, col) in moves {
            let mv = place(player, *row, *col);
            let validity = TicTacToe.validate_move(&state, player, &mv);
            assert!(validity.valid, "rejected: {:?}", validity.reason);
            state = TicTacToe.apply_move(&state, player, &mv).expect("apply");
        }
        state
    }

    #[test]
    fn initial_board_is_empty() {
        let state = new_game();
        assert_eq!(state.current_player_index, 0);
        assert!(state.move_history.is_empty());
        let board = Board::from_value(&state.board).unwrap();
        assert_eq!(board.spaces.len(), 9);
        assert!(board.spaces.values().all(Option::is_none));
    }

    #[test]
    fn moves_place_tokens_and_toggle_turn() {
        let state = play(new_game(), &[("A", 1, 1)]);
        assert_eq!(state.current_player_index, 1);
        assert_eq!(state.move_history.len(), 1);

        let board = Board::from_value(&state.board).unwrap();
        let token = board.get(1, 1).unwrap();
        assert_eq!(token.mark, "X");
        assert_eq!(token.owner_id, "A");

        let state = play(state, &[("B", 0, 0)]);
        assert_eq!(state.current_player_index, 0);
        let board = Board::from_value(&state.board).unwrap();
        assert_eq!(board.get(0, 0).unwrap().mark, "O");
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let state = play(new_game(), &[("A", 1, 1)]);
        let mv = place("B", 1, 1);
        let validity = TicTacToe.validate_move(&state, "B", &mv);
        assert!(!validity.valid);
        assert!(validity.reason.unwrap().contains("occupied"));
        assert!(TicTacToe.apply_move(&state, "B", &mv).is_err());
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let state = new_game();
        let mv = Move {
            player_id: "A".into(),
            timestamp: Utc::now(),
            action: "place".into(),
            parameters: json!({"row": 3, "col": 0}),
        };
        assert!(!TicTacToe.validate_move(&state, "A", &mv).valid);

        let mv = Move {
            parameters: json!({"row": -1, "col": 0}),
            ..mv
        };
        assert!(!TicTacToe.validate_move(&state, "A", &mv).valid);
    }

    #[test]
    fn row_line_wins() {
        let state = play(
            new_game(),
            &[("A", 0, 0), ("B", 1, 0), ("A", 0, 1), ("B", 1, 1), ("A", 0, 2)],
        );
        assert!(TicTacToe.is_game_over(&state));
        assert_eq!(TicTacToe.get_winner(&state).as_deref(), Some("A"));
        // terminal move does not advance the turn
        assert_eq!(state.current_player_index, 0);
    }

    #[test]
    fn diagonal_line_wins() {
        let state = play(
            new_game(),
            &[("A", 0, 0), ("B", 0, 1), ("A", 1, 1), ("B", 0, 2), ("A", 2, 2)],
        );
        assert_eq!(TicTacToe.get_winner(&state).as_deref(), Some("A"));
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let state = play(
            new_game(),
            &[
                ("A", 0, 0),
                ("B", 0, 1),
                ("A", 0, 2),
                ("B", 1, 1),
                ("A", 1, 0),
                ("B", 1, 2),
                ("A", 2, 1),
                ("B", 2, 0),
                ("A", 2, 2),
            ],
        );
        assert!(TicTacToe.is_game_over(&state));
        assert_eq!(TicTacToe.get_winner(&state), None);
    }

    #[test]
    fn validate_and_apply_are_pure() {
        let state = play(new_game(), &[("A", 1, 1)]);
        let mv = place("B", 2, 2);

        let first = TicTacToe.validate_move(&state, "B", &mv);
        let second = TicTacToe.validate_move(&state, "B", &mv);
        assert_eq!(first.valid, second.valid);

        let applied_once = TicTacToe.apply_move(&state, "B", &mv).unwrap();
        let applied_twice = TicTacToe.apply_move(&state, "B", &mv).unwrap();
        assert_eq!(applied_once.board, applied_twice.board);
        assert_eq!(
            applied_once.current_player_index,
            applied_twice.current_player_index
        );
        assert_eq!(
            applied_once.move_history.len(),
            applied_twice.move_history.len()
        );
    }

    #[test]
    fn renders_marks_and_gaps() {
        let state = play(new_game(), &[("A", 1, 1), ("B", 0, 2)]);
        let rendered = TicTacToe.render_board(&state).unwrap();
        assert_eq!(rendered.lines().count(), 5);
        assert!(rendered.contains("X"));
        assert!(rendered.contains("O"));
        assert!(rendered.contains("."));
    }
}
