// Core game aggregate: versioned state, players, moves, filters.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a game instance. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    Created,
    WaitingForPlayers,
    Active,
    Completed,
    Abandoned,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Created => "CREATED",
            Lifecycle::WaitingForPlayers => "WAITING_FOR_PLAYERS",
            Lifecycle::Active => "ACTIVE",
            Lifecycle::Completed => "COMPLETED",
            Lifecycle::Abandoned => "ABANDONED",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Lifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Lifecycle::Created),
            "WAITING_FOR_PLAYERS" => Ok(Lifecycle::WaitingForPlayers),
            "ACTIVE" => Ok(Lifecycle::Active),
            "COMPLETED" => Ok(Lifecycle::Completed),
            "ABANDONED" => Ok(Lifecycle::Abandoned),
            other => Err(format!("unknown lifecycle: {other}")),
        }
    }
}

/// A seat in a game. Seat order is turn order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            joined_at: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// `metadata.isAI == true` marks an AI-controlled seat.
    pub fn is_ai(&self) -> bool {
        self.metadata
            .get("isAI")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Strategy selected for an AI seat via `metadata.strategyId`.
    pub fn strategy_id(&self) -> Option<&str> {
        self.metadata.get("strategyId").and_then(Value::as_str)
    }
}

/// A validated, applied player action. History entries never mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub player_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Versioned aggregate root for a single game instance.
///
/// `board` and `metadata` are opaque to the core; engines own their shapes.
/// `version` increases strictly on every persisted mutation and backs the
/// repository's optimistic concurrency check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: Uuid,
    pub game_type: String,
    pub lifecycle: Lifecycle,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub phase: String,
    pub board: Value,
    pub move_history: Vec<Move>,
    pub winner: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameState {
    /// Fresh state with managed defaults; engines fill `board` and `phase`,
    /// the game manager overlays lifecycle and metadata.
    pub fn new(game_type: impl Into<String>, players: Vec<Player>) -> Self {
        let now = Utc::now();
        Self {
            game_id: Uuid::new_v4(),
            game_type: game_type.into(),
            lifecycle: Lifecycle::Created,
            players,
            current_player_index: 0,
            phase: "main".into(),
            board: Value::Null,
            move_history: Vec::new(),
            winner: None,
            metadata: Map::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    /// Seat currently on turn; meaningful only while `Active`.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn is_completed(&self) -> bool {
        self.lifecycle == Lifecycle::Completed
    }

    pub fn seat_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn ai_player_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_ai()).count()
    }

    /// Terminal transition: set winner and the `isDraw` marker.
    pub fn mark_completed(&mut self, winner: Option<String>) {
        self.metadata
            .insert("isDraw".into(), Value::Bool(winner.is_none()));
        self.winner = winner;
        self.lifecycle = Lifecycle::Completed;
    }

    /// Overlay AI summary metadata on states returned to callers.
    pub fn with_ai_summary(mut self) -> Self {
        let ai_count = self.ai_player_count();
        self.metadata
            .insert("hasAIPlayers".into(), Value::Bool(ai_count > 0));
        self.metadata
            .insert("aiPlayerCount".into(), Value::from(ai_count as u64));
        self
    }
}

/// Repository list filters. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub lifecycle: Option<Lifecycle>,
    pub game_type: Option<String>,
}

impl GameFilter {
    pub fn matches(&self, state: &GameState) -> bool {
        if let Some(lifecycle) = self.lifecycle {
            if state.lifecycle != lifecycle {
                return false;
            }
        }
        if let Some(game_type) = &self.game_type {
            if &state.game_type != game_type {
                return false;
            }
        }
        true
    }
}

/// 1-indexed pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: i64,
    pub page_size: i64,
}

impl Page {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// One page of repository results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedGames {
    pub games: Vec<GameState>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}
