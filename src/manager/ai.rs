// AI driver: strategy registry, per-seat selection, bounded move synthesis.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};

use crate::errors::AppError;
use crate::games::{GameEngine, parse_space_id};
use crate::models::{GameState, Move, Player};

pub const DEFAULT_STRATEGY: &str = "random";

const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(500);

/// Decision function for an AI seat.
///
/// `generate_move` may fail with [`AppError::NoLegalMove`]; the driver also
/// converts an exceeded time budget into `NoLegalMove`, which ends the AI
/// chain without advancing the turn.
#[async_trait]
pub trait AiStrategy: Send + Sync {
    fn strategy_id(&self) -> &str;

    /// Advisory budget for one decision.
    fn time_budget(&self) -> Duration {
        DEFAULT_TIME_BUDGET
    }

    async fn generate_move(
        &self,
        engine: &dyn GameEngine,
        state: &GameState,
        player_id: &str,
    ) -> Result<Move, AppError>;
}

/// Fallback strategy for position-based games: enumerate empty spaces,
/// keep the ones the engine validates, pick uniformly at random.
pub struct RandomStrategy;

#[async_trait]
impl AiStrategy for RandomStrategy {
    fn strategy_id(&self) -> &str {
        DEFAULT_STRATEGY
    }

    async fn generate_move(
        &self,
        engine: &dyn GameEngine,
        state: &GameState,
        player_id: &str,
    ) -> Result<Move, AppError> {
        let spaces = state
            .board
            .get("spaces")
            .and_then(Value::as_object)
            .ok_or(AppError::NoLegalMove)?;

        let mut candidates = Vec::new();
        for (id, cell) in spaces {
            if !cell.is_null() {
                continue;
            }
            let Some((row, col)) = parse_space_id(id) else {
                continue;
            };
            let mv = Move {
                player_id: player_id.to_string(),
                timestamp: Utc::now(),
                action: "place".into(),
                parameters: json!({"row": row, "col": col}),
            };
            if engine.validate_move(state, player_id, &mv).valid {
                candidates.push(mv);
            }
        }

        if candidates.is_empty() {
            return Err(AppError::NoLegalMove);
        }
        let idx = rand::rng().random_range(0..candidates.len());
        Ok(candidates.swap_remove(idx))
    }
}

/// Registry of strategies plus the bounded-generation entry point used by
/// the move pipeline's AI chain.
pub struct AiDriver {
    strategies: HashMap<String, Arc<dyn AiStrategy>>,
}

impl AiDriver {
    pub fn new() -> Self {
        let mut driver = Self {
            strategies: HashMap::new(),
        };
        driver.register(Arc::new(RandomStrategy));
        driver
    }

    pub fn register(&mut self, strategy: Arc<dyn AiStrategy>) {
        self.strategies
            .insert(strategy.strategy_id().to_string(), strategy);
    }

    /// Strategy bound to the seat via `metadata.strategyId`, falling back to
    /// the default when the id is missing or unknown.
    fn strategy_for(&self, player: &Player) -> Arc<dyn AiStrategy> {
        let id = player.strategy_id().unwrap_or(DEFAULT_STRATEGY);
        match self.strategies.get(id) {
            Some(strategy) => strategy.clone(),
            None => {
                tracing::warn!(
                    "Unknown strategy '{}' for player {}, falling back to {}",
                    id,
                    player.id,
                    DEFAULT_STRATEGY
                );
                self.strategies
                    .get(DEFAULT_STRATEGY)
                    .expect("default strategy is always registered")
                    .clone()
            }
        }
    }

    /// Synthesize a move for the AI seat, bounded by the strategy's time
    /// budget.
    pub async fn generate_move(
        &self,
        engine: &dyn GameEngine,
        state: &GameState,
        player_id: &str,
    ) -> Result<Move, AppError> {
        let player = state
            .player(player_id)
            .ok_or_else(|| AppError::UnauthorizedMove(format!("{player_id} is not seated")))?;
        let strategy = self.strategy_for(player);

        match tokio::time::timeout(
            strategy.time_budget(),
            strategy.generate_move(engine, state, player_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Strategy {} exceeded its {}ms budget for player {}",
                    strategy.strategy_id(),
                    strategy.time_budget().as_millis(),
                    player_id
                );
                Err(AppError::NoLegalMove)
            }
        }
    }
}

impl Default for AiDriver {
    fn default() -> Self {
        Self::new()
    }
}
