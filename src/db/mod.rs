// Versioned game store abstraction and its two implementations.
use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{GameFilter, GameState, Page, PagedGames};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryGameStore;
pub use postgres::PgGameStore;

/// Versioned persistent store of game states.
///
/// `update` is the only mutation path for existing games and is a
/// compare-and-swap on `version`: it fails with [`AppError::StaleState`]
/// when the stored version differs from `expected_version`, and requires
/// the new version to be strictly greater. Combined with the per-game lock
/// upstream this gives monotone-version read-your-writes in process and
/// multi-process safety through the CAS.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Insert a new state; fails if the game id already exists.
    async fn save(&self, state: &GameState) -> Result<GameState, AppError>;

    async fn find_by_id(&self, game_id: Uuid) -> Result<Option<GameState>, AppError>;

    /// Atomic conditional replace keyed on `expected_version`.
    async fn update(
        &self,
        game_id: Uuid,
        state: &GameState,
        expected_version: i64,
    ) -> Result<GameState, AppError>;

    async fn find_by_player(
        &self,
        player_id: &str,
        filter: &GameFilter,
        page: Page,
    ) -> Result<PagedGames, AppError>;

    async fn find_all(&self, filter: &GameFilter, page: Page) -> Result<PagedGames, AppError>;

    async fn delete(&self, game_id: Uuid) -> Result<(), AppError>;
}
