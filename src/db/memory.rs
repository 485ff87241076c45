// In-memory game store: a map behind a mutex, for tests and single-node runs.
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::GameStore;
use crate::errors::AppError;
use crate::models::{GameFilter, GameState, Page, PagedGames};

#[derive(Default)]
pub struct InMemoryGameStore {
    games: Mutex<HashMap<Uuid, GameState>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_of(mut games: Vec<GameState>, page: Page) -> PagedGames {
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = games.len() as i64;
        let games = games
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();
        PagedGames {
            games,
            page: page.page,
            page_size: page.page_size,
            total,
        }
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn save(&self, state: &GameState) -> Result<GameState, AppError> {
        let mut games = self.games.lock().await;
        if games.contains_key(&state.game_id) {
            return Err(AppError::AlreadyExists(format!(
                "game {} already exists",
                state.game_id
            )));
        }
        games.insert(state.game_id, state.clone());
        Ok(state.clone())
    }

    async fn find_by_id(&self, game_id: Uuid) -> Result<Option<GameState>, AppError> {
        Ok(self.games.lock().await.get(&game_id).cloned())
    }

    async fn update(
        &self,
        game_id: Uuid,
        state: &GameState,
        expected_version: i64,
    ) -> Result<GameState, AppError> {
        let mut games = self.games.lock().await;
        let stored = games
            .get(&game_id)
            .ok_or(AppError::GameNotFound(game_id))?;
        if stored.version != expected_version {
            return Err(AppError::StaleState {
                expected: expected_version,
                stored: stored.version,
            });
        }
        if state.version <= expected_version {
            return Err(AppError::InternalError);
        }
        games.insert(game_id, state.clone());
        Ok(state.clone())
    }

    async fn find_by_player(
        &self,
        player_id: &str,
        filter: &GameFilter,
        page: Page,
    ) -> Result<PagedGames, AppError> {
        let games = self.games.lock().await;
        let matches: Vec<GameState> = games
            .values()
            .filter(|g| g.has_player(player_id) && filter.matches(g))
            .cloned()
            .collect();
        Ok(Self::page_of(matches, page))
    }

    async fn find_all(&self, filter: &GameFilter, page: Page) -> Result<PagedGames, AppError> {
        let games = self.games.lock().await;
        let matches: Vec<GameState> = games
            .values()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        Ok(Self::page_of(matches, page))
    }

    async fn delete(&self, game_id: Uuid) -> Result<(), AppError> {
        self.games.lock().await.remove(&game_id);
        Ok(())
    }
}
