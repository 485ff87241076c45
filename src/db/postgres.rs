// Durable game store backed by PostgreSQL.
//
// One row per game. The full aggregate lives in the `state` JSONB column;
// `game_type`, `lifecycle` and `winner` are extracted for indexed filtering.
// `update` is a single conditional statement so the version check and the
// write are atomic even across processes.
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::db::GameStore;
use crate::errors::AppError;
use crate::models::{GameFilter, GameState, Page, PagedGames};

pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, build the pool, and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(50)
            .min_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to run migrations: {e}")))?;

        Ok(Self::new(pool))
    }

    fn encode(state: &GameState) -> Result<Value, AppError> {
        serde_json::to_value(state).map_err(|e| AppError::Serialization(e.to_string()))
    }

    fn decode(value: Value) -> Result<GameState, AppError> {
        serde_json::from_value(value).map_err(|e| AppError::Serialization(e.to_string()))
    }

    fn decode_page(rows: Vec<Value>, total: i64, page: Page) -> Result<PagedGames, AppError> {
        let games = rows
            .into_iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PagedGames {
            games,
            page: page.page,
            page_size: page.page_size,
            total,
        })
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn save(&self, state: &GameState) -> Result<GameState, AppError> {
        let result = sqlx::query(
            "INSERT INTO games (game_id, game_type, lifecycle, winner, state, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(state.game_id)
        .bind(&state.game_type)
        .bind(state.lifecycle.as_str())
        .bind(state.winner.as_deref())
        .bind(Self::encode(state)?)
        .bind(state.version)
        .bind(state.created_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(state.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::AlreadyExists(format!("game {} already exists", state.game_id)),
            ),
            Err(e) => Err(AppError::DatabaseError(format!("Failed to save game: {e}"))),
        }
    }

    async fn find_by_id(&self, game_id: Uuid) -> Result<Option<GameState>, AppError> {
        let row = sqlx::query_scalar::<_, Value>("SELECT state FROM games WHERE game_id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to query game: {e}")))?;

        row.map(Self::decode).transpose()
    }

    async fn update(
        &self,
        game_id: Uuid,
        state: &GameState,
        expected_version: i64,
    ) -> Result<GameState, AppError> {
        if state.version <= expected_version {
            return Err(AppError::InternalError);
        }

        let result = sqlx::query(
            "UPDATE games
            SET game_type = $3, lifecycle = $4, winner = $5, state = $6, version = $7, updated_at = $8
            WHERE game_id = $1 AND version = $2",
        )
        .bind(game_id)
        .bind(expected_version)
        .bind(&state.game_type)
        .bind(state.lifecycle.as_str())
        .bind(state.winner.as_deref())
        .bind(Self::encode(state)?)
        .bind(state.version)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update game: {e}")))?;

        if result.rows_affected() == 0 {
            // Zero rows means the CAS lost or the game is gone; look at the
            // stored version to tell the two apart.
            let stored =
                sqlx::query_scalar::<_, i64>("SELECT version FROM games WHERE game_id = $1")
                    .bind(game_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| AppError::DatabaseError(format!("Failed to query version: {e}")))?;
            return match stored {
                Some(stored) => Err(AppError::StaleState {
                    expected: expected_version,
                    stored,
                }),
                None => Err(AppError::GameNotFound(game_id)),
            };
        }

        Ok(state.clone())
    }

    async fn find_by_player(
        &self,
        player_id: &str,
        filter: &GameFilter,
        page: Page,
    ) -> Result<PagedGames, AppError> {
        let lifecycle = filter.lifecycle.map(|l| l.as_str().to_string());

        let rows = sqlx::query_scalar::<_, Value>(
            "SELECT state FROM games
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(state->'players') AS p
                WHERE p->>'id' = $1
            )
            AND ($2::text IS NULL OR lifecycle = $2)
            AND ($3::text IS NULL OR game_type = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5",
        )
        .bind(player_id)
        .bind(&lifecycle)
        .bind(&filter.game_type)
        .bind(page.page_size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to query games by player: {e}")))?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM games
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(state->'players') AS p
                WHERE p->>'id' = $1
            )
            AND ($2::text IS NULL OR lifecycle = $2)
            AND ($3::text IS NULL OR game_type = $3)",
        )
        .bind(player_id)
        .bind(&lifecycle)
        .bind(&filter.game_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count games by player: {e}")))?;

        Self::decode_page(rows, total, page)
    }

    async fn find_all(&self, filter: &GameFilter, page: Page) -> Result<PagedGames, AppError> {
        let lifecycle = filter.lifecycle.map(|l| l.as_str().to_string());

        let rows = sqlx::query_scalar::<_, Value>(
            "SELECT state FROM games
            WHERE ($1::text IS NULL OR lifecycle = $1)
            AND ($2::text IS NULL OR game_type = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4",
        )
        .bind(&lifecycle)
        .bind(&filter.game_type)
        .bind(page.page_size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to query games: {e}")))?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM games
            WHERE ($1::text IS NULL OR lifecycle = $1)
            AND ($2::text IS NULL OR game_type = $2)",
        )
        .bind(&lifecycle)
        .bind(&filter.game_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count games: {e}")))?;

        Self::decode_page(rows, total, page)
    }

    async fn delete(&self, game_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM games WHERE game_id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete game: {e}")))?;
        Ok(())
    }
}
