use std::sync::Arc;

use crate::db::{GameStore, InMemoryGameStore, PgGameStore};
use crate::errors::AppError;
use crate::games::{GameRegistry, create_game_registry};
use crate::locks::GameLocks;
use crate::manager::AiDriver;
use crate::ws::SubscriberHub;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Optional: set for the durable Postgres store, unset for in-memory.
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3001);
        let database_url = std::env::var("DATABASE_URL").ok();

        Self { port, database_url }
    }
}

/// Shared application state: the registry, store, lock manager, hub, and AI
/// driver wired together once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<GameRegistry>,
    pub store: Arc<dyn GameStore>,
    pub locks: Arc<GameLocks>,
    pub hub: Arc<SubscriberHub>,
    pub ai: Arc<AiDriver>,
}

impl AppState {
    /// Create AppState from the environment, picking the game store by
    /// whether `DATABASE_URL` is configured.
    pub async fn new() -> Result<Self, AppError> {
        let config = AppConfig::from_env();

        let store: Arc<dyn GameStore> = match &config.database_url {
            Some(url) => {
                let store = PgGameStore::connect(url).await?;
                tracing::info!("Connected to PostgreSQL game store");
                Arc::new(store)
            }
            None => {
                tracing::info!("DATABASE_URL not set, using the in-memory game store");
                Arc::new(InMemoryGameStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    /// Assemble state around an existing store. Used by tests and by
    /// `new()` once the store choice is made.
    pub fn with_store(config: AppConfig, store: Arc<dyn GameStore>) -> Self {
        Self {
            config,
            registry: Arc::new(create_game_registry()),
            store,
            locks: Arc::new(GameLocks::new()),
            hub: Arc::new(SubscriberHub::new()),
            ai: Arc::new(AiDriver::new()),
        }
    }

    /// In-memory state for tests: no environment reads, no connections.
    pub fn for_tests() -> Self {
        Self::with_store(
            AppConfig {
                port: 0,
                database_url: None,
            },
            Arc::new(InMemoryGameStore::new()),
        )
    }
}
