// Game registry - central place for game contributors to register their games
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::AppError;
use crate::games::{GameEngine, tic_tac_toe::TicTacToe};

/// Summary row returned by `list()` for game-type discovery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTypeInfo {
    pub tag: String,
    pub description: String,
    pub min_players: usize,
    pub max_players: usize,
}

/// Dispatch table from game-type tag to engine implementation.
///
/// Populated once at startup and shared read-only afterwards, so lookups on
/// the move path take no lock.
#[derive(Default)]
pub struct GameRegistry {
    engines: HashMap<String, Arc<dyn GameEngine>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine: Arc<dyn GameEngine>) -> Result<(), AppError> {
        let tag = engine.game_type().to_string();
        if self.engines.contains_key(&tag) {
            return Err(AppError::AlreadyRegistered(tag));
        }
        self.engines.insert(tag, engine);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn GameEngine>> {
        self.engines.get(tag).cloned()
    }

    pub fn list(&self) -> Vec<GameTypeInfo> {
        let mut types: Vec<GameTypeInfo> = self
            .engines
            .values()
            .map(|engine| GameTypeInfo {
                tag: engine.game_type().to_string(),
                description: engine.description().to_string(),
                min_players: engine.min_players(),
                max_players: engine.max_players(),
            })
            .collect();
        types.sort_by(|a, b| a.tag.cmp(&b.tag));
        types
    }
}

/// Initialize and return the game registry with all known game types.
///
/// Game contributors should add their engines here; registration is
/// centralized so new games never touch the core infrastructure.
pub fn create_game_registry() -> GameRegistry {
    let mut registry = GameRegistry::new();

    registry
        .register(Arc::new(TicTacToe))
        .expect("duplicate game type at startup");

    // Future games can be added here:
    // registry.register(Arc::new(YourGame))...

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_tic_tac_toe() {
        let registry = create_game_registry();
        let types = registry.list();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].tag, "tic-tac-toe");
        assert_eq!(types[0].min_players, 2);
        assert_eq!(types[0].max_players, 2);
        assert!(registry.get("tic-tac-toe").is_some());
        assert!(registry.get("chess").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = create_game_registry();
        let err = registry.register(Arc::new(TicTacToe)).unwrap_err();
        assert!(matches!(err, AppError::AlreadyRegistered(tag) if tag == "tic-tac-toe"));
    }
}
