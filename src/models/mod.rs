pub mod event;
pub mod game;

pub use event::GameEvent;
pub use game::{GameFilter, GameState, Lifecycle, Move, Page, PagedGames, Player};
