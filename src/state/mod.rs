//! State management module for Gravity Four.
//!
//! This module provides the rules engine and the managers holding live games:
//!
//! - `board` - Grid, obstacles and the drop rule
//! - `rules` - Turn order and gravity inversion
//! - `evaluator` - Win and draw detection
//! - `opponent` - Heuristic computer player
//! - `game` - One game with scores, names and mode
//! - `session` - Local games keyed by browser token
//! - `lobby` - Shared online games keyed by code, with chat and rematch
//! - `store` - Serialized access to all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Store (one mutex)                        │
//! │                                                              │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │                      AppState                        │   │
//! │   │                                                      │   │
//! │   │  ┌─────────────────┐        ┌─────────────────┐      │   │
//! │   │  │ SessionManager  │        │  LobbyManager   │      │   │
//! │   │  │                 │        │                 │      │   │
//! │   │  │ token →         │        │ code →          │      │   │
//! │   │  │   Session       │        │   Lobby         │      │   │
//! │   │  │     GameState   │        │     GameState   │      │   │
//! │   │  │                 │        │     ChatLog     │      │   │
//! │   │  └─────────────────┘        └─────────────────┘      │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use gravity_four_state::config::GameConfig;
//! use gravity_four_state::state::{AppState, GameState};
//!
//! let mut app = AppState::new();
//! let token = app.sessions.create(GameState::new(GameConfig::classic())).token.clone();
//!
//! let session = app.sessions.get_mut(&token).unwrap();
//! let applied = session.game.apply_move(3).unwrap();
//! assert_eq!((applied.row, applied.col), (5, 3));
//! ```

pub mod board;
pub mod evaluator;
pub mod game;
pub mod lobby;
pub mod opponent;
pub mod rules;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use board::{Board, Cell, Position, Side};
pub use game::{AppliedMove, GameMode, GameState, MoveRejection, Names, Outcome, Scores};
pub use lobby::{
    ChatLimits, ChatMessage, Lobby, LobbyError, LobbyManager, LobbySnapshot, RematchStatus,
};
pub use rules::{TurnState, GRAVITY_PERIOD};
pub use session::{Session, SessionError, SessionManager};
pub use store::{InMemoryStore, Store};

/// Combined application state.
#[derive(Debug, Default)]
pub struct AppState {
    pub sessions: SessionManager,
    pub lobbies: LobbyManager,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop sessions and lobbies idle for longer than `timeout`.
    pub fn evict_idle(
        &mut self,
        now: chrono::DateTime<chrono::Utc>,
        timeout: chrono::Duration,
    ) -> CleanupResult {
        CleanupResult {
            expired_sessions: self.sessions.evict_idle(now, timeout),
            expired_lobbies: self.lobbies.evict_idle(now, timeout),
        }
    }
}

/// Result of cleanup operation.
#[derive(Debug, Default)]
pub struct CleanupResult {
    pub expired_sessions: Vec<String>,
    pub expired_lobbies: Vec<String>,
}

impl CleanupResult {
    pub fn is_empty(&self) -> bool {
        self.expired_sessions.is_empty() && self.expired_lobbies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_app_state_evict_idle() {
        let mut state = AppState::new();
        state.sessions.create(GameState::new(GameConfig::classic()));
        state
            .lobbies
            .create(GameState::new(GameConfig::classic()), Some("WXYZ"))
            .unwrap();

        let timeout = chrono::Duration::hours(1);
        assert!(state.evict_idle(chrono::Utc::now(), timeout).is_empty());

        let later = chrono::Utc::now() + chrono::Duration::hours(3);
        let result = state.evict_idle(later, timeout);
        assert_eq!(result.expired_sessions.len(), 1);
        assert_eq!(result.expired_lobbies, vec!["WXYZ".to_string()]);
        assert_eq!(state.sessions.count() + state.lobbies.count(), 0);
    }
}
