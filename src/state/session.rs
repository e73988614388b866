//! Session state management.
//!
//! A session binds an opaque browser token to one local game. Tokens are
//! random, carry no meaning, and are adopted if a client presents a
//! well-formed token the server has forgotten.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use super::game::GameState;

/// Random bytes per session token.
pub const TOKEN_BYTES: usize = 16;

/// Generate a new session token (hex encoded).
pub fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check if `token` looks like something [`new_token`] produced.
pub fn is_valid_token(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
}

/// One browser's local game.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub game: GameState,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// Last request seen for this session
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, game: GameState) -> Self {
        let now = Utc::now();
        Self {
            token,
            game,
            created_at: now,
            last_activity: now,
        }
    }

    /// Record activity.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Get time since last activity.
    pub fn idle_time(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }
}

/// Session manager - tracks all local games by token.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<String, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session, replacing any session with the same token.
    pub fn add(&mut self, session: Session) {
        self.sessions.insert(session.token.clone(), session);
    }

    /// Start a session under a fresh token.
    pub fn create(&mut self, game: GameState) -> &mut Session {
        let token = new_token();
        self.sessions
            .entry(token.clone())
            .or_insert_with(|| Session::new(token, game))
    }

    /// Resolve the token a client presented.
    ///
    /// Known tokens return their session. Unknown but well-formed tokens
    /// are adopted; anything else gets a fresh token. The flag is `true`
    /// when a session was created.
    pub fn get_or_create(
        &mut self,
        token: Option<&str>,
        make_game: impl FnOnce() -> GameState,
    ) -> (&mut Session, bool) {
        let token = match token {
            Some(t) if is_valid_token(t) => t.to_string(),
            _ => new_token(),
        };

        let mut created = false;
        let session = self.sessions.entry(token.clone()).or_insert_with(|| {
            created = true;
            Session::new(token, make_game())
        });
        if !created {
            session.touch();
        }
        (session, created)
    }

    /// Get a session by token.
    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    /// Get a mutable session by token, recording activity.
    pub fn get_mut(&mut self, token: &str) -> Option<&mut Session> {
        let session = self.sessions.get_mut(token)?;
        session.touch();
        Some(session)
    }

    /// Like [`SessionManager::get_mut`] but with a typed error.
    pub fn require_mut(&mut self, token: &str) -> Result<&mut Session, SessionError> {
        self.get_mut(token)
            .ok_or_else(|| SessionError::NotFound(token.to_string()))
    }

    /// Remove a session.
    pub fn remove(&mut self, token: &str) -> Option<Session> {
        self.sessions.remove(token)
    }

    /// Remove sessions idle for longer than `timeout`.
    /// Returns the evicted tokens.
    pub fn evict_idle(&mut self, now: DateTime<Utc>, timeout: chrono::Duration) -> Vec<String> {
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.idle_time(now) > timeout)
            .map(|(token, _)| token.clone())
            .collect();

        for token in &idle {
            self.sessions.remove(token);
        }

        idle
    }

    /// Count tracked sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use pretty_assertions::assert_eq;

    fn game() -> GameState {
        GameState::new(GameConfig::classic())
    }

    #[test]
    fn test_token_format() {
        let token = new_token();
        assert_eq!(token.len(), 32);
        assert!(is_valid_token(&token));
        assert_ne!(token, new_token());

        assert!(!is_valid_token("abc"));
        assert!(!is_valid_token(&"G".repeat(32)));
        assert!(!is_valid_token(&"A".repeat(32)));
    }

    #[test]
    fn test_create_and_get() {
        let mut manager = SessionManager::new();
        let token = manager.create(game()).token.clone();
        assert_eq!(manager.count(), 1);
        assert!(manager.get(&token).is_some());
        assert!(manager.get("missing").is_none());
        assert_eq!(
            manager.require_mut("missing").err(),
            Some(SessionError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_get_or_create_reuses_known_token() {
        let mut manager = SessionManager::new();
        let token = manager.create(game()).token.clone();
        manager.get_mut(&token).unwrap().game.apply_move(3).unwrap();

        let (session, created) = manager.get_or_create(Some(token.as_str()), game);
        assert!(!created);
        assert_eq!(session.game.turn_count(), 1);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_get_or_create_adopts_well_formed_token() {
        let mut manager = SessionManager::new();
        let token = "0123456789abcdef0123456789abcdef";
        let (session, created) = manager.get_or_create(Some(token), game);
        assert!(created);
        assert_eq!(session.token, token);
    }

    #[test]
    fn test_get_or_create_replaces_malformed_token() {
        let mut manager = SessionManager::new();
        for bad in [None, Some(""), Some("not-a-token")] {
            let (session, created) = manager.get_or_create(bad, game);
            assert!(created);
            assert!(is_valid_token(&session.token));
        }
        assert_eq!(manager.count(), 3);
    }

    #[test]
    fn test_evict_idle() {
        let mut manager = SessionManager::new();
        let token = manager.create(game()).token.clone();
        let timeout = chrono::Duration::minutes(30);

        assert!(manager.evict_idle(Utc::now(), timeout).is_empty());
        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(manager.evict_idle(later, timeout), vec![token]);
        assert_eq!(manager.count(), 0);
    }
}
