//! Request-level operations.
//!
//! [`GameService`] is what a transport (HTTP handlers, a socket loop, a test)
//! talks to. Every call is one [`Store::transact`], so each operation
//! observes and leaves behind a consistent [`AppState`](crate::state::AppState).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{GameConfig, ServiceConfig};
use crate::error::{ConfigError, CoreError};
use crate::state::board::Side;
use crate::state::game::{AppliedMove, GameMode, GameState, MoveRejection};
use crate::state::lobby::{
    clean_text, normalize_code, ChatLimits, ChatMessage, Lobby, LobbyError, LobbySnapshot,
    RematchStatus,
};
use crate::state::store::{InMemoryStore, Store};
use crate::state::CleanupResult;
use crate::view::GameView;

/// A session as handed back to the caller.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub token: String,
    /// `true` when the session did not exist before this call
    pub created: bool,
    pub game: GameState,
}

/// Moves applied by one `play` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub player: AppliedMove,
    /// The computer's answer in [`GameMode::VsComputer`]
    pub computer: Option<AppliedMove>,
    pub game_over: bool,
}

/// Local and online game operations over a [`Store`].
#[derive(Debug, Clone)]
pub struct GameService<S = InMemoryStore> {
    store: S,
    config: ServiceConfig,
}

impl GameService<InMemoryStore> {
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        Self::with_store(InMemoryStore::new(), config)
    }
}

impl Default for GameService<InMemoryStore> {
    fn default() -> Self {
        Self {
            store: InMemoryStore::new(),
            config: ServiceConfig::default(),
        }
    }
}

impl<S: Store> GameService<S> {
    /// Wrap `store`, rejecting an invalid `config`.
    pub fn with_store(store: S, config: ServiceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn chat_limits(&self) -> ChatLimits {
        ChatLimits {
            history: self.config.chat_history_limit,
            max_len: self.config.chat_max_len,
            name_max_len: self.config.name_max_len,
        }
    }

    fn clean_name(&self, name: Option<&str>) -> Option<String> {
        name.map(|n| clean_text(n, self.config.name_max_len))
            .filter(|n| !n.is_empty())
    }

    fn new_game(&self) -> GameState {
        let mut game = GameState::new(self.config.game_config());
        if self.config.computer_opponent {
            game.mode = GameMode::VsComputer;
        }
        game
    }

    // ---- Local sessions ----

    /// Start a session under a fresh token.
    pub fn new_session(&self) -> SessionHandle {
        let game = self.new_game();
        let handle = self.store.transact(|state| {
            let session = state.sessions.create(game);
            SessionHandle {
                token: session.token.clone(),
                created: true,
                game: session.game.clone(),
            }
        });
        info!(token = %handle.token, "session created");
        handle
    }

    /// Resolve the token a client presented, creating a session if needed.
    pub fn get_or_create_session(&self, token: Option<&str>) -> SessionHandle {
        let handle = self.store.transact(|state| {
            let (session, created) = state.sessions.get_or_create(token, || self.new_game());
            SessionHandle {
                token: session.token.clone(),
                created,
                game: session.game.clone(),
            }
        });
        if handle.created {
            info!(token = %handle.token, "session created");
        }
        handle
    }

    pub fn session_view(&self, token: &str) -> Result<GameView, CoreError> {
        self.store.transact(|state| -> Result<GameView, CoreError> {
            let session = state.sessions.require_mut(token)?;
            Ok(GameView::from_game(&session.game))
        })
    }

    /// Drop a piece in a local game; the computer answers when it is its turn.
    #[instrument(skip(self))]
    pub fn play(&self, token: &str, col: usize) -> Result<TurnReport, CoreError> {
        let report = self.store.transact(|state| -> Result<TurnReport, CoreError> {
            let game = &mut state.sessions.require_mut(token)?.game;
            if game.mode.computer_side() == Some(game.current()) {
                return Err(MoveRejection::NotYourTurn(game.current().opponent()).into());
            }

            let player = game.apply_move(col)?;
            let computer = match game.mode.computer_side() {
                Some(side) if !game.is_over() && game.current() == side => {
                    game.apply_computer_move()
                }
                _ => None,
            };
            Ok(TurnReport {
                player,
                computer,
                game_over: game.is_over(),
            })
        })
        .map_err(|err| {
            warn!(%err, "move rejected");
            err
        })?;

        debug!(row = report.player.row, col = report.player.col, side = %report.player.side, "move applied");
        if let Some(reply) = report.computer {
            debug!(row = reply.row, col = reply.col, "computer replied");
        }
        if report.game_over {
            info!(token, "local game finished");
        }
        Ok(report)
    }

    /// Start over with `config` (or the service default): board, scores,
    /// names and mode are all reset.
    pub fn reset_game(&self, token: &str, config: Option<GameConfig>) -> Result<GameView, CoreError> {
        let config = match config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => self.config.game_config(),
        };
        self.store.transact(|state| -> Result<GameView, CoreError> {
            let game = &mut state.sessions.require_mut(token)?.game;
            game.reset(config);
            if self.config.computer_opponent {
                game.mode = GameMode::VsComputer;
            }
            Ok(GameView::from_game(game))
        })
    }

    /// New round with the same configuration and freshly placed obstacles;
    /// scores, names and mode survive.
    pub fn replay_keeping_score(&self, token: &str) -> Result<GameView, CoreError> {
        self.store.transact(|state| -> Result<GameView, CoreError> {
            let game = &mut state.sessions.require_mut(token)?.game;
            game.replay_keeping_score();
            Ok(GameView::from_game(game))
        })
    }

    /// Switch between two-player and computer play. The round restarts.
    pub fn set_mode(&self, token: &str, mode: GameMode) -> Result<GameView, CoreError> {
        self.store.transact(|state| -> Result<GameView, CoreError> {
            let game = &mut state.sessions.require_mut(token)?.game;
            game.set_mode(mode);
            Ok(GameView::from_game(game))
        })
    }

    /// Rename either side; empty names keep the old one.
    pub fn set_names(
        &self,
        token: &str,
        red: Option<&str>,
        yellow: Option<&str>,
    ) -> Result<GameView, CoreError> {
        let red = self.clean_name(red);
        let yellow = self.clean_name(yellow);
        self.store.transact(|state| -> Result<GameView, CoreError> {
            let game = &mut state.sessions.require_mut(token)?.game;
            if let Some(name) = red {
                game.names.set(Side::Red, name);
            }
            if let Some(name) = yellow {
                game.names.set(Side::Yellow, name);
            }
            Ok(GameView::from_game(game))
        })
    }

    // ---- Online lobbies ----

    /// Open a lobby seated with red, under `preferred_code` or a random code.
    #[instrument(skip(self, config))]
    pub fn create_lobby(
        &self,
        config: Option<GameConfig>,
        preferred_code: Option<&str>,
        name: Option<&str>,
    ) -> Result<LobbySnapshot, CoreError> {
        let config = config.unwrap_or_else(|| self.config.game_config());
        config.validate()?;

        let mut game = GameState::new(config);
        if let Some(name) = self.clean_name(name) {
            game.names.set(Side::Red, name);
        }
        let snapshot = self
            .store
            .transact(|state| state.lobbies.create(game, preferred_code).map(|l| l.snapshot()))?;

        info!(code = %snapshot.code, "lobby created");
        Ok(snapshot)
    }

    /// Take the yellow seat. Joining a full lobby changes nothing.
    pub fn join_lobby(&self, code: &str, name: Option<&str>) -> Result<LobbySnapshot, CoreError> {
        let name = self.clean_name(name);
        let snapshot = self
            .store
            .transact(|state| state.lobbies.join(code, name).map(|l| l.snapshot()))?;
        info!(code = %snapshot.code, "lobby joined");
        Ok(snapshot)
    }

    /// Apply `side`'s move in a lobby. Turn check and drop happen under one
    /// lock, so of two racing requests for the same turn only one succeeds.
    #[instrument(skip(self))]
    pub fn apply_online_move(&self, code: &str, side: Side, col: usize) -> Result<AppliedMove, CoreError> {
        let applied = self
            .store
            .transact(|state| state.lobbies.apply_move(code, side, col))
            .map_err(|err| {
                warn!(code, %err, "online move rejected");
                err
            })?;
        debug!(row = applied.row, col = applied.col, "online move applied");
        if applied.won || applied.draw {
            info!(code, won = applied.won, "online game finished");
        }
        Ok(applied)
    }

    pub fn post_chat(
        &self,
        code: &str,
        side: Side,
        name: Option<&str>,
        text: &str,
    ) -> Result<ChatMessage, CoreError> {
        let limits = self.chat_limits();
        let message = self
            .store
            .transact(|state| state.lobbies.post_chat(code, side, name, text, limits))?;
        debug!(code, id = message.id, "chat posted");
        Ok(message)
    }

    /// Chat messages with an id above `since_id`. Unknown lobbies have none.
    /// Polling counts as activity.
    pub fn fetch_chat_since(&self, code: &str, since_id: u64) -> Vec<ChatMessage> {
        self.store.transact(|state| {
            state
                .lobbies
                .touch(code)
                .map(|lobby| lobby.messages_since(since_id))
                .unwrap_or_default()
        })
    }

    pub fn vote_rematch(&self, code: &str, side: Side) -> Result<RematchStatus, CoreError> {
        let status = self
            .store
            .transact(|state| state.lobbies.vote_rematch(code, side))?;
        if status == RematchStatus::Started {
            info!(code, "rematch started");
        }
        Ok(status)
    }

    /// Polling counts as activity.
    pub fn lobby_snapshot(&self, code: &str) -> Result<LobbySnapshot, CoreError> {
        self.store.transact(|state| {
            state
                .lobbies
                .touch(code)
                .map(Lobby::snapshot)
                .ok_or_else(|| CoreError::from(LobbyError::NotFound(normalize_code(code))))
        })
    }

    /// Polling counts as activity.
    pub fn lobby_view(&self, code: &str) -> Result<GameView, CoreError> {
        self.store.transact(|state| {
            state
                .lobbies
                .touch(code)
                .map(|lobby| GameView::from_game(&lobby.game))
                .ok_or_else(|| CoreError::from(LobbyError::NotFound(normalize_code(code))))
        })
    }

    /// Copy a lobby's game into a local session so one browser can play on
    /// alone. The lobby is left untouched.
    #[instrument(skip(self))]
    pub fn materialize_session(&self, code: &str, token: Option<&str>) -> Result<SessionHandle, CoreError> {
        let handle = self.store.transact(|state| -> Result<SessionHandle, CoreError> {
            let copy = state
                .lobbies
                .touch(code)
                .ok_or_else(|| LobbyError::NotFound(normalize_code(code)))?
                .game
                .materialize();

            let (session, created) = state.sessions.get_or_create(token, || copy.clone());
            if !created {
                session.game = copy;
            }
            Ok(SessionHandle {
                token: session.token.clone(),
                created,
                game: session.game.clone(),
            })
        })?;
        info!(token = %handle.token, "lobby game copied to session");
        Ok(handle)
    }

    // ---- Housekeeping ----

    /// Drop sessions and lobbies idle past the configured timeout.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> CleanupResult {
        let timeout = self.config.idle_timeout();
        let result = self.store.transact(|state| state.evict_idle(now, timeout));
        if !result.is_empty() {
            info!(
                sessions = result.expired_sessions.len(),
                lobbies = result.expired_lobbies.len(),
                "evicted idle state"
            );
        }
        result
    }
}
