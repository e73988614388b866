//! Lobby state management.
//!
//! A lobby pairs two browsers on one game through a short shareable code.
//! Red is seated by whoever creates the lobby, yellow by the first joiner.
//! Clients poll for state and chat; nothing here pushes.

use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use super::board::Side;
use super::game::{AppliedMove, GameState, MoveRejection, Names, Scores};

/// Characters per lobby code.
pub const CODE_LENGTH: usize = 4;

/// Code alphabet without look-alikes (no 0/O, no 1/I).
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random codes tried before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 1000;

/// A chat line. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub name: String,
    pub text: String,
}

impl ChatMessage {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "ts": self.timestamp.timestamp_millis(),
            "side": self.side.as_str(),
            "name": self.name,
            "text": self.text
        })
    }
}

/// Size limits applied to chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLimits {
    /// Messages kept per lobby
    pub history: usize,
    /// Characters per message
    pub max_len: usize,
    /// Characters per display name
    pub name_max_len: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            history: 200,
            max_len: 240,
            name_max_len: 24,
        }
    }
}

/// Trim `text` and cut it to `max_chars` characters.
pub fn clean_text(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Append-only chat log keeping the most recent messages.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    last_id: u64,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and drop the oldest ones beyond `history`.
    pub fn push(&mut self, side: Side, name: String, text: String, history: usize) -> ChatMessage {
        self.last_id += 1;
        let message = ChatMessage {
            id: self.last_id,
            timestamp: Utc::now(),
            side,
            name,
            text,
        };
        self.messages.push_back(message.clone());
        while self.messages.len() > history {
            self.messages.pop_front();
        }
        message
    }

    /// Messages with an id above `since_id`, oldest first.
    pub fn since(&self, since_id: u64) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.id > since_id)
            .cloned()
            .collect()
    }

    /// Highest id handed out so far (0 when empty).
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Progress of a rematch vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RematchStatus {
    /// Waiting for the other side; lists sides that voted.
    Waiting { votes: Vec<Side> },
    /// Both voted; a new round has begun.
    Started,
}

/// What a polling client needs to know about a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbySnapshot {
    pub code: String,
    pub current_side: Side,
    pub gravity_inverted: bool,
    pub turn_count: u32,
    pub game_over: bool,
    pub winner: Option<Side>,
    pub has_red: bool,
    pub has_yellow: bool,
    pub scores: Scores,
    pub names: Names,
    pub rematch_votes: Vec<Side>,
    pub last_chat_id: u64,
}

impl LobbySnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "current": self.current_side.as_str(),
            "gravity_inverted": self.gravity_inverted,
            "turn_count": self.turn_count,
            "game_over": self.game_over,
            "winner": self.winner.map(|s| s.as_str()),
            "has_red": self.has_red,
            "has_yellow": self.has_yellow,
            "scores": self.scores,
            "names": self.names,
            "rematch_votes": self.rematch_votes,
            "last_chat_id": self.last_chat_id
        })
    }
}

/// Lobby errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("lobby {0} not found")]
    NotFound(String),
    #[error("lobby code {0} is already taken")]
    DuplicateCode(String),
    #[error("invalid lobby code {0:?}")]
    InvalidCode(String),
    #[error("no free lobby code found")]
    CodesExhausted,
    #[error("the {0} seat is empty")]
    SeatEmpty(Side),
    #[error("chat message is empty")]
    EmptyMessage,
    #[error("rematch is only possible once the game is over")]
    NotFinished,
    #[error(transparent)]
    Move(#[from] MoveRejection),
}

/// Lobby state.
#[derive(Debug, Clone)]
pub struct Lobby {
    /// Uppercase shareable code
    pub code: String,

    /// The shared game
    pub game: GameState,

    /// Seat flags
    pub has_red: bool,
    pub has_yellow: bool,

    chat: ChatLog,

    rematch_votes: BTreeSet<Side>,

    /// When lobby was created
    pub created_at: DateTime<Utc>,

    /// Last time anybody touched this lobby
    pub last_activity: DateTime<Utc>,
}

impl Lobby {
    /// Create a lobby with the red seat taken by its creator.
    pub fn new(code: String, game: GameState) -> Self {
        let now = Utc::now();
        Self {
            code,
            game,
            has_red: true,
            has_yellow: false,
            chat: ChatLog::new(),
            rematch_votes: BTreeSet::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_seated(&self, side: Side) -> bool {
        match side {
            Side::Red => self.has_red,
            Side::Yellow => self.has_yellow,
        }
    }

    /// Check if both seats are taken.
    pub fn is_full(&self) -> bool {
        self.has_red && self.has_yellow
    }

    /// Take the yellow seat. Returns `false` if it was already taken, in
    /// which case nothing changes.
    pub fn join(&mut self, name: Option<String>) -> bool {
        self.touch();
        if self.has_yellow {
            return false;
        }
        self.has_yellow = true;
        if let Some(name) = name {
            self.game.names.set(Side::Yellow, name);
        }
        true
    }

    /// Apply a move for `side`; the whole check-and-apply runs on `&mut self`.
    pub fn apply_move(&mut self, side: Side, col: usize) -> Result<AppliedMove, MoveRejection> {
        self.touch();
        if self.game.is_over() {
            return Err(MoveRejection::GameOver);
        }
        if !self.is_full() {
            return Err(MoveRejection::WaitingForOpponent);
        }
        if self.game.current() != side {
            return Err(MoveRejection::NotYourTurn(side));
        }
        self.game.apply_move(col)
    }

    /// Post a chat line for a seated side.
    pub fn post_chat(
        &mut self,
        side: Side,
        name: Option<&str>,
        text: &str,
        limits: ChatLimits,
    ) -> Result<ChatMessage, LobbyError> {
        if !self.is_seated(side) {
            return Err(LobbyError::SeatEmpty(side));
        }
        let text = clean_text(text, limits.max_len);
        if text.is_empty() {
            return Err(LobbyError::EmptyMessage);
        }
        let name = name
            .map(|n| clean_text(n, limits.name_max_len))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.game.names.get(side).to_string());

        self.touch();
        Ok(self.chat.push(side, name, text, limits.history))
    }

    pub fn messages_since(&self, since_id: u64) -> Vec<ChatMessage> {
        self.chat.since(since_id)
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Vote for another round. When both sides agree, the side that did not
    /// open the last round opens the next one; scores carry over.
    pub fn vote_rematch(&mut self, side: Side) -> Result<RematchStatus, LobbyError> {
        if !self.game.is_over() {
            return Err(LobbyError::NotFinished);
        }
        if !self.is_seated(side) {
            return Err(LobbyError::SeatEmpty(side));
        }
        self.touch();
        self.rematch_votes.insert(side);
        if self.rematch_votes.len() < 2 {
            return Ok(RematchStatus::Waiting {
                votes: self.rematch_votes.iter().copied().collect(),
            });
        }
        self.rematch_votes.clear();
        let opener = self.game.starting_side().opponent();
        self.game.replay_starting_with(opener);
        Ok(RematchStatus::Started)
    }

    pub fn rematch_votes(&self) -> impl Iterator<Item = Side> + '_ {
        self.rematch_votes.iter().copied()
    }

    /// Check if the lobby saw no activity for longer than `timeout`.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now - self.last_activity > timeout
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            code: self.code.clone(),
            current_side: self.game.current(),
            gravity_inverted: self.game.gravity_inverted(),
            turn_count: self.game.turn_count(),
            game_over: self.game.is_over(),
            winner: self.game.winner(),
            has_red: self.has_red,
            has_yellow: self.has_yellow,
            scores: self.game.scores,
            names: self.game.names.clone(),
            rematch_votes: self.rematch_votes.iter().copied().collect(),
            last_chat_id: self.chat.last_id(),
        }
    }
}

/// Uppercase and trim a client-supplied code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Check if `code` is a well-formed normalized code.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Draw a random code from the alphabet.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Lobby manager - tracks all active lobbies by code.
#[derive(Debug, Default)]
pub struct LobbyManager {
    lobbies: HashMap<String, Lobby>,
}

impl LobbyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new lobby around `game`.
    ///
    /// With a preferred code the code must be valid and unused; otherwise a
    /// random unused code is drawn.
    pub fn create(
        &mut self,
        game: GameState,
        preferred_code: Option<&str>,
    ) -> Result<&mut Lobby, LobbyError> {
        let code = match preferred_code.map(normalize_code) {
            Some(code) => {
                if !is_valid_code(&code) {
                    return Err(LobbyError::InvalidCode(code));
                }
                if self.lobbies.contains_key(&code) {
                    return Err(LobbyError::DuplicateCode(code));
                }
                code
            }
            None => self.unused_code(&mut rand::thread_rng())?,
        };

        let lobby = Lobby::new(code.clone(), game);
        Ok(self.lobbies.entry(code).or_insert(lobby))
    }

    fn unused_code<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, LobbyError> {
        (0..MAX_CODE_ATTEMPTS)
            .map(|_| random_code(rng))
            .find(|code| !self.lobbies.contains_key(code))
            .ok_or(LobbyError::CodesExhausted)
    }

    /// Get lobby by code (case-insensitive).
    pub fn get(&self, code: &str) -> Option<&Lobby> {
        self.lobbies.get(&normalize_code(code))
    }

    /// Get mutable lobby by code (case-insensitive).
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Lobby> {
        self.lobbies.get_mut(&normalize_code(code))
    }

    /// Get lobby by code and record activity; polling keeps a lobby alive.
    pub fn touch(&mut self, code: &str) -> Option<&Lobby> {
        let lobby = self.get_mut(code)?;
        lobby.touch();
        Some(lobby)
    }

    fn require_mut(&mut self, code: &str) -> Result<&mut Lobby, LobbyError> {
        self.get_mut(code)
            .ok_or_else(|| LobbyError::NotFound(normalize_code(code)))
    }

    /// Take the yellow seat of a lobby.
    pub fn join(&mut self, code: &str, name: Option<String>) -> Result<&Lobby, LobbyError> {
        let lobby = self.require_mut(code)?;
        lobby.join(name);
        Ok(lobby)
    }

    pub fn apply_move(&mut self, code: &str, side: Side, col: usize) -> Result<AppliedMove, LobbyError> {
        Ok(self.require_mut(code)?.apply_move(side, col)?)
    }

    pub fn post_chat(
        &mut self,
        code: &str,
        side: Side,
        name: Option<&str>,
        text: &str,
        limits: ChatLimits,
    ) -> Result<ChatMessage, LobbyError> {
        self.require_mut(code)?.post_chat(side, name, text, limits)
    }

    /// Chat since `since_id`; empty when the lobby does not exist.
    pub fn messages_since(&self, code: &str, since_id: u64) -> Vec<ChatMessage> {
        self.get(code)
            .map(|lobby| lobby.messages_since(since_id))
            .unwrap_or_default()
    }

    pub fn vote_rematch(&mut self, code: &str, side: Side) -> Result<RematchStatus, LobbyError> {
        self.require_mut(code)?.vote_rematch(side)
    }

    pub fn snapshot(&self, code: &str) -> Result<LobbySnapshot, LobbyError> {
        self.get(code)
            .map(Lobby::snapshot)
            .ok_or_else(|| LobbyError::NotFound(normalize_code(code)))
    }

    /// Remove a lobby entirely.
    pub fn remove(&mut self, code: &str) -> Option<Lobby> {
        self.lobbies.remove(&normalize_code(code))
    }

    /// Remove lobbies idle for longer than `timeout`.
    pub fn evict_idle(&mut self, now: DateTime<Utc>, timeout: chrono::Duration) -> Vec<String> {
        let idle: Vec<String> = self
            .lobbies
            .iter()
            .filter(|(_, l)| l.is_idle(now, timeout))
            .map(|(code, _)| code.clone())
            .collect();

        for code in &idle {
            self.lobbies.remove(code);
        }

        idle
    }

    /// Count lobbies.
    pub fn count(&self) -> usize {
        self.lobbies.len()
    }

    /// Get all lobby codes.
    pub fn codes(&self) -> impl Iterator<Item = &String> {
        self.lobbies.keys()
    }
}
