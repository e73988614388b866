//! Game and service configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::state::board::{MAX_DIMENSION, MIN_DIMENSION};
use crate::state::rules::GRAVITY_PERIOD;

/// Preset board layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Board size and obstacle count for this preset.
    pub fn config(self) -> GameConfig {
        match self {
            Self::Easy => GameConfig::layout(6, 7, 3),
            Self::Medium => GameConfig::layout(6, 8, 5),
            Self::Hard => GameConfig::layout(6, 9, 7),
        }
    }
}

/// Shape of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub obstacles: usize,

    /// Moves between gravity inversions; 0 keeps gravity fixed.
    #[serde(default = "default_gravity_period")]
    pub gravity_period: u32,
}

fn default_gravity_period() -> u32 {
    GRAVITY_PERIOD
}

impl Default for GameConfig {
    fn default() -> Self {
        Difficulty::default().config()
    }
}

impl From<Difficulty> for GameConfig {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.config()
    }
}

impl GameConfig {
    /// Build a custom layout, rejecting shapes where nobody can win.
    pub fn new(rows: usize, cols: usize, obstacles: usize) -> Result<Self, ConfigError> {
        let config = Self::layout(rows, cols, obstacles);
        config.validate()?;
        Ok(config)
    }

    /// Plain 6×7 board without obstacles or gravity inversion.
    pub fn classic() -> Self {
        Self::layout(6, 7, 0).with_gravity_period(0)
    }

    pub fn with_gravity_period(mut self, gravity_period: u32) -> Self {
        self.gravity_period = gravity_period;
        self
    }

    fn layout(rows: usize, cols: usize, obstacles: usize) -> Self {
        Self {
            rows,
            cols,
            obstacles,
            gravity_period: GRAVITY_PERIOD,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < MIN_DIMENSION || self.cols < MIN_DIMENSION {
            return Err(ConfigError::Validation(format!(
                "board must be at least {MIN_DIMENSION}x{MIN_DIMENSION}, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows > MAX_DIMENSION || self.cols > MAX_DIMENSION {
            return Err(ConfigError::Validation(format!(
                "board must be at most {MAX_DIMENSION}x{MAX_DIMENSION}, got {}x{}",
                self.rows, self.cols
            )));
        }
        let cells = self.rows.checked_mul(self.cols).ok_or_else(|| {
            ConfigError::Validation(format!("{}x{} board is too large", self.rows, self.cols))
        })?;
        if self.obstacles >= cells {
            return Err(ConfigError::Validation(format!(
                "{} obstacles do not fit on a {}x{} board",
                self.obstacles, self.rows, self.cols
            )));
        }
        Ok(())
    }
}

/// Settings for the session/lobby service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Layout used for new sessions and lobbies without an explicit one.
    pub difficulty: Difficulty,

    /// Sessions and lobbies idle longer than this are evicted.
    pub idle_timeout_secs: u64,

    /// Chat messages retained per lobby.
    pub chat_history_limit: usize,

    /// Maximum characters per chat message.
    pub chat_max_len: usize,

    /// Maximum characters per display name.
    pub name_max_len: usize,

    /// Whether new sessions start against the computer.
    pub computer_opponent: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            idle_timeout_secs: 24 * 60 * 60,
            chat_history_limit: 200,
            chat_max_len: 240,
            name_max_len: 24,
            computer_opponent: false,
        }
    }
}

impl ServiceConfig {
    /// Parse from a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Validation("idle_timeout_secs must be > 0".into()));
        }
        if self.chat_history_limit == 0 {
            return Err(ConfigError::Validation("chat_history_limit must be > 0".into()));
        }
        if self.chat_max_len == 0 || self.name_max_len == 0 {
            return Err(ConfigError::Validation(
                "chat_max_len and name_max_len must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn game_config(&self) -> GameConfig {
        self.difficulty.config()
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        let secs = self.idle_timeout_secs.min(i64::MAX as u64 / 1000) as i64;
        chrono::Duration::seconds(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_difficulty_presets() {
        let easy = Difficulty::Easy.config();
        assert_eq!((easy.rows, easy.cols, easy.obstacles), (6, 7, 3));
        let medium = Difficulty::Medium.config();
        assert_eq!((medium.rows, medium.cols, medium.obstacles), (6, 8, 5));
        let hard = Difficulty::Hard.config();
        assert_eq!((hard.rows, hard.cols, hard.obstacles), (6, 9, 7));
        assert_eq!(hard.gravity_period, 5);
        assert_eq!(GameConfig::classic().gravity_period, 0);
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("brutal"), None);
    }

    #[test]
    fn test_game_config_validation() {
        assert!(GameConfig::new(3, 7, 0).is_err());
        assert!(GameConfig::new(6, 3, 0).is_err());
        assert!(GameConfig::new(4, 4, 16).is_err());
        assert!(GameConfig::new(4, 4, 2).is_ok());
    }

    #[test]
    fn test_game_config_rejects_oversized_board() {
        assert!(GameConfig::new(MAX_DIMENSION, MAX_DIMENSION, 0).is_ok());
        assert!(GameConfig::new(MAX_DIMENSION + 1, 7, 0).is_err());
        assert!(GameConfig::new(6, MAX_DIMENSION + 1, 0).is_err());

        let err = GameConfig::new(usize::MAX / 2, 4, 0).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        let huge = GameConfig {
            rows: usize::MAX,
            cols: usize::MAX,
            ..GameConfig::classic()
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_game_config_json_defaults_period() {
        let config: GameConfig =
            serde_json::from_str(r#"{"rows": 7, "cols": 8, "obstacles": 2}"#).unwrap();
        assert_eq!(config.gravity_period, 5);
    }

    #[test]
    fn test_service_config_partial_json() {
        let config = ServiceConfig::from_json(r#"{"difficulty": "medium", "chat_max_len": 100}"#)
            .unwrap();
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.chat_max_len, 100);
        assert_eq!(config.chat_history_limit, 200);
        assert_eq!(config.idle_timeout(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_service_config_rejects_zero_limit() {
        let err = ServiceConfig::from_json(r#"{"chat_history_limit": 0}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config validation error: chat_history_limit must be > 0"
        );
    }

    #[test]
    fn test_service_config_bad_json() {
        assert!(matches!(
            ServiceConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
