//! Error types.

use std::path::PathBuf;

use crate::state::game::MoveRejection;
use crate::state::lobby::LobbyError;
use crate::state::session::SessionError;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config validation error: {0}")]
    Validation(String),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse error category a transport maps to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: unknown column, bad code, empty chat.
    InvalidInput,
    /// Well-formed but not allowed right now.
    IllegalMove,
    /// Unknown session or lobby.
    NotFound,
    /// Clashes with existing state.
    Conflict,
}

/// Errors returned by [`crate::service::GameService`].
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("illegal move: {0}")]
    IllegalMove(MoveRejection),

    #[error("rematch is only possible once the game is over")]
    RematchUnavailable,

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::IllegalMove(_) | Self::RematchUnavailable => ErrorKind::IllegalMove,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

impl From<MoveRejection> for CoreError {
    fn from(rejection: MoveRejection) -> Self {
        match rejection {
            MoveRejection::ColumnOutOfRange { .. } => Self::InvalidInput(rejection.to_string()),
            other => Self::IllegalMove(other),
        }
    }
}

impl From<LobbyError> for CoreError {
    fn from(err: LobbyError) -> Self {
        match err {
            LobbyError::NotFound(code) => Self::NotFound { what: "lobby", id: code },
            LobbyError::DuplicateCode(_) | LobbyError::CodesExhausted => {
                Self::Conflict(err.to_string())
            }
            LobbyError::InvalidCode(_) | LobbyError::SeatEmpty(_) | LobbyError::EmptyMessage => {
                Self::InvalidInput(err.to_string())
            }
            LobbyError::NotFinished => Self::RematchUnavailable,
            LobbyError::Move(rejection) => rejection.into(),
        }
    }
}

impl From<SessionError> for CoreError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(token) => Self::NotFound { what: "session", id: token },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::Side;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_move_rejection_kinds() {
        let out_of_range: CoreError = MoveRejection::ColumnOutOfRange { column: 9, cols: 7 }.into();
        assert_eq!(out_of_range.kind(), ErrorKind::InvalidInput);

        for rejection in [
            MoveRejection::GameOver,
            MoveRejection::ColumnFull(2),
            MoveRejection::NotYourTurn(Side::Red),
            MoveRejection::WaitingForOpponent,
        ] {
            assert_eq!(CoreError::from(rejection).kind(), ErrorKind::IllegalMove);
        }
    }

    #[test]
    fn test_lobby_error_kinds() {
        let cases = [
            (LobbyError::NotFound("ABCD".into()), ErrorKind::NotFound),
            (LobbyError::DuplicateCode("ABCD".into()), ErrorKind::Conflict),
            (LobbyError::CodesExhausted, ErrorKind::Conflict),
            (LobbyError::InvalidCode("0".into()), ErrorKind::InvalidInput),
            (LobbyError::EmptyMessage, ErrorKind::InvalidInput),
            (LobbyError::NotFinished, ErrorKind::IllegalMove),
            (LobbyError::Move(MoveRejection::GameOver), ErrorKind::IllegalMove),
        ];
        for (err, kind) in cases {
            assert_eq!(CoreError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_not_found_message() {
        let err = CoreError::from(SessionError::NotFound("abc".into()));
        assert_eq!(err.to_string(), "session abc not found");
    }
}
