//! Gravity Four State Library
//!
//! This crate provides the rules engine and server-side state for Gravity
//! Four, a connect-four variant with obstacle cells and gravity that flips
//! direction every few moves.
//!
//! # Overview
//!
//! - **Rules** - Board with obstacles, the drop rule under both gravity
//!   directions, turn order, win and draw detection.
//!
//! - **Computer opponent** - A one-ply heuristic that takes wins, blocks
//!   threats and prefers central columns.
//!
//! - **Sessions** - Local games keyed by an opaque browser token, played by
//!   two people at one screen or against the computer.
//!
//! - **Lobbies** - Online games shared through a four-character code, with
//!   turn arbitration, polled chat and rematch voting.
//!
//! # Design Principles
//!
//! 1. **One lock per request** - Every service call runs inside a single
//!    [`Store`](state::Store) transaction, so turn checks and drops never
//!    interleave.
//!
//! 2. **No networking** - This crate is pure state; transports live elsewhere.
//!
//! 3. **Serialization-ready** - Views and snapshots serialize straight to JSON.
//!
//! # Example
//!
//! ```rust
//! use gravity_four_state::config::{GameConfig, ServiceConfig};
//! use gravity_four_state::service::GameService;
//! use gravity_four_state::state::Side;
//!
//! let service = GameService::new(ServiceConfig::default()).unwrap();
//!
//! // Local game
//! let token = service.new_session().token;
//! service.reset_game(&token, Some(GameConfig::classic())).unwrap();
//! let report = service.play(&token, 3).unwrap();
//! assert_eq!((report.player.row, report.player.col), (5, 3));
//!
//! // Online game
//! let code = service.create_lobby(None, None, Some("Ada")).unwrap().code;
//! service.join_lobby(&code, Some("Yuki")).unwrap();
//! service.apply_online_move(&code, Side::Red, 0).unwrap();
//! assert!(service.apply_online_move(&code, Side::Red, 1).is_err());
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod view;

pub use config::{Difficulty, GameConfig, ServiceConfig};
pub use error::{ConfigError, CoreError, ErrorKind};
pub use service::{GameService, SessionHandle, TurnReport};
pub use view::{GameView, JsonRenderer, Renderer};
