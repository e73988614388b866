//! Game state management.
//!
//! One match: board, turn state, outcome, scores and display names. The
//! board only changes through `apply_move`; reset and replay rebuild it.

use rand::Rng;
use serde::Serialize;

use super::board::{Board, Cell, Position, Side};
use super::evaluator::{find_line_through, highlight, is_draw};
use super::opponent::choose_column_with_reply;
use super::rules::TurnState;
use crate::config::GameConfig;

/// Who controls the yellow side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Two humans sharing one session.
    #[default]
    TwoPlayer,
    /// The computer answers every red move.
    VsComputer,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoPlayer => "pvp",
            Self::VsComputer => "ai",
        }
    }

    /// Anything but `"ai"` selects two-player mode.
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("ai") {
            Self::VsComputer
        } else {
            Self::TwoPlayer
        }
    }

    /// The side played by the computer in this mode.
    pub fn computer_side(&self) -> Option<Side> {
        match self {
            Self::TwoPlayer => None,
            Self::VsComputer => Some(Side::Yellow),
        }
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "side")]
pub enum Outcome {
    Win(Side),
    Draw,
}

/// Cumulative wins per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Scores {
    pub red: u32,
    pub yellow: u32,
}

impl Scores {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Red => self.red,
            Side::Yellow => self.yellow,
        }
    }

    pub fn record_win(&mut self, side: Side) {
        match side {
            Side::Red => self.red += 1,
            Side::Yellow => self.yellow += 1,
        }
    }
}

/// Display names per side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Names {
    pub red: String,
    pub yellow: String,
}

impl Default for Names {
    fn default() -> Self {
        Self {
            red: "Red".to_string(),
            yellow: "Yellow".to_string(),
        }
    }
}

impl Names {
    pub fn get(&self, side: Side) -> &str {
        match side {
            Side::Red => &self.red,
            Side::Yellow => &self.yellow,
        }
    }

    pub fn set(&mut self, side: Side, name: String) {
        match side {
            Side::Red => self.red = name,
            Side::Yellow => self.yellow = name,
        }
    }
}

/// The most recent piece placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub side: Side,
    pub position: Position,
}

/// Result of an applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedMove {
    pub row: usize,
    pub col: usize,
    pub side: Side,
    pub won: bool,
    pub draw: bool,
    /// Gravity after the move, i.e. for the next drop.
    pub gravity_inverted: bool,
}

/// Why a move was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("the game is already over")]
    GameOver,
    #[error("column {0} is full")]
    ColumnFull(usize),
    #[error("column {column} is outside a board of {cols} columns")]
    ColumnOutOfRange { column: usize, cols: usize },
    #[error("it is not {0}'s turn")]
    NotYourTurn(Side),
    #[error("waiting for an opponent to join")]
    WaitingForOpponent,
}

/// Game session state.
#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    board: Board,
    turn: TurnState,

    /// Side that opened this round
    starting_side: Side,

    /// `None` while the game is running
    pub outcome: Option<Outcome>,

    /// Highlighted cells of the winning line, in line order
    pub winning_cells: Vec<Position>,

    pub names: Names,
    pub scores: Scores,
    pub last_placed: Option<Placement>,
    pub mode: GameMode,

    /// When this round started
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// When this round ended
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl GameState {
    /// Create a new game with randomly placed obstacles.
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Create a new game drawing obstacle positions from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Self {
        let mut board = Board::new(config.rows, config.cols);
        board.place_obstacles(config.obstacles, rng);
        Self::from_board(config, board)
    }

    /// Start a game on a prepared board.
    pub fn from_board(config: GameConfig, board: Board) -> Self {
        Self {
            config,
            board,
            turn: TurnState::default(),
            starting_side: Side::Red,
            outcome: None,
            winning_cells: Vec::new(),
            names: Names::default(),
            scores: Scores::default(),
            last_placed: None,
            mode: GameMode::default(),
            started_at: chrono::Utc::now(),
            ended_at: None,
        }
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn current(&self) -> Side {
        self.turn.current
    }

    pub fn turn_count(&self) -> u32 {
        self.turn.turn_count
    }

    pub fn gravity_inverted(&self) -> bool {
        self.turn.gravity_inverted
    }

    pub fn starting_side(&self) -> Side {
        self.starting_side
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<Side> {
        match self.outcome {
            Some(Outcome::Win(side)) => Some(side),
            _ => None,
        }
    }

    pub fn is_winning_cell(&self, pos: Position) -> bool {
        self.winning_cells.contains(&pos)
    }

    /// Check if `col` can currently take a piece.
    pub fn is_column_playable(&self, col: usize) -> bool {
        !self.is_over() && self.board.is_column_playable(col)
    }

    /// Drop a piece for the current side.
    pub fn apply_move(&mut self, col: usize) -> Result<AppliedMove, MoveRejection> {
        if self.is_over() {
            return Err(MoveRejection::GameOver);
        }
        if col >= self.board.cols() {
            return Err(MoveRejection::ColumnOutOfRange {
                column: col,
                cols: self.board.cols(),
            });
        }
        let pos = self
            .board
            .resolve_drop_cell(col, self.turn.gravity_inverted)
            .ok_or(MoveRejection::ColumnFull(col))?;

        let side = self.turn.current;
        self.board.set(pos, Cell::from(side));
        self.last_placed = Some(Placement { side, position: pos });

        let line = find_line_through(&self.board, pos, side);
        let won = !line.is_empty();
        let draw = !won && is_draw(&self.board);
        if won {
            self.winning_cells = highlight(&line);
            self.scores.record_win(side);
            self.outcome = Some(Outcome::Win(side));
        } else if draw {
            self.outcome = Some(Outcome::Draw);
        }
        if won || draw {
            self.ended_at = Some(chrono::Utc::now());
        }
        self.turn.advance(won || draw, self.config.gravity_period);

        Ok(AppliedMove {
            row: pos.row,
            col: pos.col,
            side,
            won,
            draw,
            gravity_inverted: self.turn.gravity_inverted,
        })
    }

    /// Let the heuristic opponent play for the current side.
    ///
    /// Returns `None` if the game is over or no column is left.
    pub fn apply_computer_move(&mut self) -> Option<AppliedMove> {
        if self.is_over() {
            return None;
        }
        let reply_gravity = self.turn.gravity_after_move(self.config.gravity_period);
        let col = choose_column_with_reply(
            &self.board,
            self.turn.gravity_inverted,
            reply_gravity,
            self.turn.current,
        )?;
        self.apply_move(col).ok()
    }

    /// Start over with `config`: fresh board, scores, names and mode.
    pub fn reset(&mut self, config: GameConfig) {
        *self = Self::new(config);
    }

    /// New round with the same configuration, keeping scores, names and mode.
    /// Obstacles are placed afresh.
    pub fn replay_keeping_score(&mut self) {
        self.replay_starting_with(Side::Red);
    }

    /// New round opened by `side`, keeping scores, names and mode.
    pub fn replay_starting_with(&mut self, side: Side) {
        let mut next = Self::new(self.config);
        next.turn = TurnState::starting_with(side);
        next.starting_side = side;
        next.names = std::mem::take(&mut self.names);
        next.scores = self.scores;
        next.mode = self.mode;
        *self = next;
    }

    /// Switch who controls yellow; the current round restarts.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
        self.replay_keeping_score();
    }

    /// Copy this game into an independent state owned by a local session.
    ///
    /// Every field is copied explicitly; the copy is always two-player since
    /// both seats move to the same browser.
    pub fn materialize(&self) -> GameState {
        GameState {
            config: self.config,
            board: self.board.clone(),
            turn: self.turn,
            starting_side: self.starting_side,
            outcome: self.outcome,
            winning_cells: self.winning_cells.clone(),
            names: self.names.clone(),
            scores: self.scores,
            last_placed: self.last_placed,
            mode: GameMode::TwoPlayer,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    /// Convert full game state to JSON snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "rows": self.board.rows(),
            "cols": self.board.cols(),
            "current": self.turn.current,
            "turn_count": self.turn.turn_count,
            "gravity_inverted": self.turn.gravity_inverted,
            "game_over": self.is_over(),
            "outcome": self.outcome,
            "winning_cells": self.winning_cells.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
            "names": self.names,
            "scores": self.scores,
            "mode": self.mode.as_str(),
            "last_placed": self.last_placed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use pretty_assertions::assert_eq;

    fn classic() -> GameState {
        GameState::new(GameConfig::classic())
    }

    /// 6×7 without obstacles but with gravity inversion.
    fn variant() -> GameState {
        GameState::new(GameConfig::new(6, 7, 0).unwrap())
    }

    fn play_all(game: &mut GameState, cols: &[usize]) -> Vec<AppliedMove> {
        cols.iter().map(|&c| game.apply_move(c).unwrap()).collect()
    }

    #[test]
    fn test_game_new() {
        let game = GameState::new(Difficulty::Hard.config());
        assert_eq!(game.current(), Side::Red);
        assert_eq!(game.turn_count(), 0);
        assert!(!game.gravity_inverted());
        assert!(!game.is_over());
        assert_eq!(game.board().cols(), 9);
        assert!(game.board().obstacle_count() <= 7);
    }

    #[test]
    fn test_vertical_win_in_column_three() {
        let mut game = classic();
        let moves = play_all(&mut game, &[3, 0, 3, 0, 3, 0]);
        assert_eq!(
            moves.iter().filter(|m| m.side == Side::Red).map(|m| m.row).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
        assert!(moves.iter().all(|m| !m.won && !m.draw));

        let last = game.apply_move(3).unwrap();
        assert_eq!((last.row, last.col), (2, 3));
        assert!(last.won);
        assert!(!last.draw);
        assert_eq!(game.winner(), Some(Side::Red));
        assert_eq!(game.scores.red, 1);
        assert_eq!(
            game.winning_cells,
            vec![
                Position::new(2, 3),
                Position::new(3, 3),
                Position::new(4, 3),
                Position::new(5, 3)
            ]
        );
        assert_eq!(game.apply_move(1), Err(MoveRejection::GameOver));
    }

    #[test]
    fn test_gravity_inverts_on_fifth_move() {
        let mut game = variant();
        let moves = play_all(&mut game, &[0, 1, 2, 4, 5]);
        assert!(moves[..4].iter().all(|m| !m.gravity_inverted));
        assert!(moves[4].gravity_inverted);

        // Next drop lands on the top edge.
        let next = game.apply_move(6).unwrap();
        assert_eq!(next.row, 0);
        assert_eq!(game.turn_count(), 6);
    }

    #[test]
    fn test_winning_move_on_flip_turn_keeps_gravity() {
        // Columns 0..=3 only have row 0 open, so yellow always lands there.
        let obstacles: Vec<Position> = (1..4)
            .flat_map(|r| (0..4).map(move |c| Position::new(r, c)))
            .collect();
        let board = Board::with_obstacles(4, 7, &obstacles);
        let mut game = GameState::from_board(GameConfig::new(4, 7, 12).unwrap(), board);

        let moves = play_all(&mut game, &[4, 0, 5, 1, 4, 2, 5, 6, 6]);
        assert!(moves[4].gravity_inverted);
        assert_eq!((moves[6].row, moves[6].col), (0, 5));

        let tenth = game.apply_move(3).unwrap();
        assert!(tenth.won);
        assert_eq!(tenth.side, Side::Yellow);
        assert_eq!(game.turn_count(), 10);
        // Move 10 would flip gravity back, but the game ended first.
        assert!(game.gravity_inverted());
        assert!(tenth.gravity_inverted);
    }

    #[test]
    fn test_full_column_is_rejected_without_state_change() {
        let mut game = variant();
        let moves = play_all(&mut game, &[2, 2, 2, 2, 2, 2]);
        let rows: Vec<usize> = moves.iter().map(|m| m.row).collect();
        assert_eq!(rows, vec![5, 4, 3, 2, 1, 0]);
        assert!(!game.is_over());

        let turn = game.turn();
        assert_eq!(game.apply_move(2), Err(MoveRejection::ColumnFull(2)));
        assert_eq!(game.turn(), turn);
        assert_eq!(
            game.apply_move(7),
            Err(MoveRejection::ColumnOutOfRange { column: 7, cols: 7 })
        );
    }

    #[test]
    fn test_draw_on_full_board() {
        let board = Board::with_obstacles(
            4,
            4,
            &[
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(0, 2),
                Position::new(1, 0),
                Position::new(1, 1),
                Position::new(1, 2),
                Position::new(1, 3),
                Position::new(2, 1),
                Position::new(2, 2),
                Position::new(2, 3),
                Position::new(3, 0),
                Position::new(3, 1),
                Position::new(3, 2),
            ],
        );
        // Free cells: (0,3), (2,0), (3,3).
        let mut game = GameState::from_board(GameConfig::new(4, 4, 13).unwrap(), board);
        let first = game.apply_move(0).unwrap();
        assert_eq!((first.row, first.col), (2, 0));
        assert!(!first.draw);
        game.apply_move(3).unwrap();
        let last = game.apply_move(3).unwrap();
        assert_eq!((last.row, last.col), (0, 3));
        assert!(last.draw);
        assert_eq!(game.outcome, Some(Outcome::Draw));
        assert_eq!(game.scores, Scores::default());
        assert!(game.ended_at.is_some());
    }

    #[test]
    fn test_computer_move_takes_win() {
        let mut board = Board::new(6, 7);
        for c in 0..3 {
            board.set(Position::new(5, c), Cell::Red);
        }
        board.set(Position::new(4, 0), Cell::Yellow);
        board.set(Position::new(4, 1), Cell::Yellow);
        let mut game = GameState::from_board(GameConfig::classic(), board);

        let reply = game.apply_computer_move().unwrap();
        assert_eq!((reply.row, reply.col), (5, 3));
        assert!(reply.won);
        assert_eq!(game.winner(), Some(Side::Red));
        assert_eq!(game.apply_computer_move(), None);
    }

    #[test]
    fn test_replay_keeps_scores_and_mode() {
        let mut game = classic();
        game.mode = GameMode::VsComputer;
        game.names.set(Side::Red, "Ada".to_string());
        play_all(&mut game, &[3, 0, 3, 0, 3, 0, 3]);
        assert_eq!(game.scores.red, 1);

        game.replay_keeping_score();
        assert!(!game.is_over());
        assert_eq!(game.turn_count(), 0);
        assert_eq!(game.scores.red, 1);
        assert_eq!(game.mode, GameMode::VsComputer);
        assert_eq!(game.names.red, "Ada");
        assert!(game.winning_cells.is_empty());
        assert_eq!(game.board().empty_count(), 42);
        assert_eq!(game.config(), GameConfig::classic());

        game.reset(GameConfig::classic());
        assert_eq!(game.scores, Scores::default());
        assert_eq!(game.mode, GameMode::TwoPlayer);
        assert_eq!(game.names, Names::default());
    }

    #[test]
    fn test_replay_keeps_configuration() {
        let mut game = GameState::new(Difficulty::Medium.config());
        game.apply_move(0).unwrap();
        game.replay_keeping_score();
        assert_eq!(game.config(), Difficulty::Medium.config());
        assert_eq!((game.board().rows(), game.board().cols()), (6, 8));
        assert!(game.board().obstacle_count() <= 5);
        assert_eq!(game.turn_count(), 0);
    }

    #[test]
    fn test_replay_starting_with_yellow() {
        let mut game = classic();
        game.replay_starting_with(Side::Yellow);
        assert_eq!(game.current(), Side::Yellow);
        assert_eq!(game.starting_side(), Side::Yellow);
    }

    #[test]
    fn test_set_mode_restarts_round() {
        let mut game = classic();
        play_all(&mut game, &[3, 3]);
        game.set_mode(GameMode::parse("AI"));
        assert_eq!(game.mode, GameMode::VsComputer);
        assert_eq!(game.turn_count(), 0);
        assert_eq!(GameMode::parse("anything"), GameMode::TwoPlayer);
    }

    #[test]
    fn test_materialize_is_independent() {
        let mut game = classic();
        game.mode = GameMode::VsComputer;
        play_all(&mut game, &[2, 4]);
        let mut copy = game.materialize();
        assert_eq!(copy.mode, GameMode::TwoPlayer);
        assert_eq!(copy.board(), game.board());
        assert_eq!(copy.turn(), game.turn());

        copy.apply_move(1).unwrap();
        assert_ne!(copy.board(), game.board());
        assert_eq!(game.turn_count(), 2);
    }

    #[test]
    fn test_to_json() {
        let mut game = classic();
        game.apply_move(3).unwrap();
        let json = game.to_json();
        assert_eq!(json["current"], "yellow");
        assert_eq!(json["turn_count"], 1);
        assert_eq!(json["game_over"], false);
        assert_eq!(json["last_placed"]["position"]["row"], 5);
    }
}
