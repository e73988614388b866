//! Presentation-agnostic game views.
//!
//! A [`GameView`] carries everything a client needs to draw one frame:
//! the grid with highlight flags, which columns accept a piece, whose turn
//! it is and a short status line. How it reaches the client is up to a
//! [`Renderer`].

use serde::Serialize;

use crate::state::board::{Cell, Position, Side};
use crate::state::game::{GameState, Names, Outcome, Scores};

/// One grid cell as shown to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub cell: Cell,
    /// Part of the highlighted winning line
    pub winning: bool,
    /// The most recently placed piece
    pub last: bool,
}

/// Snapshot of a game for drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub rows: usize,
    pub cols: usize,
    /// Row 0 first
    pub grid: Vec<Vec<CellView>>,
    /// Per column: can a piece be dropped there now
    pub playable: Vec<bool>,
    pub current: Side,
    pub turn_count: u32,
    pub gravity_inverted: bool,
    pub moves_until_flip: Option<u32>,
    pub game_over: bool,
    pub outcome: Option<Outcome>,
    pub winning_cells: Vec<Position>,
    pub scores: Scores,
    pub names: Names,
    pub mode: &'static str,
    pub message: String,
}

impl GameView {
    pub fn from_game(game: &GameState) -> Self {
        let board = game.board();
        let last = game.last_placed.map(|p| p.position);

        let grid = (0..board.rows())
            .map(|row| {
                (0..board.cols())
                    .map(|col| {
                        let pos = Position::new(row, col);
                        CellView {
                            cell: board.get(pos),
                            winning: game.is_winning_cell(pos),
                            last: last == Some(pos),
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            rows: board.rows(),
            cols: board.cols(),
            grid,
            playable: (0..board.cols()).map(|c| game.is_column_playable(c)).collect(),
            current: game.current(),
            turn_count: game.turn_count(),
            gravity_inverted: game.gravity_inverted(),
            moves_until_flip: game.turn().moves_until_flip(game.config().gravity_period),
            game_over: game.is_over(),
            outcome: game.outcome,
            winning_cells: game.winning_cells.clone(),
            scores: game.scores,
            names: game.names.clone(),
            mode: game.mode.as_str(),
            message: status_message(game),
        }
    }
}

/// One-line status for the game.
pub fn status_message(game: &GameState) -> String {
    match game.outcome {
        Some(Outcome::Win(side)) => format!("{} wins!", game.names.get(side)),
        Some(Outcome::Draw) => "It's a draw.".to_string(),
        None => {
            let direction = if game.gravity_inverted() { "up" } else { "down" };
            format!(
                "{}'s turn ({}), pieces fall {direction}",
                game.names.get(game.current()),
                game.current()
            )
        }
    }
}

/// Turns a [`GameView`] into something a transport can send.
pub trait Renderer {
    type Output;
    type Error;

    fn render(&self, view: &GameView) -> Result<Self::Output, Self::Error>;
}

/// Renders views as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    type Output = String;
    type Error = serde_json::Error;

    fn render(&self, view: &GameView) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(view)
        } else {
            serde_json::to_string(view)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_view_of_new_game() {
        let game = GameState::new(GameConfig::classic());
        let view = GameView::from_game(&game);
        assert_eq!((view.rows, view.cols), (6, 7));
        assert_eq!(view.grid.len(), 6);
        assert!(view.grid.iter().all(|row| row.len() == 7));
        assert_eq!(view.playable, vec![true; 7]);
        assert_eq!(view.current, Side::Red);
        assert_eq!(view.moves_until_flip, None);
        assert_eq!(view.message, "Red's turn (red), pieces fall down");
    }

    #[test]
    fn test_view_marks_last_and_winning() {
        let mut game = GameState::new(GameConfig::classic());
        for col in [3, 0, 3, 0, 3, 0, 3] {
            game.apply_move(col).unwrap();
        }
        let view = GameView::from_game(&game);
        assert!(view.game_over);
        assert_eq!(view.playable, vec![false; 7]);
        assert!(view.grid[2][3].last);
        assert!(view.grid[2][3].winning);
        assert!(view.grid[5][3].winning);
        assert!(!view.grid[5][0].winning);
        assert_eq!(view.message, "Red wins!");
    }

    #[test]
    fn test_json_renderer() {
        let game = GameState::new(GameConfig::new(6, 7, 0).unwrap());
        let view = GameView::from_game(&game);
        let text = JsonRenderer::default().render(&view).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["current"], "red");
        assert_eq!(value["moves_until_flip"], 5);
        assert_eq!(value["grid"][0][0]["cell"], "empty");
        assert_eq!(value["mode"], "pvp");
    }
}
