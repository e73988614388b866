//! Board model.
//!
//! A fixed `rows × cols` grid. Row 0 is the entry row at the top edge;
//! normal gravity pulls pieces toward the last row. Obstacle cells are
//! placed once at creation and never change afterwards.

use rand::Rng;
use serde::Serialize;

/// Minimum board dimension that still allows a line of four.
pub const MIN_DIMENSION: usize = 4;

/// Largest accepted board dimension.
pub const MAX_DIMENSION: usize = 32;

/// Attempts allowed per requested obstacle.
pub const OBSTACLE_ATTEMPTS_PER_CELL: usize = 10;

/// One of the two playing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Red,
    Yellow,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }

    /// Parse a side from client input (`"red"`, `"R"`, `"yellow"`, `"y"`...).
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "red" | "r" => Some(Self::Red),
            "yellow" | "y" => Some(Self::Yellow),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    #[default]
    Empty,
    Red,
    Yellow,
    Blocked,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The side owning this cell, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            Self::Red => Some(Side::Red),
            Self::Yellow => Some(Side::Yellow),
            Self::Empty | Self::Blocked => None,
        }
    }
}

impl From<Side> for Cell {
    fn from(side: Side) -> Self {
        match side {
            Side::Red => Self::Red,
            Side::Yellow => Self::Yellow,
        }
    }
}

/// Grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Step by a signed delta, returning `None` when leaving the board.
    pub fn offset(&self, d_row: isize, d_col: isize, board: &Board) -> Option<Position> {
        let row = self.row.checked_add_signed(d_row)?;
        let col = self.col.checked_add_signed(d_col)?;
        if row < board.rows() && col < board.cols() {
            Some(Position::new(row, col))
        } else {
            None
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({"row": self.row, "col": self.col})
    }
}

/// Rectangular game grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create an empty board.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Create a board with obstacles at fixed positions.
    pub fn with_obstacles(rows: usize, cols: usize, obstacles: &[Position]) -> Self {
        let mut board = Self::new(rows, cols);
        for &pos in obstacles {
            if board.contains(pos) {
                board.cells[pos.row * cols + pos.col] = Cell::Blocked;
            }
        }
        board
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Cell at a position; out-of-range positions read as `Blocked`.
    pub fn get(&self, pos: Position) -> Cell {
        if self.contains(pos) {
            self.cells[pos.row * self.cols + pos.col]
        } else {
            Cell::Blocked
        }
    }

    /// Write a cell. Obstacles and out-of-range positions are left untouched;
    /// returns whether the write happened.
    pub fn set(&mut self, pos: Position, cell: Cell) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let slot = &mut self.cells[pos.row * self.cols + pos.col];
        if *slot == Cell::Blocked {
            return false;
        }
        *slot = cell;
        true
    }

    /// Scatter up to `count` obstacles over empty cells.
    ///
    /// Makes at most `10 × count` random picks; picks landing on a non-empty
    /// cell are wasted. Returns how many obstacles were actually placed.
    pub fn place_obstacles<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        if self.cells.is_empty() {
            return 0;
        }
        let mut placed = 0;
        let mut attempts = 0;
        while placed < count && attempts < count * OBSTACLE_ATTEMPTS_PER_CELL {
            attempts += 1;
            let pos = Position::new(rng.gen_range(0..self.rows), rng.gen_range(0..self.cols));
            if self.get(pos).is_empty() {
                self.cells[pos.row * self.cols + pos.col] = Cell::Blocked;
                placed += 1;
            }
        }
        placed
    }

    /// Where a piece dropped into `col` lands.
    ///
    /// Scans from the gravity edge inward and returns the first empty cell.
    /// Occupied and blocked cells are skipped over, so a piece may pass
    /// through them.
    pub fn resolve_drop_cell(&self, col: usize, gravity_inverted: bool) -> Option<Position> {
        if col >= self.cols {
            return None;
        }
        let is_free = |row: usize| self.get(Position::new(row, col)).is_empty();
        let row = if gravity_inverted {
            (0..self.rows).find(|&r| is_free(r))
        } else {
            (0..self.rows).rev().find(|&r| is_free(r))
        }?;
        Some(Position::new(row, col))
    }

    /// Check if a column still has a free cell.
    pub fn is_column_playable(&self, col: usize) -> bool {
        self.resolve_drop_cell(col, false).is_some()
    }

    /// Columns that still accept a piece, left to right.
    pub fn playable_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.cols).filter(move |&c| self.is_column_playable(c))
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    pub fn obstacle_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Blocked).count()
    }

    /// Check if no cell is left to play.
    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// Iterate rows as slices, top to bottom.
    pub fn row_slices(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.cols.max(1))
    }
}
