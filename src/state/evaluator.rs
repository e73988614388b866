//! Win and draw detection.

use super::board::{Board, Cell, Position, Side};

/// Pieces in a row needed to win.
pub const WIN_LENGTH: usize = 4;

/// Axis directions as (row, col) steps: horizontal, vertical, and the two
/// diagonals. Each axis is walked both ways.
pub const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Longest run of `side` through `pos`, if it reaches `WIN_LENGTH`.
///
/// The run is ordered from one end to the other. Returns an empty vector when
/// no axis reaches four. On equal lengths the earlier axis in `AXES` wins.
pub fn find_line_through(board: &Board, pos: Position, side: Side) -> Vec<Position> {
    let target = Cell::from(side);
    if board.get(pos) != target {
        return Vec::new();
    }

    let mut best: Vec<Position> = Vec::new();
    for (dr, dc) in AXES {
        let mut backward = Vec::new();
        let mut cursor = pos;
        while let Some(next) = cursor.offset(-dr, -dc, board) {
            if board.get(next) != target {
                break;
            }
            backward.push(next);
            cursor = next;
        }

        let mut line: Vec<Position> = backward.into_iter().rev().collect();
        line.push(pos);
        let mut cursor = pos;
        while let Some(next) = cursor.offset(dr, dc, board) {
            if board.get(next) != target {
                break;
            }
            line.push(next);
            cursor = next;
        }

        if line.len() >= WIN_LENGTH && line.len() > best.len() {
            best = line;
        }
    }
    best
}

/// Check if the piece at `pos` completes a line for `side`.
pub fn is_winning_placement(board: &Board, pos: Position, side: Side) -> bool {
    !find_line_through(board, pos, side).is_empty()
}

/// Cells to highlight for a winning line.
pub fn highlight(line: &[Position]) -> Vec<Position> {
    line.iter().take(WIN_LENGTH).copied().collect()
}

/// Check if the game cannot continue.
///
/// True when no column has a legal drop cell. Because drops skip over
/// occupied cells, that is exactly "no empty cell left", independent of the
/// gravity direction.
pub fn is_draw(board: &Board) -> bool {
    board.playable_columns().next().is_none()
}

/// Check if every cell of the entry row (row 0) is non-empty.
///
/// Matches `is_draw` under normal gravity, but inverted gravity can fill
/// row 0 while lower cells are still open.
pub fn entry_row_full(board: &Board) -> bool {
    (0..board.cols()).all(|c| !board.get(Position::new(0, c)).is_empty())
}
