//! Heuristic computer opponent.
//!
//! Single-ply greedy search: every playable column is tried once and scored
//! on the resulting board. An immediate win short-circuits the search;
//! taking the cell the opponent needs for an immediate win earns a large
//! bonus instead of being a hard rule.

use super::board::{Board, Cell, Position, Side};
use super::evaluator::{is_winning_placement, AXES, WIN_LENGTH};

/// Bonus for occupying a cell the opponent could win on next move.
pub const BLOCK_BONUS: i32 = 5000;

/// Weight of an open window holding three of one side's pieces.
pub const THREE_WEIGHT: i32 = 50;

/// Weight of an open window holding two of one side's pieces.
pub const TWO_WEIGHT: i32 = 10;

/// Penalty per column of distance from the middle.
pub const CENTER_WEIGHT: i32 = 4;

/// Score reported for a column that wins immediately.
pub const WINNING_SCORE: i32 = i32::MAX;

/// Pick a column for `me`, or `None` when every column is full.
pub fn choose_column(board: &Board, gravity_inverted: bool, me: Side) -> Option<usize> {
    choose_column_with_reply(board, gravity_inverted, gravity_inverted, me)
}

/// Like [`choose_column`], with the opponent's threats read under
/// `reply_gravity_inverted`, the gravity their answer will fall under.
pub fn choose_column_with_reply(
    board: &Board,
    gravity_inverted: bool,
    reply_gravity_inverted: bool,
    me: Side,
) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (col, score) in column_scores(board, gravity_inverted, reply_gravity_inverted, me) {
        if score == WINNING_SCORE {
            return Some(col);
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((col, score));
        }
    }
    best.map(|(col, _)| col)
}

/// Score of every playable column, left to right. A column that wins on
/// the spot scores [`WINNING_SCORE`].
pub fn column_scores(
    board: &Board,
    gravity_inverted: bool,
    reply_gravity_inverted: bool,
    me: Side,
) -> Vec<(usize, i32)> {
    let threats = winning_cells(board, reply_gravity_inverted, me.opponent());

    let mut scores = Vec::new();
    for col in 0..board.cols() {
        let Some(pos) = board.resolve_drop_cell(col, gravity_inverted) else {
            continue;
        };

        let mut trial = board.clone();
        trial.set(pos, Cell::from(me));
        if is_winning_placement(&trial, pos, me) {
            scores.push((col, WINNING_SCORE));
            continue;
        }

        let mut score = position_score(&trial, me) - center_penalty(board, col);
        if threats.contains(&pos) {
            score += BLOCK_BONUS;
        }
        scores.push((col, score));
    }
    scores
}

/// Drop cells on which `side` would complete a line right now.
pub fn winning_cells(board: &Board, gravity_inverted: bool, side: Side) -> Vec<Position> {
    let mut cells = Vec::new();
    let mut trial = board.clone();
    for col in 0..board.cols() {
        let Some(pos) = board.resolve_drop_cell(col, gravity_inverted) else {
            continue;
        };
        trial.set(pos, Cell::from(side));
        if is_winning_placement(&trial, pos, side) {
            cells.push(pos);
        }
        trial.set(pos, Cell::Empty);
    }
    cells
}

/// Static evaluation from `me`'s point of view.
///
/// Every window of four cells along the four axes is inspected; windows
/// touching an obstacle or holding both colours are ignored.
pub fn position_score(board: &Board, me: Side) -> i32 {
    let mut score = 0;
    for row in 0..board.rows() {
        for col in 0..board.cols() {
            let start = Position::new(row, col);
            for (dr, dc) in AXES {
                if let Some(window) = window_from(board, start, dr, dc) {
                    score += window_score(board, &window, me);
                }
            }
        }
    }
    score
}

fn window_from(board: &Board, start: Position, dr: isize, dc: isize) -> Option<[Position; WIN_LENGTH]> {
    let mut window = [start; WIN_LENGTH];
    for i in 1..WIN_LENGTH {
        window[i] = window[i - 1].offset(dr, dc, board)?;
    }
    Some(window)
}

fn window_score(board: &Board, window: &[Position], me: Side) -> i32 {
    let mut mine = 0;
    let mut theirs = 0;
    for &pos in window {
        match board.get(pos) {
            Cell::Blocked => return 0,
            Cell::Empty => {}
            cell if cell.side() == Some(me) => mine += 1,
            _ => theirs += 1,
        }
    }
    match (mine, theirs) {
        (3, 0) => THREE_WEIGHT,
        (2, 0) => TWO_WEIGHT,
        (0, 3) => -THREE_WEIGHT,
        (0, 2) => -TWO_WEIGHT,
        _ => 0,
    }
}

fn center_penalty(board: &Board, col: usize) -> i32 {
    let middle = (board.cols() / 2) as i32;
    CENTER_WEIGHT * (col as i32 - middle).abs()
}
