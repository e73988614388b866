//! Gravity and turn rules.
//!
//! ```text
//!   ┌────────────────────── move applied ──────────────────────┐
//!   │                                                          ▼
//! Playing(side, gravity, n) ──win/draw──▶ GameOver     turn_count = n + 1
//!   ▲                                                          │
//!   │   side flips; gravity flips when (n + 1) % period == 0   │
//!   └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The terminal check always runs before the gravity flip, so a finishing
//! move never inverts gravity.

use serde::Serialize;

use super::board::Side;

/// Default number of applied moves between gravity inversions.
pub const GRAVITY_PERIOD: u32 = 5;

/// Turn state of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnState {
    pub current: Side,
    pub turn_count: u32,
    pub gravity_inverted: bool,
}

impl Default for TurnState {
    fn default() -> Self {
        Self::starting_with(Side::Red)
    }
}

impl TurnState {
    pub fn starting_with(side: Side) -> Self {
        Self {
            current: side,
            turn_count: 0,
            gravity_inverted: false,
        }
    }

    /// Advance after a successfully applied move.
    ///
    /// `terminal` is the result of the win/draw check for that move. A
    /// `gravity_period` of 0 disables inversion.
    pub fn advance(&mut self, terminal: bool, gravity_period: u32) {
        self.turn_count += 1;
        if terminal {
            return;
        }
        self.current = self.current.opponent();
        if gravity_period != 0 && self.turn_count % gravity_period == 0 {
            self.gravity_inverted = !self.gravity_inverted;
        }
    }

    /// Gravity the next side plays under if the pending move does not end
    /// the game.
    pub fn gravity_after_move(&self, gravity_period: u32) -> bool {
        let flips = gravity_period != 0 && (self.turn_count + 1) % gravity_period == 0;
        self.gravity_inverted != flips
    }

    /// Number of moves left before gravity next flips.
    pub fn moves_until_flip(&self, gravity_period: u32) -> Option<u32> {
        if gravity_period == 0 {
            return None;
        }
        Some(gravity_period - (self.turn_count % gravity_period))
    }
}
