//! How a game ended.

use crate::types::Side;
use serde::{Deserialize, Serialize};

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// The side to move is checkmated.
    Checkmate {
        /// Side that delivered mate.
        winner: Side,
    },
    /// The side to move has no legal move and is not in check.
    Stalemate,
    /// Neither side can possibly mate.
    InsufficientMaterial,
    /// One hundred half-moves without a capture or pawn move.
    FiftyMoveRule,
    /// The same position occurred three times.
    ThreefoldRepetition,
}

impl GameOutcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Side> {
        match self {
            GameOutcome::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }

    /// Returns true if the game was drawn.
    pub fn is_draw(&self) -> bool {
        self.winner().is_none()
    }

    /// PGN-style result string.
    pub fn result(&self) -> &'static str {
        match self.winner() {
            Some(Side::White) => "1-0",
            Some(Side::Black) => "0-1",
            None => "1/2-1/2",
        }
    }

    /// Short machine-friendly termination name.
    pub fn termination(&self) -> &'static str {
        match self {
            GameOutcome::Checkmate { .. } => "checkmate",
            GameOutcome::Stalemate => "stalemate",
            GameOutcome::InsufficientMaterial => "insufficient_material",
            GameOutcome::FiftyMoveRule => "fifty_move_rule",
            GameOutcome::ThreefoldRepetition => "threefold_repetition",
        }
    }
}

impl std::fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameOutcome::Checkmate { winner } => write!(f, "checkmate, {} wins", winner),
            GameOutcome::Stalemate => write!(f, "stalemate"),
            GameOutcome::InsufficientMaterial => write!(f, "draw by insufficient material"),
            GameOutcome::FiftyMoveRule => write!(f, "draw by the fifty-move rule"),
            GameOutcome::ThreefoldRepetition => write!(f, "draw by threefold repetition"),
        }
    }
}
