//! Errors raised while resolving and committing moves.
//!
//! Every variant is recoverable at the conversation level: the caller
//! re-prompts the current (or previous) resolver stage and the session keeps
//! its position.

use crate::action::CandidateMove;
use crate::outcome::GameOutcome;
use crate::selection::ResolverStage;
use crate::session::ConversationId;
use crate::types::{PieceKind, Side};
use derive_more::{Display, Error};
use shakmaty::Square;

/// Error that can occur while resolving or applying a move.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// The declared side cannot be to move in this position.
    #[display("'{declared}' cannot be the side to move: {reason}")]
    InvalidTurn {
        /// What the user declared.
        declared: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No piece of that kind has a legal move.
    #[display("no {side} {piece} has a legal move")]
    NoLegalMoves {
        /// Declared side.
        side: Side,
        /// Requested piece kind.
        piece: PieceKind,
    },

    /// None of the candidates matches the requested target.
    #[display("no {piece} move matches '{target}'")]
    NoMatchingMove {
        /// Piece kind under consideration.
        piece: PieceKind,
        /// Square or move the user asked for.
        target: String,
    },

    /// Several legal moves fit; the user must pick one.
    #[display("several moves reach {square}, pick one")]
    AmbiguousMove {
        /// Shared destination square.
        square: Square,
        /// Every matching move.
        candidates: Vec<CandidateMove>,
    },

    /// The move is not legal in the current position.
    #[display("{uci} is not a legal move here")]
    IllegalMove {
        /// The rejected move.
        uci: String,
    },

    /// Another message for this conversation is still being processed.
    #[display("conversation {conversation} is still busy")]
    SessionBusy {
        /// The busy conversation.
        conversation: ConversationId,
    },

    /// The engine did not answer in time.
    #[display("engine gave no answer within {after_ms} ms")]
    EngineTimeout {
        /// Time waited, in milliseconds.
        after_ms: u64,
    },

    /// Input does not belong to the current stage.
    #[display("expected input for stage '{expected}', got '{input}'")]
    UnexpectedInput {
        /// Stage the resolver is in.
        expected: ResolverStage,
        /// What was received.
        input: String,
    },

    /// The game has ended and must be restarted.
    #[display("game is over: {outcome}")]
    GameOver {
        /// How it ended.
        outcome: GameOutcome,
    },

    /// A position could not be parsed or is not legal.
    #[display("invalid position: {reason}")]
    InvalidPosition {
        /// Parser or validation message.
        reason: String,
    },
}
