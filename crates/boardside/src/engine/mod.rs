//! The move oracle: a chess engine asked for the best reply.

mod uci;

pub use uci::UciEngine;

use boardside_chess::Position;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// How long or how deep the engine may search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct SearchBudget {
    /// Thinking time.
    pub movetime: Duration,
    /// Fixed depth; takes precedence over `movetime` when set.
    pub depth: Option<u32>,
}

impl SearchBudget {
    /// The UCI `go` command for this budget.
    pub fn go_command(&self) -> String {
        match self.depth {
            Some(depth) => format!("go depth {}", depth),
            None => format!("go movetime {}", self.movetime.as_millis()),
        }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            movetime: Duration::from_millis(100),
            depth: None,
        }
    }
}

/// Engine evaluation from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Centipawns.
    Centipawns(i32),
    /// Mate in this many moves; negative when being mated.
    Mate(i32),
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "{:+.2}", f64::from(*cp) / 100.0),
            Score::Mate(moves) if *moves >= 0 => write!(f, "mate in {}", moves),
            Score::Mate(moves) => write!(f, "mated in {}", moves.unsigned_abs()),
        }
    }
}

/// What the engine recommends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Recommended move, UCI notation.
    pub best_move: String,
    /// Last reported evaluation.
    pub score: Option<Score>,
    /// Last reported principal variation.
    pub pv: Vec<String>,
    /// Last reported search depth.
    pub depth: Option<u32>,
}

/// Anything that can suggest a move for a position.
#[async_trait::async_trait]
pub trait MoveOracle: Send + Sync {
    /// Returns the recommended move for the side to move in `position`.
    async fn best_move(
        &self,
        position: &Position,
        budget: SearchBudget,
    ) -> Result<Analysis, OracleError>;
}

/// Why the oracle gave no move.
#[derive(Debug, Clone, Display, Error)]
pub enum OracleError {
    /// No answer within the allowed time.
    #[display("engine timed out after {} ms", after.as_millis())]
    Timeout {
        /// Time waited.
        after: Duration,
    },
    /// The engine is missing, crashed or answered nonsense.
    #[display("{_0}")]
    Engine(EngineError),
}

impl OracleError {
    /// Builds a timeout error.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }
}

impl From<EngineError> for OracleError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

/// Engine process failure with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Engine error: {} at {}:{}", message, file, line)]
pub struct EngineError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl EngineError {
    /// Creates a new engine error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("Engine I/O error: {}", err))
    }
}
