//! Candidate moves as plain values.
//!
//! A [`CandidateMove`] is derived from the rules engine's legal move list and
//! compared structurally, so the same value works for filtering, display and
//! as the unit handed back to [`GameSession::commit`](crate::GameSession::commit).

use crate::types::{PieceKind, Side};
use shakmaty::{File, Move, Square};
use tracing::instrument;

/// One fully specified move for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateMove {
    side: Side,
    piece: PieceKind,
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
    castle: bool,
    capture: bool,
}

impl CandidateMove {
    /// Builds a candidate from a rules-engine move made by `side`.
    ///
    /// Castling uses the king's landing square, matching standard UCI
    /// (`e1g1`). Returns `None` for drop moves, which standard chess never
    /// produces.
    #[instrument(level = "trace")]
    pub(crate) fn from_engine_move(side: Side, mv: &Move) -> Option<Self> {
        let from = mv.from()?;
        let to = match mv {
            Move::Castle { king, rook } => {
                let file = if rook.file() > king.file() {
                    File::G
                } else {
                    File::C
                };
                Square::from_coords(file, king.rank())
            }
            _ => mv.to(),
        };
        Some(Self {
            side,
            piece: mv.role().into(),
            from,
            to,
            promotion: mv.promotion().map(PieceKind::from),
            castle: mv.is_castle(),
            capture: mv.is_capture(),
        })
    }

    /// Side making the move.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Kind of the moving piece.
    pub fn piece(&self) -> PieceKind {
        self.piece
    }

    /// Origin square.
    pub fn from(&self) -> Square {
        self.from
    }

    /// Destination square (the king's square for castling).
    pub fn to(&self) -> Square {
        self.to
    }

    /// Promotion piece, if this is a promotion.
    pub fn promotion(&self) -> Option<PieceKind> {
        self.promotion
    }

    /// True for castling moves.
    pub fn is_castle(&self) -> bool {
        self.castle
    }

    /// True when the move captures (including en passant).
    pub fn is_capture(&self) -> bool {
        self.capture
    }

    /// UCI notation, e.g. `e2e4`, `e7e8q`, `e1g1`.
    pub fn uci(&self) -> String {
        let mut uci = format!("{}{}", self.from, self.to);
        if let Some(promotion) = self.promotion {
            uci.push(promotion.letter());
        }
        uci
    }
}

impl std::fmt::Display for CandidateMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uci())
    }
}
