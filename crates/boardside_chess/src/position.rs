//! Immutable board snapshots backed by the rules engine.

use crate::action::CandidateMove;
use crate::error::GameError;
use crate::outcome::GameOutcome;
use crate::types::{PieceKind, Side};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, FromSetup, Move, Position as _, Square};
use tracing::{debug, instrument};

/// FEN of the standard starting arrangement.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Where every piece stands, whose turn it is, and the castling, en-passant
/// and move-count bookkeeping.
///
/// Positions are values: applying a move returns a new one.
#[derive(Debug, Clone)]
pub struct Position {
    inner: Chess,
}

impl Position {
    /// The standard starting position.
    pub fn start() -> Self {
        Self {
            inner: Chess::default(),
        }
    }

    /// Parses a FEN string and validates it with the rules engine.
    #[instrument]
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let parsed: Fen = fen.trim().parse().map_err(|e: shakmaty::fen::ParseFenError| {
            GameError::InvalidPosition {
                reason: e.to_string(),
            }
        })?;
        let inner = parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| GameError::InvalidPosition {
                reason: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    /// Encodes the position as FEN.
    ///
    /// The en-passant field is written whenever a legal en-passant capture
    /// exists.
    pub fn to_fen(&self) -> String {
        Fen::from_position(self.inner.clone(), EnPassantMode::Legal).to_string()
    }

    /// Key identifying the position for repetition counting: placement,
    /// side to move, castling rights and en-passant square.
    pub fn repetition_key(&self) -> String {
        self.to_fen()
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Side to move according to the position itself.
    pub fn side_to_move(&self) -> Side {
        self.inner.turn().into()
    }

    /// True when the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.inner.is_check()
    }

    /// Half-moves since the last capture or pawn move.
    pub fn halfmoves(&self) -> u32 {
        self.inner.halfmoves()
    }

    /// Full move number, starting at 1.
    pub fn fullmoves(&self) -> u32 {
        self.inner.fullmoves().get()
    }

    /// Piece on `square`, if any.
    pub fn piece_at(&self, square: Square) -> Option<(Side, PieceKind)> {
        self.inner
            .board()
            .piece_at(square)
            .map(|piece| (piece.color.into(), piece.role.into()))
    }

    /// Every legal move for the side to move.
    pub fn legal_moves(&self) -> Vec<CandidateMove> {
        let side = self.side_to_move();
        self.inner
            .legal_moves()
            .iter()
            .filter_map(|mv| CandidateMove::from_engine_move(side, mv))
            .collect()
    }

    /// Looks up a legal move by its UCI string.
    pub fn legal_move_from_uci(&self, uci: &str) -> Option<CandidateMove> {
        let uci = uci.trim().to_ascii_lowercase();
        self.legal_moves().into_iter().find(|mv| mv.uci() == uci)
    }

    /// The same placement with `side` to move.
    ///
    /// Returns a clone when `side` is already to move. Otherwise the
    /// en-passant target is dropped and the rules engine must accept the
    /// result, failing with [`GameError::InvalidTurn`] if it does not.
    #[instrument(skip(self), fields(fen = %self.to_fen()))]
    pub fn with_side_to_move(&self, side: Side) -> Result<Self, GameError> {
        if self.side_to_move() == side {
            return Ok(self.clone());
        }
        let mut setup = self.inner.clone().into_setup(EnPassantMode::Legal);
        setup.turn = side.into();
        setup.ep_square = None;
        let inner = Chess::from_setup(setup, CastlingMode::Standard).map_err(|e| {
            debug!(error = %e, "Rules engine rejected flipped side to move");
            GameError::InvalidTurn {
                declared: side.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { inner })
    }

    /// Applies `candidate` if it is legal here.
    #[instrument(skip(self), fields(uci = %candidate.uci()))]
    pub fn play(&self, candidate: &CandidateMove) -> Result<Self, GameError> {
        let illegal = || GameError::IllegalMove {
            uci: candidate.uci(),
        };
        if candidate.side() != self.side_to_move() {
            return Err(illegal());
        }
        let mv = self.engine_move(candidate).ok_or_else(illegal)?;
        let inner = self.inner.clone().play(&mv).map_err(|_| illegal())?;
        Ok(Self { inner })
    }

    /// Outcome decided by the board alone: checkmate, stalemate,
    /// insufficient material or the fifty-move rule.
    ///
    /// Repetition needs history and is tracked by the session.
    pub fn board_outcome(&self) -> Option<GameOutcome> {
        if self.inner.is_checkmate() {
            Some(GameOutcome::Checkmate {
                winner: self.side_to_move().opponent(),
            })
        } else if self.inner.is_stalemate() {
            Some(GameOutcome::Stalemate)
        } else if self.inner.is_insufficient_material() {
            Some(GameOutcome::InsufficientMaterial)
        } else if self.halfmoves() >= 100 {
            Some(GameOutcome::FiftyMoveRule)
        } else {
            None
        }
    }

    /// Eight-line text diagram, rank 8 first, `.` for empty squares.
    pub fn diagram(&self) -> String {
        let fen = self.to_fen();
        let placement = fen.split_whitespace().next().unwrap_or_default();
        placement
            .split('/')
            .zip((1..=8).rev())
            .map(|(row, rank)| {
                let squares: String = row
                    .chars()
                    .flat_map(|c| match c.to_digit(10) {
                        Some(empty) => vec!['.'; empty as usize],
                        None => vec![c],
                    })
                    .flat_map(|c| [c, ' '])
                    .collect();
                format!("{} {}", rank, squares.trim_end())
            })
            .chain(std::iter::once("  a b c d e f g h".to_string()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn engine_move(&self, candidate: &CandidateMove) -> Option<Move> {
        let side = self.side_to_move();
        self.inner
            .legal_moves()
            .into_iter()
            .find(|mv| CandidateMove::from_engine_move(side, mv).as_ref() == Some(candidate))
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.to_fen() == other.to_fen()
    }
}

impl Eq for Position {}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}
