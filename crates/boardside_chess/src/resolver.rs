//! The turn → piece → destination state machine.
//!
//! Each stage narrows the rules engine's legal move list. Candidates are never
//! stored except for the ambiguous list shown while disambiguating; every
//! other set is recomputed from the position and the pending selection.

use crate::action::CandidateMove;
use crate::error::GameError;
use crate::position::Position;
use crate::selection::{ResolverInput, ResolverStage};
use crate::session::GameSession;
use crate::types::{PieceKind, Side};
use shakmaty::Square;
use tracing::{debug, instrument, warn};

/// Resolves one opponent move for a borrowed [`GameSession`].
#[derive(Debug)]
pub struct MoveResolver<'a> {
    session: &'a mut GameSession,
}

impl<'a> MoveResolver<'a> {
    /// Wraps a session.
    pub fn new(session: &'a mut GameSession) -> Self {
        Self { session }
    }

    /// Current stage.
    pub fn stage(&self) -> ResolverStage {
        self.session.stage()
    }

    /// Feeds one input to whichever stage accepts it.
    #[instrument(skip(self), fields(conversation_id = %self.session.id(), stage = %self.stage()))]
    pub fn submit(&mut self, input: ResolverInput) -> Result<ResolverStage, GameError> {
        match input {
            ResolverInput::Side(side) => self.declare_side(side),
            ResolverInput::Piece(piece) => self.choose_piece(piece),
            ResolverInput::Destination(square) => self.choose_destination(square),
            ResolverInput::Candidate(text) => self.choose_candidate(&text),
        }
    }

    /// Stage 1: the side that moved.
    ///
    /// The declaration wins over the position's own side to move, as long as
    /// the rules engine accepts the position with that side to move.
    #[instrument(skip(self), fields(conversation_id = %self.session.id()))]
    pub fn declare_side(&mut self, side: Side) -> Result<ResolverStage, GameError> {
        self.expect(ResolverStage::AwaitingTurn, &side.to_string())?;

        let current = self.session.position().side_to_move();
        if current != side {
            debug!(declared = %side, tracked = %current, "Declared side overrides side to move");
        }
        self.session.position().with_side_to_move(side).inspect_err(|e| {
            warn!(error = %e, "Declared side rejected");
        })?;

        self.session.selection_mut().set_side(side);
        Ok(self.stage())
    }

    /// Stage 2: the kind of piece that moved.
    #[instrument(skip(self), fields(conversation_id = %self.session.id()))]
    pub fn choose_piece(&mut self, piece: PieceKind) -> Result<ResolverStage, GameError> {
        self.expect(ResolverStage::AwaitingPieceKind, &piece.to_string())?;
        let side = self.declared_side()?;

        let candidates = self.piece_moves(side, piece)?;
        if candidates.is_empty() {
            warn!(%side, %piece, "No legal moves for piece kind");
            return Err(GameError::NoLegalMoves { side, piece });
        }

        debug!(%piece, candidates = candidates.len(), "Piece kind accepted");
        self.session.selection_mut().set_piece(piece);
        Ok(self.stage())
    }

    /// Stage 3: the destination square.
    ///
    /// One match resolves the move. Several matches fail with
    /// [`GameError::AmbiguousMove`] and leave the resolver waiting for an
    /// explicit pick among them.
    #[instrument(skip(self), fields(conversation_id = %self.session.id()))]
    pub fn choose_destination(&mut self, square: Square) -> Result<ResolverStage, GameError> {
        self.expect(ResolverStage::AwaitingDestination, &square.to_string())?;
        let side = self.declared_side()?;
        let piece = self.declared_piece()?;

        let mut matches: Vec<CandidateMove> = self
            .piece_moves(side, piece)?
            .into_iter()
            .filter(|mv| mv.to() == square)
            .collect();
        matches.sort_by_key(|mv| (mv.from(), mv.promotion()));

        match matches.len() {
            0 => {
                warn!(%piece, %square, "No candidate reaches destination");
                Err(GameError::NoMatchingMove {
                    piece,
                    target: square.to_string(),
                })
            }
            1 => {
                self.session.selection_mut().set_destination(square, matches);
                let stage = self.stage();
                debug!(%stage, "Move resolved");
                Ok(stage)
            }
            count => {
                warn!(%square, count, "Destination is ambiguous");
                self.session
                    .selection_mut()
                    .set_destination(square, matches.clone());
                Err(GameError::AmbiguousMove {
                    square,
                    candidates: matches,
                })
            }
        }
    }

    /// Follow-up pick among ambiguous candidates.
    ///
    /// Accepts the full UCI move (`e7e8q`), the origin square (`f1`) or a
    /// promotion letter/name (`q`, `queen`), as long as it singles out
    /// exactly one candidate.
    #[instrument(skip(self), fields(conversation_id = %self.session.id()))]
    pub fn choose_candidate(&mut self, choice: &str) -> Result<ResolverStage, GameError> {
        self.expect(ResolverStage::AwaitingDisambiguation, choice)?;
        let piece = self.declared_piece()?;
        let choice = choice.trim().to_ascii_lowercase();
        let live = self.session.selection().ambiguous();

        let by_uci = live.iter().find(|mv| mv.uci() == choice).copied();
        let picked = by_uci.or_else(|| {
            let matching: Vec<&CandidateMove> = match (
                choice.parse::<Square>(),
                choice.parse::<PieceKind>(),
            ) {
                (Ok(origin), _) => live.iter().filter(|mv| mv.from() == origin).collect(),
                (_, Ok(promotion)) => live
                    .iter()
                    .filter(|mv| mv.promotion() == Some(promotion))
                    .collect(),
                _ => Vec::new(),
            };
            match matching.as_slice() {
                [single] => Some(**single),
                _ => None,
            }
        });

        match picked {
            Some(mv) => {
                self.session.selection_mut().resolve(mv);
                debug!(uci = %mv.uci(), "Ambiguity resolved");
                Ok(self.stage())
            }
            None => {
                warn!(%choice, "Choice matches none of the candidates");
                Err(GameError::NoMatchingMove {
                    piece,
                    target: choice,
                })
            }
        }
    }

    /// Clears the most recent answer and returns the stage to re-prompt.
    #[instrument(skip(self), fields(conversation_id = %self.session.id()))]
    pub fn back(&mut self) -> ResolverStage {
        self.session.selection_mut().step_back();
        self.stage()
    }

    /// Candidates consistent with the selection so far.
    ///
    /// Empty while awaiting the turn; every legal move of the declared side
    /// while awaiting the piece kind.
    pub fn candidates(&self) -> Vec<CandidateMove> {
        let selection = self.session.selection();
        match self.stage() {
            ResolverStage::AwaitingTurn => Vec::new(),
            ResolverStage::AwaitingDisambiguation => selection.ambiguous().to_vec(),
            ResolverStage::Resolved(mv) => vec![mv],
            ResolverStage::AwaitingPieceKind | ResolverStage::AwaitingDestination => {
                let Some(side) = selection.side() else {
                    return Vec::new();
                };
                let Ok(basis) = self.basis(side) else {
                    return Vec::new();
                };
                basis
                    .legal_moves()
                    .into_iter()
                    .filter(|mv| selection.piece().is_none_or(|piece| mv.piece() == piece))
                    .collect()
            }
        }
    }

    fn expect(&self, expected: ResolverStage, input: &str) -> Result<(), GameError> {
        if let Some(outcome) = self.session.outcome() {
            return Err(GameError::GameOver { outcome });
        }
        let stage = self.stage();
        if std::mem::discriminant(&stage) != std::mem::discriminant(&expected) {
            warn!(%stage, %input, "Input does not fit current stage");
            return Err(GameError::UnexpectedInput {
                expected: stage,
                input: input.to_string(),
            });
        }
        Ok(())
    }

    fn basis(&self, side: Side) -> Result<Position, GameError> {
        self.session.position().with_side_to_move(side)
    }

    fn piece_moves(&self, side: Side, piece: PieceKind) -> Result<Vec<CandidateMove>, GameError> {
        Ok(self
            .basis(side)?
            .legal_moves()
            .into_iter()
            .filter(|mv| mv.piece() == piece)
            .collect())
    }

    fn declared_side(&self) -> Result<Side, GameError> {
        self.session
            .selection()
            .side()
            .ok_or_else(|| self.out_of_order())
    }

    fn declared_piece(&self) -> Result<PieceKind, GameError> {
        self.session
            .selection()
            .piece()
            .ok_or_else(|| self.out_of_order())
    }

    fn out_of_order(&self) -> GameError {
        GameError::UnexpectedInput {
            expected: self.stage(),
            input: String::new(),
        }
    }
}
