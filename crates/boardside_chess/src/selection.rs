//! The partially built description of the opponent's move.

use crate::action::CandidateMove;
use crate::types::{PieceKind, Side};
use derive_more::Display;
use shakmaty::Square;

/// Where the move resolver currently stands.
///
/// The stage is derived from [`PendingSelection`], never stored beside it,
/// so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ResolverStage {
    /// Waiting for the side that moved.
    #[display("awaiting turn")]
    AwaitingTurn,
    /// Waiting for the kind of piece that moved.
    #[display("awaiting piece kind")]
    AwaitingPieceKind,
    /// Waiting for the destination square.
    #[display("awaiting destination")]
    AwaitingDestination,
    /// Several moves reached the destination; waiting for an explicit pick.
    #[display("awaiting disambiguation")]
    AwaitingDisambiguation,
    /// Exactly one move is fully specified and ready to commit.
    #[display("resolved {_0}")]
    Resolved(CandidateMove),
}

/// One unit of user input for the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverInput {
    /// The side that moved.
    Side(Side),
    /// The kind of piece that moved.
    Piece(PieceKind),
    /// Where it went.
    Destination(Square),
    /// Explicit pick among ambiguous candidates: a UCI move, an origin
    /// square or a promotion piece letter.
    Candidate(String),
}

impl ResolverInput {
    /// Interprets free text in the context of `stage`.
    ///
    /// Returns `None` when the text does not fit what the stage expects.
    pub fn parse_for(stage: &ResolverStage, text: &str) -> Option<Self> {
        let text = text.trim();
        match stage {
            ResolverStage::AwaitingTurn => text.parse().ok().map(ResolverInput::Side),
            ResolverStage::AwaitingPieceKind => text.parse().ok().map(ResolverInput::Piece),
            ResolverStage::AwaitingDestination => text
                .to_ascii_lowercase()
                .parse()
                .ok()
                .map(ResolverInput::Destination),
            ResolverStage::AwaitingDisambiguation => {
                (!text.is_empty()).then(|| ResolverInput::Candidate(text.to_string()))
            }
            ResolverStage::Resolved(_) => None,
        }
    }
}

impl std::fmt::Display for ResolverInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverInput::Side(side) => write!(f, "{}", side),
            ResolverInput::Piece(piece) => write!(f, "{}", piece),
            ResolverInput::Destination(square) => write!(f, "{}", square),
            ResolverInput::Candidate(text) => write!(f, "{}", text),
        }
    }
}

/// Partially specified opponent move.
///
/// Fields fill strictly in order: side, then piece kind, then destination.
/// The ambiguous list is only populated together with the destination, and
/// the resolved move only once a single candidate remains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelection {
    side: Option<Side>,
    piece: Option<PieceKind>,
    destination: Option<Square>,
    ambiguous: Vec<CandidateMove>,
    resolved: Option<CandidateMove>,
}

impl PendingSelection {
    /// Declared side, if any.
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Declared piece kind, if any.
    pub fn piece(&self) -> Option<PieceKind> {
        self.piece
    }

    /// Declared destination, if any.
    pub fn destination(&self) -> Option<Square> {
        self.destination
    }

    /// Candidates awaiting an explicit pick.
    pub fn ambiguous(&self) -> &[CandidateMove] {
        &self.ambiguous
    }

    /// True when nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.side.is_none()
    }

    /// Stage implied by the filled fields.
    pub fn stage(&self) -> ResolverStage {
        if let Some(mv) = self.resolved {
            ResolverStage::Resolved(mv)
        } else if self.destination.is_some() {
            ResolverStage::AwaitingDisambiguation
        } else if self.piece.is_some() {
            ResolverStage::AwaitingDestination
        } else if self.side.is_some() {
            ResolverStage::AwaitingPieceKind
        } else {
            ResolverStage::AwaitingTurn
        }
    }

    pub(crate) fn set_side(&mut self, side: Side) {
        *self = Self {
            side: Some(side),
            ..Self::default()
        };
    }

    pub(crate) fn set_piece(&mut self, piece: PieceKind) {
        debug_assert!(self.side.is_some(), "piece kind set before side");
        self.piece = Some(piece);
        self.destination = None;
        self.ambiguous.clear();
        self.resolved = None;
    }

    pub(crate) fn set_destination(&mut self, square: Square, matches: Vec<CandidateMove>) {
        debug_assert!(self.piece.is_some(), "destination set before piece kind");
        self.destination = Some(square);
        if let [single] = matches.as_slice() {
            self.resolved = Some(*single);
            self.ambiguous.clear();
        } else {
            self.resolved = None;
            self.ambiguous = matches;
        }
    }

    pub(crate) fn resolve(&mut self, mv: CandidateMove) {
        debug_assert!(self.destination.is_some(), "resolved before destination");
        self.ambiguous.clear();
        self.resolved = Some(mv);
    }

    /// Clears the most recently filled field.
    pub(crate) fn step_back(&mut self) {
        if self.destination.is_some() {
            self.destination = None;
            self.ambiguous.clear();
            self.resolved = None;
        } else if self.piece.is_some() {
            self.piece = None;
        } else {
            self.side = None;
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
