//! One conversation's game: board, pending selection and history.

use crate::action::CandidateMove;
use crate::error::GameError;
use crate::outcome::GameOutcome;
use crate::position::Position;
use crate::resolver::MoveResolver;
use crate::selection::{PendingSelection, ResolverInput, ResolverStage};
use crate::types::{PieceKind, Side};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Identifier of one chat conversation.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A game session for one conversation.
///
/// Owns the current [`Position`] and the [`PendingSelection`] under
/// construction. The position only changes through [`GameSession::commit`],
/// which re-validates against the rules engine.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: ConversationId,
    position: Position,
    selection: PendingSelection,
    history: Vec<String>,
    repetitions: BTreeMap<String, u32>,
}

impl GameSession {
    /// Creates a session at the standard starting position.
    #[instrument(skip_all, fields(conversation_id = %id))]
    pub fn create(id: ConversationId) -> Self {
        info!("Creating new game session");
        Self::from_position(id, Position::start())
    }

    /// Creates a session starting from `position`.
    #[instrument(skip_all, fields(conversation_id = %id, fen = %position))]
    pub fn from_position(id: ConversationId, position: Position) -> Self {
        let mut repetitions = BTreeMap::new();
        repetitions.insert(position.repetition_key(), 1);
        Self {
            id,
            position,
            selection: PendingSelection::default(),
            history: Vec::new(),
            repetitions,
        }
    }

    /// Conversation this session belongs to.
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Move under construction.
    pub fn selection(&self) -> &PendingSelection {
        &self.selection
    }

    pub(crate) fn selection_mut(&mut self) -> &mut PendingSelection {
        &mut self.selection
    }

    /// Current resolver stage.
    pub fn stage(&self) -> ResolverStage {
        self.selection.stage()
    }

    /// Moves played so far, in UCI notation.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Borrows the move resolver for this session.
    pub fn resolver(&mut self) -> MoveResolver<'_> {
        MoveResolver::new(self)
    }

    /// Clears the pending selection and returns to
    /// [`ResolverStage::AwaitingTurn`]. The position is untouched.
    #[instrument(skip(self), fields(conversation_id = %self.id))]
    pub fn reset_selection(&mut self) {
        debug!(stage = %self.stage(), "Resetting selection");
        self.selection.clear();
    }

    /// Applies `mv` through the rules engine.
    ///
    /// The move is checked against the legal moves of the current position
    /// with the move's side to move. On failure nothing changes; on success
    /// the position is replaced and the selection reset.
    #[instrument(skip(self), fields(conversation_id = %self.id, uci = %mv.uci()))]
    pub fn commit(&mut self, mv: &CandidateMove) -> Result<&Position, GameError> {
        if let Some(outcome) = self.outcome() {
            warn!(%outcome, "Commit attempted on finished game");
            return Err(GameError::GameOver { outcome });
        }

        let basis = self
            .position
            .with_side_to_move(mv.side())
            .map_err(|_| GameError::IllegalMove { uci: mv.uci() })?;
        let next = basis.play(mv).inspect_err(|e| {
            warn!(error = %e, "Rules engine rejected move");
        })?;

        *self.repetitions.entry(next.repetition_key()).or_insert(0) += 1;
        self.history.push(mv.uci());
        self.position = next;
        self.selection.clear();

        info!(
            fen = %self.position,
            moves = self.history.len(),
            "Move committed"
        );
        Ok(&self.position)
    }

    /// How the game ended, if it has.
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.position.board_outcome().or_else(|| {
            let seen = self
                .repetitions
                .get(&self.position.repetition_key())
                .copied()
                .unwrap_or(0);
            (seen >= 3).then_some(GameOutcome::ThreefoldRepetition)
        })
    }

    /// True once the game has ended; [`GameSession::commit`] then refuses
    /// every move until the session is restarted.
    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Starts over from the standard position.
    pub fn restart(&mut self) {
        self.restart_from(Position::start());
    }

    /// Starts over from `position`, dropping history and selection.
    #[instrument(skip_all, fields(conversation_id = %self.id, fen = %position))]
    pub fn restart_from(&mut self, position: Position) {
        info!("Restarting game");
        *self = Self::from_position(self.id.clone(), position);
    }

    /// Serializable copy of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let selection = &self.selection;
        SessionSnapshot {
            conversation_id: self.id.clone(),
            fen: self.position.to_fen(),
            moves: self.history.clone(),
            repetitions: self.repetitions.clone(),
            side: selection.side(),
            piece: selection.piece(),
            destination: match self.stage() {
                ResolverStage::AwaitingDisambiguation => {
                    selection.destination().map(|sq| sq.to_string())
                }
                _ => None,
            },
        }
    }

    /// Rebuilds a session from a snapshot.
    ///
    /// The pending selection is replayed through the resolver so the
    /// restored session satisfies the same invariants as a live one. A
    /// selection that no longer fits the position is dropped.
    #[instrument(skip_all, fields(conversation_id = %snapshot.conversation_id))]
    pub fn restore(snapshot: SessionSnapshot) -> Result<Self, GameError> {
        let position = Position::from_fen(&snapshot.fen)?;
        let mut session = Self::from_position(snapshot.conversation_id, position);
        session.history = snapshot.moves;
        if !snapshot.repetitions.is_empty() {
            session.repetitions = snapshot.repetitions;
        }

        let mut inputs = Vec::new();
        inputs.extend(snapshot.side.map(ResolverInput::Side));
        inputs.extend(snapshot.piece.map(ResolverInput::Piece));
        if let Some(destination) = snapshot.destination {
            match destination.parse() {
                Ok(square) => inputs.push(ResolverInput::Destination(square)),
                Err(_) => warn!(%destination, "Dropping unparseable destination"),
            }
        }

        for input in inputs {
            let replayed = session.resolver().submit(input);
            match replayed {
                Ok(_) | Err(GameError::AmbiguousMove { .. }) => {}
                Err(e) => {
                    warn!(error = %e, "Stored selection no longer applies, resetting");
                    session.reset_selection();
                    break;
                }
            }
        }
        if matches!(session.stage(), ResolverStage::Resolved(_)) {
            session.selection.step_back();
        }

        debug!(stage = %session.stage(), "Session restored");
        Ok(session)
    }
}

/// Persistable record of a [`GameSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Conversation key.
    pub conversation_id: ConversationId,
    /// Current position.
    pub fen: String,
    /// Moves played, in UCI notation.
    pub moves: Vec<String>,
    /// Occurrence count per repetition key.
    #[serde(default)]
    pub repetitions: BTreeMap<String, u32>,
    /// Pending side.
    pub side: Option<Side>,
    /// Pending piece kind.
    pub piece: Option<PieceKind>,
    /// Pending destination, only stored while disambiguating.
    pub destination: Option<String>,
}
