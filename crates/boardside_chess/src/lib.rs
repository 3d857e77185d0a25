//! Conversational move resolution for chess played on a physical board.
//!
//! The user reports each opponent move in three small answers (who moved,
//! which kind of piece, where it went). The [`MoveResolver`] narrows the
//! rules engine's legal moves with every answer until exactly one fits,
//! and the [`GameSession`] commits it.
//!
//! # Example
//!
//! ```
//! use boardside_chess::{ConversationId, GameSession, PieceKind, ResolverStage, Side};
//!
//! let mut session = GameSession::create(ConversationId::from("chat-1"));
//! let mut resolver = session.resolver();
//! resolver.declare_side(Side::White)?;
//! resolver.choose_piece(PieceKind::Pawn)?;
//! let stage = resolver.choose_destination("e4".parse().expect("square"))?;
//!
//! let ResolverStage::Resolved(mv) = stage else { panic!("expected a single move") };
//! assert_eq!(mv.uci(), "e2e4");
//! session.commit(&mv)?;
//! # Ok::<(), boardside_chess::GameError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod error;
mod outcome;
mod position;
mod registry;
mod resolver;
mod selection;
mod session;
mod types;

pub use action::CandidateMove;
pub use error::GameError;
pub use outcome::GameOutcome;
pub use position::{Position, START_FEN};
pub use registry::{SessionGuard, SessionHandle, SessionRegistry};
pub use resolver::MoveResolver;
pub use selection::{PendingSelection, ResolverInput, ResolverStage};
pub use session::{ConversationId, GameSession, SessionSnapshot};
pub use types::{PieceKind, Side};

/// Re-export of the square type used throughout the API.
pub use shakmaty::Square;
