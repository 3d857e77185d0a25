//! Plain-text rendering of prompts, moves and errors.

use crate::chat::{Reply, ReplyOption};
use crate::engine::Analysis;
use boardside_chess::{
    CandidateMove, GameError, GameOutcome, GameSession, PieceKind, Position, ResolverStage, Side,
    Square,
};
use std::collections::BTreeSet;
use strum::IntoEnumIterator;

/// Usage summary for `/help`.
pub const HELP: &str = "\
Report each move made on your board in three steps: who moved, which piece, \
and the square it went to. I answer with the engine's move.

Commands:
/new - new game from the starting position
/fen <FEN> - new game from a position (a bare FEN works too)
/board - show the board
/analyze - ask the engine about the current position
/cancel - forget this game
/help - this message

You can also type answers: white, black, knight, e4, back.";

/// Greeting for `/start`.
pub const WELCOME: &str = "Welcome to Boardside! Play on your own board and tell me the moves.";

/// Reply to a photo upload.
pub const PHOTO_UNSUPPORTED: &str =
    "I can't read board photos. Send the position as FEN, or report the move step by step.";

/// Reply when the engine or database failed.
pub const TRY_AGAIN: &str = "Something went wrong on my side. Please try again.";

/// Reply while another message for the conversation is in flight.
pub const BUSY: &str = "Still working on your previous message, one moment.";

/// Human-readable description of a move, e.g. `White knight g1-f3`.
pub fn move_text(mv: &CandidateMove) -> String {
    let side = mv.side().label();
    if mv.is_castle() {
        let (wing, notation) = if mv.to().file() > mv.from().file() {
            ("kingside", "O-O")
        } else {
            ("queenside", "O-O-O")
        };
        return format!("{} castles {} ({})", side, wing, notation);
    }

    let joint = if mv.is_capture() { 'x' } else { '-' };
    let mut text = format!("{} {} {}{}{}", side, mv.piece(), mv.from(), joint, mv.to());
    if let Some(promotion) = mv.promotion() {
        text.push_str(&format!(" promoting to {}", promotion));
    }
    text
}

/// Board diagram plus whose turn it is.
pub fn board_text(position: &Position) -> String {
    format!(
        "{}\n\n{} to move. FEN: {}",
        position.diagram(),
        position.side_to_move().label(),
        position
    )
}

/// How a finished game is announced.
pub fn outcome_text(outcome: &GameOutcome) -> String {
    format!("Game over: {} ({}). Send /new to play again.", outcome, outcome.result())
}

/// The engine's recommendation, e.g. `Engine suggests Black knight g8-f6 (+0.21).`
pub fn analysis_text(mv: &CandidateMove, analysis: &Analysis) -> String {
    let mut text = format!("Engine suggests {}", move_text(mv));
    if let Some(score) = analysis.score {
        text.push_str(&format!(" ({})", score));
    }
    text.push('.');
    text
}

/// User-facing explanation of a rejected input.
pub fn error_text(error: &GameError) -> String {
    match error {
        GameError::InvalidTurn { declared, .. } => {
            format!("{} can't be the side to move in this position.", capitalize(declared))
        }
        GameError::NoLegalMoves { side, piece } => {
            format!("No {} {} can move right now. Which piece moved?", side, piece)
        }
        GameError::NoMatchingMove { piece, target } => {
            format!("No {} can move to {}. Try another square.", piece, target)
        }
        GameError::AmbiguousMove { square, .. } => {
            format!("More than one move reaches {}. Which one was it?", square)
        }
        GameError::IllegalMove { uci } => format!("{} is not legal here.", uci),
        GameError::SessionBusy { .. } => BUSY.to_string(),
        GameError::EngineTimeout { .. } => {
            "The engine took too long to answer. Press Analyze to try again.".to_string()
        }
        GameError::UnexpectedInput { input, .. } if input.is_empty() => {
            "That doesn't fit here.".to_string()
        }
        GameError::UnexpectedInput { input, .. } => format!("I didn't understand '{}'.", input),
        GameError::GameOver { outcome } => outcome_text(outcome),
        GameError::InvalidPosition { .. } => {
            "That position isn't valid. Check the FEN and send it again.".to_string()
        }
    }
}

/// The prompt for the session's current stage, with its options.
pub fn stage_prompt(session: &mut GameSession) -> Reply {
    if let Some(outcome) = session.outcome() {
        return Reply::text(outcome_text(&outcome)).with_options([new_game_option()]);
    }

    let to_move = session.position().side_to_move();
    let selection = session.selection().clone();
    let resolver = session.resolver();
    let candidates = resolver.candidates();

    match resolver.stage() {
        ResolverStage::AwaitingTurn => Reply::text(format!(
            "Who moved? The board says {} is to move.",
            to_move.label()
        ))
        .with_options(
            Side::iter().map(|side| ReplyOption::new(side.label(), format!("side:{}", side))),
        )
        .with_options([analyze_option()]),

        ResolverStage::AwaitingPieceKind => {
            let side = selection.side().unwrap_or(to_move);
            Reply::text(format!("Which {} piece moved?", side))
                .with_options(PieceKind::iter().map(|piece| {
                    ReplyOption::new(
                        format!("{} {}", piece.glyph(side), piece.label()),
                        format!("piece:{}", piece),
                    )
                }))
                .with_options([back_option()])
        }

        ResolverStage::AwaitingDestination => {
            let piece = selection.piece().map(|p| p.to_string()).unwrap_or_default();
            let targets: BTreeSet<Square> = candidates.iter().map(|mv| mv.to()).collect();
            Reply::text(format!("Where did the {} go?", piece))
                .with_options(
                    targets
                        .into_iter()
                        .map(|sq| ReplyOption::new(sq.to_string(), format!("square:{}", sq))),
                )
                .with_options([back_option()])
        }

        ResolverStage::AwaitingDisambiguation => Reply::text("Which move was it?")
            .with_options(
                candidates
                    .iter()
                    .map(|mv| ReplyOption::new(move_text(mv), format!("move:{}", mv.uci()))),
            )
            .with_options([back_option()]),

        ResolverStage::Resolved(mv) => Reply::text(format!("Ready to play {}.", move_text(&mv))),
    }
}

/// Option that starts a new game.
pub fn new_game_option() -> ReplyOption {
    ReplyOption::new("New game", "new")
}

/// Option that retries the engine query.
pub fn analyze_option() -> ReplyOption {
    ReplyOption::new("Analyze", "analyze")
}

fn back_option() -> ReplyOption {
    ReplyOption::new("Back", "back")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
