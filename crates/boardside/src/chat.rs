//! Chat-platform neutral events, replies and command parsing.

use boardside_chess::{ConversationId, PieceKind, Position, Side, Square};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

/// One inbound message from a chat adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct ChatEvent {
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Sender.
    pub user_id: String,
    /// Message content.
    pub kind: EventKind,
}

/// Content of a [`ChatEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Free text typed by the user.
    Text {
        /// Message text.
        text: String,
    },
    /// A selectable option was pressed.
    Button {
        /// The option's payload.
        payload: String,
    },
    /// A photo was uploaded.
    Photo {
        /// Platform file id.
        file_id: String,
    },
}

/// Outbound message: text plus selectable options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Message text.
    pub text: String,
    /// Options to offer, in display order.
    pub options: Vec<ReplyOption>,
}

impl Reply {
    /// A reply without options.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
        }
    }

    /// Appends options.
    pub fn with_options(mut self, options: impl IntoIterator<Item = ReplyOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Appends `option` unless one with the same payload is already offered.
    pub fn with_option_once(mut self, option: ReplyOption) -> Self {
        if !self.options.iter().any(|o| o.payload == option.payload) {
            self.options.push(option);
        }
        self
    }

    /// Prepends a paragraph to the text.
    pub fn prefixed(mut self, paragraph: impl AsRef<str>) -> Self {
        let paragraph = paragraph.as_ref();
        if !paragraph.is_empty() {
            self.text = if self.text.is_empty() {
                paragraph.to_string()
            } else {
                format!("{}\n\n{}", paragraph, self.text)
            };
        }
        self
    }
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct ReplyOption {
    /// What the user sees.
    #[new(into)]
    pub label: String,
    /// What comes back as [`EventKind::Button`].
    #[new(into)]
    pub payload: String,
}

/// What the user asked for, independent of how it was typed or pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/start`: greeting plus the current prompt.
    Start,
    /// `/new` or `new`: fresh game from the standard position.
    NewGame,
    /// Fresh game from a given position (`/fen <FEN>` or a bare FEN).
    SetPosition(Position),
    /// `/cancel`: forget the conversation.
    Cancel,
    /// `/board`: show the position.
    Board,
    /// `/analyze` or `analyze`: ask the engine about the current position.
    Analyze,
    /// `/help`.
    Help,
    /// `back`: undo the last answer.
    Back,
    /// `side:<side>`.
    Side(Side),
    /// `piece:<kind>`.
    Piece(PieceKind),
    /// `square:<sq>`.
    Square(Square),
    /// `move:<uci>`: pick one of several candidates.
    Move(String),
    /// Anything else; interpreted by the current resolver stage.
    Answer(String),
    /// A FEN that failed to parse.
    BadPosition(String),
    /// A photo, which cannot be read.
    Photo,
}

impl ChatCommand {
    /// Interprets one event.
    #[instrument(skip_all)]
    pub fn parse(kind: &EventKind) -> Self {
        let command = match kind {
            EventKind::Photo { .. } => ChatCommand::Photo,
            EventKind::Button { payload } => Self::parse_payload(payload.trim())
                .unwrap_or_else(|| ChatCommand::Answer(payload.trim().to_string())),
            EventKind::Text { text } => Self::parse_text(text.trim()),
        };
        trace!(?command, "Parsed chat command");
        command
    }

    fn parse_text(text: &str) -> Self {
        if let Some(command) = text.strip_prefix('/') {
            let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
            // Telegram appends the bot name in groups: /start@boardside_bot.
            let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();
            return match name.as_str() {
                "start" => ChatCommand::Start,
                "new" => ChatCommand::NewGame,
                "cancel" => ChatCommand::Cancel,
                "board" => ChatCommand::Board,
                "analyze" => ChatCommand::Analyze,
                "help" => ChatCommand::Help,
                "fen" => Self::parse_fen(rest.trim()),
                _ => ChatCommand::Help,
            };
        }
        if looks_like_fen(text) {
            return Self::parse_fen(text);
        }
        Self::parse_payload(text).unwrap_or_else(|| ChatCommand::Answer(text.to_string()))
    }

    fn parse_payload(payload: &str) -> Option<Self> {
        let lower = payload.to_ascii_lowercase();
        let command = match lower.split_once(':') {
            Some(("side", side)) => ChatCommand::Side(side.trim().parse().ok()?),
            Some(("piece", piece)) => ChatCommand::Piece(piece.trim().parse().ok()?),
            Some(("square", square)) => ChatCommand::Square(square.trim().parse().ok()?),
            Some(("move", uci)) => ChatCommand::Move(uci.trim().to_string()),
            Some(_) => return None,
            None => match lower.as_str() {
                "back" => ChatCommand::Back,
                "analyze" => ChatCommand::Analyze,
                "new" => ChatCommand::NewGame,
                "cancel" => ChatCommand::Cancel,
                "board" => ChatCommand::Board,
                "help" => ChatCommand::Help,
                _ => return None,
            },
        };
        Some(command)
    }

    fn parse_fen(fen: &str) -> Self {
        match Position::from_fen(fen) {
            Ok(position) => ChatCommand::SetPosition(position),
            Err(_) => ChatCommand::BadPosition(fen.to_string()),
        }
    }
}

/// A FEN placement has eight ranks separated by seven slashes.
fn looks_like_fen(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .is_some_and(|placement| placement.matches('/').count() == 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str) -> EventKind {
        EventKind::Text {
            text: text.to_string(),
        }
    }

    fn button(payload: &str) -> EventKind {
        EventKind::Button {
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(ChatCommand::parse(&text("/start")), ChatCommand::Start);
        assert_eq!(ChatCommand::parse(&text("/new@boardside_bot")), ChatCommand::NewGame);
        assert_eq!(ChatCommand::parse(&text("/CANCEL")), ChatCommand::Cancel);
        assert_eq!(ChatCommand::parse(&text("/unknown")), ChatCommand::Help);
    }

    #[test]
    fn test_parse_fen_command_and_bare_fen() {
        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        let expected = ChatCommand::SetPosition(Position::from_fen(fen).expect("valid"));
        assert_eq!(ChatCommand::parse(&text(&format!("/fen {fen}"))), expected);
        assert_eq!(ChatCommand::parse(&text(fen)), expected);

        let bad = "8/8/8/8/8/8/8/8 w - - 0 1";
        assert_eq!(
            ChatCommand::parse(&text(bad)),
            ChatCommand::BadPosition(bad.to_string())
        );
    }

    #[test]
    fn test_parse_payloads() {
        assert_eq!(ChatCommand::parse(&button("side:black")), ChatCommand::Side(Side::Black));
        assert_eq!(
            ChatCommand::parse(&button("piece:knight")),
            ChatCommand::Piece(PieceKind::Knight)
        );
        assert_eq!(ChatCommand::parse(&button("square:e4")), ChatCommand::Square(Square::E4));
        assert_eq!(
            ChatCommand::parse(&button("move:e7e8q")),
            ChatCommand::Move("e7e8q".to_string())
        );
        assert_eq!(ChatCommand::parse(&button("back")), ChatCommand::Back);
        assert_eq!(ChatCommand::parse(&text("Analyze")), ChatCommand::Analyze);
    }

    #[test]
    fn test_plain_words_are_answers() {
        assert_eq!(
            ChatCommand::parse(&text("knight")),
            ChatCommand::Answer("knight".to_string())
        );
        assert_eq!(
            ChatCommand::parse(&button("side:purple")),
            ChatCommand::Answer("side:purple".to_string())
        );
    }

    #[test]
    fn test_photo() {
        let photo = EventKind::Photo {
            file_id: "abc".to_string(),
        };
        assert_eq!(ChatCommand::parse(&photo), ChatCommand::Photo);
    }

    #[test]
    fn test_event_json_shape() {
        let event = ChatEvent::new(ConversationId::from("c1"), "u1".to_string(), text("e4"));
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({
                "conversation_id": "c1",
                "user_id": "u1",
                "kind": { "type": "text", "text": "e4" }
            })
        );
    }
}
