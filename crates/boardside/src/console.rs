//! Terminal adapter: one conversation over stdin and stdout.

use crate::chat::{ChatEvent, EventKind, Reply};
use crate::dispatcher::Dispatcher;
use boardside_chess::ConversationId;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, instrument};

/// Maps a typed line to an event. A number picks one of the options
/// shown last; anything else is sent as text.
pub fn line_to_event(line: &str, last: &Reply) -> EventKind {
    let line = line.trim();
    if let Some(option) = line
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| last.options.get(index))
    {
        return EventKind::Button {
            payload: option.payload.clone(),
        };
    }
    EventKind::Text {
        text: line.to_string(),
    }
}

/// Formats a reply with numbered options.
pub fn render(reply: &Reply) -> String {
    let mut out = reply.text.clone();
    for (index, option) in reply.options.iter().enumerate() {
        out.push_str(&format!("\n  {}) {}", index + 1, option.label));
    }
    out
}

/// Reads lines until end of input or `quit`.
#[instrument(skip(dispatcher))]
pub async fn run(dispatcher: Arc<Dispatcher>, conversation: &str) -> anyhow::Result<()> {
    let id = ConversationId::from(conversation);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut last = dispatcher
        .handle(ChatEvent::new(
            id.clone(),
            "console".to_string(),
            EventKind::Text {
                text: "/start".to_string(),
            },
        ))
        .await;
    stdout
        .write_all(format!("{}\n> ", render(&last)).as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        let kind = line_to_event(&line, &last);
        last = dispatcher
            .handle(ChatEvent::new(id.clone(), "console".to_string(), kind))
            .await;
        stdout
            .write_all(format!("\n{}\n> ", render(&last)).as_bytes())
            .await?;
        stdout.flush().await?;
    }

    info!("Console session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ReplyOption;

    fn prompt() -> Reply {
        Reply::text("Who moved?").with_options([
            ReplyOption::new("White", "side:white"),
            ReplyOption::new("Black", "side:black"),
        ])
    }

    #[test]
    fn test_number_picks_option() {
        assert_eq!(
            line_to_event(" 2 ", &prompt()),
            EventKind::Button {
                payload: "side:black".to_string()
            }
        );
    }

    #[test]
    fn test_out_of_range_number_is_text() {
        for line in ["0", "3"] {
            assert_eq!(
                line_to_event(line, &prompt()),
                EventKind::Text {
                    text: line.to_string()
                }
            );
        }
    }

    #[test]
    fn test_render_numbers_options() {
        assert_eq!(render(&prompt()), "Who moved?\n  1) White\n  2) Black");
    }
}
