//! Telegram Bot API adapter (long polling).

use crate::chat::{ChatEvent, EventKind, Reply, ReplyOption};
use crate::config::TelegramConfig;
use crate::dispatcher::Dispatcher;
use anyhow::{Context, Result, bail};
use boardside_chess::ConversationId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Options per keyboard row.
const KEYBOARD_WIDTH: usize = 4;

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// One entry of `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// New incoming message.
    #[serde(default)]
    pub message: Option<Message>,
    /// Inline keyboard button press.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Chat the message was sent in.
    pub chat: Chat,
    /// Sender, absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Text content.
    #[serde(default)]
    pub text: Option<String>,
    /// Available sizes of an attached photo, smallest first.
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: i64,
}

/// A Telegram user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User id.
    pub id: i64,
}

/// One size of an uploaded photo.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    /// File id for `getFile`.
    pub file_id: String,
}

/// An inline keyboard button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Query id, to be answered.
    pub id: String,
    /// Who pressed the button.
    pub from: User,
    /// Message the keyboard was attached to.
    #[serde(default)]
    pub message: Option<Message>,
    /// The button's callback data.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// `reply_markup` for `sendMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    /// Button rows.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    /// Label.
    pub text: String,
    /// Sent back in the callback query.
    pub callback_data: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
}

/// A chat event extracted from an update, with where to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Chat to reply in.
    pub chat_id: i64,
    /// Callback query to acknowledge, for button presses.
    pub callback_id: Option<String>,
    /// The event for the dispatcher.
    pub event: ChatEvent,
}

/// Converts an update into a chat event. Updates the bot cannot act on
/// (stickers, edits, channel posts) yield `None`.
pub fn update_to_event(update: &Update) -> Option<Inbound> {
    if let Some(query) = &update.callback_query {
        let chat_id = query.message.as_ref().map_or(query.from.id, |m| m.chat.id);
        let payload = query.data.clone()?;
        return Some(Inbound {
            chat_id,
            callback_id: Some(query.id.clone()),
            event: ChatEvent::new(
                ConversationId::new(chat_id.to_string()),
                query.from.id.to_string(),
                EventKind::Button { payload },
            ),
        });
    }

    let message = update.message.as_ref()?;
    let user_id = message.from.as_ref().map_or(message.chat.id, |u| u.id);
    let kind = if let Some(largest) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        EventKind::Photo {
            file_id: largest.file_id.clone(),
        }
    } else {
        EventKind::Text {
            text: message.text.clone()?,
        }
    };

    Some(Inbound {
        chat_id: message.chat.id,
        callback_id: None,
        event: ChatEvent::new(
            ConversationId::new(message.chat.id.to_string()),
            user_id.to_string(),
            kind,
        ),
    })
}

/// Lays options out as inline keyboard rows.
pub fn inline_keyboard(options: &[ReplyOption]) -> Option<InlineKeyboardMarkup> {
    if options.is_empty() {
        return None;
    }
    let inline_keyboard = options
        .chunks(KEYBOARD_WIDTH)
        .map(|row| {
            row.iter()
                .map(|option| InlineKeyboardButton {
                    text: option.label.clone(),
                    callback_data: option.payload.clone(),
                })
                .collect()
        })
        .collect();
    Some(InlineKeyboardMarkup { inline_keyboard })
}

/// Long-polling Telegram bot.
#[derive(Debug, Clone)]
pub struct TelegramBot {
    client: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
    dispatcher: Arc<Dispatcher>,
}

impl TelegramBot {
    /// Creates a bot. Fails without a token.
    #[instrument(skip_all)]
    pub fn new(config: &TelegramConfig, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let Some(token) = config.token() else {
            bail!("Telegram token missing: set TELEGRAM_BOT_TOKEN or telegram.token");
        };
        let poll_timeout_secs = *config.poll_timeout_secs();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_url().trim_end_matches('/'), token),
            poll_timeout_secs,
            dispatcher,
        })
    }

    /// Polls for updates until the process is stopped.
    pub async fn run(self) -> Result<()> {
        info!("Telegram bot polling for updates");
        let mut offset = 0;
        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "Polling failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(inbound) = update_to_event(&update) else {
                    debug!(update_id = update.update_id, "Ignoring update");
                    continue;
                };
                let bot = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = bot.answer(inbound).await {
                        error!(error = %e, "Failed to answer update");
                    }
                });
            }
        }
    }

    #[instrument(skip(self, inbound), fields(chat_id = inbound.chat_id))]
    async fn answer(&self, inbound: Inbound) -> Result<()> {
        if let Some(callback_id) = &inbound.callback_id {
            self.call::<bool, _>(
                "answerCallbackQuery",
                &AnswerCallbackQuery {
                    callback_query_id: callback_id,
                },
            )
            .await?;
        }
        let reply = self.dispatcher.handle(inbound.event).await;
        self.send(inbound.chat_id, &reply).await
    }

    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        let message = SendMessage {
            chat_id,
            text: &reply.text,
            reply_markup: inline_keyboard(&reply.options),
        };
        self.call::<serde_json::Value, _>("sendMessage", &message)
            .await?;
        debug!(options = reply.options.len(), "Reply sent");
        Ok(())
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let request = GetUpdates {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: &["message", "callback_query"],
        };
        self.call("getUpdates", &request).await
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?
            .json()
            .await
            .with_context(|| format!("{} returned unreadable JSON", method))?;

        if !response.ok {
            bail!(
                "{} rejected: {}",
                method,
                response.description.unwrap_or_default()
            );
        }
        response
            .result
            .with_context(|| format!("{} returned no result", method))
    }
}
