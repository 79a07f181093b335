//! Wire types for the slice of the Bot API the engine consumes.
//!
//! Unknown fields are ignored on deserialization; the bot only reads what it
//! acts on.

use serde::{Deserialize, Serialize};

use courier_types::keyboard::{InlineButton, KeyboardButton, ReplyMarkup};

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

/// Extra error context the platform attaches to some failures.
#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// The bot's own account, returned by the `getMe` handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct BotProfile {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

/// One long-poll update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub from: Option<Account>,
    pub chat: Chat,
    pub text: Option<String>,
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Account,
    pub message: Option<IncomingMessage>,
    pub data: Option<String>,
}

// ---------------------------------------------------------------------------
// Outgoing payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<WireReplyMarkup>,
}

#[derive(Debug, Serialize)]
pub struct DeleteMessageRequest {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct EditMessageTextRequest<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQueryRequest<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
}

/// Wire form of the transport-neutral [`ReplyMarkup`].
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WireReplyMarkup {
    Inline {
        inline_keyboard: Vec<Vec<WireInlineButton>>,
    },
    Keyboard {
        keyboard: Vec<Vec<WireKeyboardButton>>,
        resize_keyboard: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct WireInlineButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Serialize)]
pub struct WireKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
}

impl From<ReplyMarkup> for WireReplyMarkup {
    fn from(markup: ReplyMarkup) -> Self {
        match markup {
            ReplyMarkup::Inline { rows } => WireReplyMarkup::Inline {
                inline_keyboard: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(WireInlineButton::from).collect())
                    .collect(),
            },
            ReplyMarkup::Keyboard { rows } => WireReplyMarkup::Keyboard {
                keyboard: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(WireKeyboardButton::from).collect())
                    .collect(),
                resize_keyboard: true,
            },
        }
    }
}

impl From<InlineButton> for WireInlineButton {
    fn from(button: InlineButton) -> Self {
        Self {
            text: button.text,
            callback_data: button.callback_data,
        }
    }
}

impl From<KeyboardButton> for WireKeyboardButton {
    fn from(button: KeyboardButton) -> Self {
        Self {
            text: button.text,
            request_contact: button.request_contact,
        }
    }
}
