//! TelegramClient -- concrete [`Transport`] implementation for the Bot API.
//!
//! Every method call posts JSON to `{base_url}/bot{token}/{method}` and
//! decodes the standard response envelope. Platform failures are mapped into
//! the structured [`TransportError`] taxonomy exactly once, here at the
//! edge; nothing past this module ever inspects an error description string.
//!
//! The bot token is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use courier_core::transport::Transport;
use courier_types::ids::{ChatId, MessageId};
use courier_types::keyboard::ReplyMarkup;
use courier_types::transport::TransportError;

use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, BotProfile, DeleteMessageRequest,
    EditMessageTextRequest, GetUpdatesRequest, SendMessageRequest, Update, WireReplyMarkup,
};

/// Telegram Bot API client.
pub struct TelegramClient {
    client: reqwest::Client,
    token: SecretString,
    base_url: String,
    poll_timeout: u64,
}

impl TelegramClient {
    /// Create a new client.
    ///
    /// The HTTP timeout leaves headroom over the long-poll timeout so a
    /// quiet `getUpdates` call is not misread as a connection loss.
    pub fn new(token: &SecretString, poll_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            token: SecretString::from(token.expose_secret().to_string()),
            base_url: "https://api.telegram.org".to_string(),
            poll_timeout: poll_timeout_secs,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Perform the platform handshake: verify the token and fetch the bot's
    /// own profile.
    pub async fn get_me(&self) -> Result<BotProfile, TransportError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: self.poll_timeout,
            },
        )
        .await
    }

    /// Acknowledge a callback query, optionally flashing a notification.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQueryRequest {
                    callback_query_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<R, TransportError> {
        let url = format!(
            "{}/bot{}/{}",
            self.base_url,
            self.token.expose_secret(),
            method
        );

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|err| map_request_error(method, &err))?;

        let envelope: ApiResponse<R> = response
            .json()
            .await
            .map_err(|err| map_request_error(method, &err))?;

        if envelope.ok {
            envelope.result.ok_or_else(|| TransportError::Api {
                code: 0,
                description: format!("{method}: ok response without result"),
            })
        } else {
            let code = envelope.error_code.unwrap_or(0);
            let description = envelope.description.unwrap_or_default();
            let retry_after = envelope
                .parameters
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs);
            Err(map_api_error(code, &description, retry_after))
        }
    }
}

impl Transport for TelegramClient {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<ReplyMarkup>,
    ) -> Result<MessageId, TransportError> {
        let sent: super::types::IncomingMessage = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: chat.0,
                    text,
                    reply_markup: keyboard.map(WireReplyMarkup::from),
                },
            )
            .await?;
        Ok(MessageId(sent.message_id))
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<(), TransportError> {
        let _: bool = self
            .call(
                "deleteMessage",
                &DeleteMessageRequest {
                    chat_id: chat.0,
                    message_id: message.0,
                },
            )
            .await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> Result<(), TransportError> {
        // the platform returns the edited message for normal messages and
        // `true` for inline ones; either way only success matters here
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &EditMessageTextRequest {
                    chat_id: chat.0,
                    message_id: message.0,
                    text,
                },
            )
            .await?;
        Ok(())
    }
}

/// Map reqwest-level failures (nothing decodable came back).
fn map_request_error(method: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(format!("{method}: {err}"))
    } else {
        TransportError::Network(format!("{method}: {err}"))
    }
}

/// Map a decoded Bot API error into the structured taxonomy.
///
/// This is the single place the platform's description strings are
/// inspected. The substrings are the stable phrases the Bot API has used
/// for years; anything unrecognized stays an `Api` error and is handled
/// conservatively downstream.
fn map_api_error(code: i64, description: &str, retry_after: Option<Duration>) -> TransportError {
    if code == 401 {
        return TransportError::Unauthorized;
    }
    if code == 429 {
        return TransportError::RateLimited { retry_after };
    }

    let lowered = description.to_lowercase();
    if lowered.contains("message to delete not found") {
        TransportError::MessageNotFound
    } else if lowered.contains("message can't be deleted") {
        TransportError::MessageNotDeletable
    } else if lowered.contains("chat not found") {
        TransportError::ChatNotFound
    } else if lowered.contains("bot was blocked") {
        TransportError::BotBlocked
    } else if lowered.contains("user is deactivated") {
        TransportError::UserDeactivated
    } else {
        TransportError::Api {
            code,
            description: description.to_string(),
        }
    }
}
