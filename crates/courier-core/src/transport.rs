//! Transport port: the opaque messaging-platform client.
//!
//! The engine only ever needs three operations against the platform; the
//! concrete client (and the whole wire protocol) lives in courier-infra.
//! Every operation can fail with a [`TransportError`], whose classification
//! predicates drive reconnects, eviction retries, and broadcast accounting.

use courier_types::ids::{ChatId, MessageId};
use courier_types::keyboard::ReplyMarkup;
use courier_types::transport::TransportError;

/// Operations the engine performs against the messaging platform.
///
/// Implementations live in courier-infra (e.g. `TelegramClient`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait Transport: Send + Sync {
    /// Send a text message, optionally with a keyboard. Returns the id the
    /// platform assigned to the new message.
    fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<ReplyMarkup>,
    ) -> impl std::future::Future<Output = Result<MessageId, TransportError>> + Send;

    /// Delete a message from a chat.
    fn delete_message(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Replace the text of an existing message.
    fn edit_message_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
