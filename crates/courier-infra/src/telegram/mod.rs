//! Telegram Bot API adapter.
//!
//! `TelegramClient` implements the courier-core `Transport` port over the
//! HTTPS Bot API, plus the session operations the polling loop needs
//! (`get_me`, `get_updates`, `answer_callback_query`).

mod client;
mod types;

pub use client::TelegramClient;
pub use types::{
    Account, BotProfile, CallbackQuery, Chat, Contact, IncomingMessage, Update,
};
