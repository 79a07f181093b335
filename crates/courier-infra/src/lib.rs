//! Infrastructure implementations for Courier.
//!
//! Concrete adapters behind the courier-core ports: the Telegram Bot API
//! transport client, the SQLite user store, and the configuration loader.

pub mod config;
pub mod sqlite;
pub mod telegram;
