//! Transport error taxonomy and classification predicates.
//!
//! The engine never inspects raw error strings. The transport adapter maps
//! platform errors into this closed set of variants once, at the edge, and
//! the rest of the system branches on the predicates below:
//!
//! - [`TransportError::is_connection_loss`] -- reconnect class
//! - [`TransportError::is_recipient_unreachable`] -- permanent per-recipient
//! - [`TransportError::is_message_gone`] -- idempotent success for deletes

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the messaging-platform transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach the platform at all (DNS, refused, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The platform did not answer in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The platform asked us to back off.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The bot token was rejected.
    #[error("bot credential rejected")]
    Unauthorized,

    /// The target chat does not exist (or the bot was never in it).
    #[error("chat not found")]
    ChatNotFound,

    /// The recipient blocked the bot.
    #[error("bot was blocked by the recipient")]
    BotBlocked,

    /// The recipient account no longer exists.
    #[error("recipient account is deactivated")]
    UserDeactivated,

    /// The message to delete is already gone.
    #[error("message to delete not found")]
    MessageNotFound,

    /// The platform refuses to delete the message (too old, not ours).
    #[error("message can't be deleted")]
    MessageNotDeletable,

    /// Any other platform-reported failure, kept verbatim for the logs.
    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },
}

impl TransportError {
    /// Errors that mean the session itself is unhealthy and a reconnect
    /// should be attempted.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_) | TransportError::Timeout(_)
        )
    }

    /// Permanent per-recipient failures: the send can never succeed for this
    /// recipient, but the batch and the session are fine.
    pub fn is_recipient_unreachable(&self) -> bool {
        matches!(
            self,
            TransportError::ChatNotFound
                | TransportError::BotBlocked
                | TransportError::UserDeactivated
        )
    }

    /// Delete failures that mean the message is already gone. Treated as
    /// success by window eviction: the bookkeeping goal is an empty slot,
    /// not a confirmed remote delete.
    pub fn is_message_gone(&self) -> bool {
        matches!(
            self,
            TransportError::MessageNotFound | TransportError::MessageNotDeletable
        )
    }
}
