//! Broadcast input and result types.

use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

/// One intended broadcast recipient.
///
/// `chat` is absent when the user record carries no deliverable identifier;
/// such targets are counted as failed without a send attempt.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastTarget {
    pub chat: Option<ChatId>,
}

/// Aggregate accounting for one completed broadcast.
///
/// `total` counts only targets that had a deliverable identifier, while
/// `failed` also includes the ones filtered out up front -- so
/// `success + failed` can exceed `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    pub success: u32,
    pub failed: u32,
    pub total: u32,
}
