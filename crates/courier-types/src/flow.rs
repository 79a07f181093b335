//! Per-user pending-flow state.
//!
//! Each user has at most one remembered next step. The variants are mutually
//! exclusive by construction: entering the broadcast composer cancels a
//! pending order request and vice versa (last write wins).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which order document the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDocKind {
    /// Shipment tracking number.
    Ttn,
    /// Purchase receipt.
    Receipt,
}

impl fmt::Display for OrderDocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDocKind::Ttn => write!(f, "ttn"),
            OrderDocKind::Receipt => write!(f, "receipt"),
        }
    }
}

/// Audience of an admin broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastAudience {
    /// Every user with a deliverable identifier.
    All,
    /// VIP-flagged users only.
    Vip,
}

impl fmt::Display for BroadcastAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastAudience::All => write!(f, "all"),
            BroadcastAudience::Vip => write!(f, "vip"),
        }
    }
}

/// The single remembered next step for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingFlow {
    /// Waiting for the user to send an order number.
    AwaitingOrderNumber(OrderDocKind),
    /// Admin is composing a broadcast; the next text message is the payload.
    ComposingBroadcast(BroadcastAudience),
}
