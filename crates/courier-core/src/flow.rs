//! Single-slot per-user conversation state.
//!
//! Each user has at most one [`PendingFlow`] -- the remembered next step of
//! a conversation ("waiting for an order number", "composing a broadcast").
//! `set` overwrites unconditionally, `consume` reads and clears in one step.
//! The store is purely in-memory; after a restart a half-done flow simply
//! restarts from the menu.

use courier_types::flow::PendingFlow;
use courier_types::ids::TelegramUserId;
use dashmap::DashMap;
use tracing::debug;

/// Per-user pending-flow store.
///
/// Events for one user arrive in order, so there are no concurrent writers
/// for the same key; the map only has to be safe against *different* users
/// being handled around the same wall-clock moment.
#[derive(Default)]
pub struct FlowStore {
    flows: DashMap<TelegramUserId, PendingFlow>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the next step for a user. Last write wins: an existing flow
    /// of either kind is superseded.
    pub fn set(&self, user: TelegramUserId, flow: PendingFlow) {
        if let Some(previous) = self.flows.insert(user, flow) {
            debug!(%user, ?previous, ?flow, "pending flow superseded");
        } else {
            debug!(%user, ?flow, "pending flow set");
        }
    }

    /// Read and clear the pending flow in one step.
    ///
    /// A second consume without an intervening `set` returns `None`.
    pub fn consume(&self, user: TelegramUserId) -> Option<PendingFlow> {
        self.flows.remove(&user).map(|(_, flow)| flow)
    }

    /// Read the pending flow without clearing it. Used for read-only
    /// branching, e.g. checking for broadcast mode before validating admin
    /// privileges.
    pub fn peek(&self, user: TelegramUserId) -> Option<PendingFlow> {
        self.flows.get(&user).map(|entry| *entry.value())
    }

    /// Drop the pending flow, if any.
    pub fn clear(&self, user: TelegramUserId) {
        self.flows.remove(&user);
    }
}
