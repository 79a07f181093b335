//! Rate-limited, partial-failure-tolerant broadcast dispatcher.
//!
//! Sends one message to many recipients strictly sequentially with a fixed
//! pacing delay between attempts. The serialization is deliberate
//! backpressure: one outstanding remote call at a time, deterministic
//! ordering of the success/failure accounting. Individual failures are
//! classified, logged, and counted; the batch always runs to completion.

use std::time::Duration;

use courier_types::broadcast::{BroadcastOutcome, BroadcastTarget};
use courier_types::config::EngineConfig;
use courier_types::ids::ChatId;
use tracing::{error, info, warn};

use crate::transport::Transport;

/// Sequential broadcast dispatcher.
pub struct Dispatcher {
    pacing: Duration,
}

impl Dispatcher {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.broadcast_pacing())
    }

    /// Send `text` to every target, returning the aggregate counts once the
    /// whole list is exhausted.
    ///
    /// Targets without a deliverable chat id are counted as `failed` up
    /// front and excluded from `total`. Send attempts are exhaustive: no
    /// failure short-circuits the batch.
    pub async fn dispatch<T: Transport>(
        &self,
        transport: &T,
        targets: &[BroadcastTarget],
        text: &str,
    ) -> BroadcastOutcome {
        let mut failed = 0u32;
        let deliverable: Vec<ChatId> = targets
            .iter()
            .filter_map(|target| {
                if target.chat.is_none() {
                    failed += 1;
                }
                target.chat
            })
            .collect();
        let total = deliverable.len() as u32;

        let mut success = 0u32;
        for (i, chat) in deliverable.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pacing).await;
            }
            match transport.send_message(chat, text, None).await {
                Ok(_) => success += 1,
                Err(err) if err.is_recipient_unreachable() => {
                    warn!(%chat, error = %err, "broadcast recipient unreachable");
                    failed += 1;
                }
                Err(err) => {
                    error!(%chat, error = %err, "broadcast send failed");
                    failed += 1;
                }
            }
        }

        let outcome = BroadcastOutcome {
            success,
            failed,
            total,
        };
        info!(
            success = outcome.success,
            failed = outcome.failed,
            total = outcome.total,
            "broadcast finished"
        );
        outcome
    }
}
