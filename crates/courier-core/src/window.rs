//! Bounded per-chat message window with best-effort remote eviction.
//!
//! The window tracks the ids of outstanding messages in each chat so old
//! ones can be deleted and the visible history stays short. Tracking is
//! idempotent, eviction is FIFO, and remote failures never propagate to the
//! caller: a delete that fails with an "already gone" class of error counts
//! as evicted, anything else stays in the window and is retried on the next
//! pass.
//!
//! The cache is purely in-memory. After a restart the first overflow in a
//! chat may briefly over- or under-trim until the window re-learns the
//! conversation; the remote messages themselves are unaffected.

use std::collections::VecDeque;
use std::time::Duration;

use courier_types::config::EngineConfig;
use courier_types::ids::{ChatId, MessageId};
use courier_types::keyboard::ReplyMarkup;
use courier_types::transport::TransportError;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::transport::Transport;

/// Per-chat bounded window of tracked message ids.
pub struct MessageWindow {
    windows: DashMap<ChatId, VecDeque<MessageId>>,
    capacity: usize,
    delete_pacing: Duration,
}

impl MessageWindow {
    /// Create a window store with the given capacity and delete pacing.
    pub fn new(capacity: usize, delete_pacing: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            capacity,
            delete_pacing,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.window_capacity, config.delete_pacing())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Track an inbound message. Idempotent: an id already in the window is
    /// a no-op. If the append pushes the window over capacity, eviction runs
    /// before this call resolves.
    pub async fn track<T: Transport>(&self, transport: &T, chat: ChatId, message: MessageId) {
        self.track_inner(transport, chat, message, "inbound").await;
    }

    /// Track a message the bot itself produced. Same window, same capacity,
    /// same eviction.
    pub async fn track_sent<T: Transport>(&self, transport: &T, chat: ChatId, message: MessageId) {
        self.track_inner(transport, chat, message, "sent").await;
    }

    /// Send a message and track the id the platform assigned to it.
    ///
    /// The send error (if any) is the caller's to handle; tracking and
    /// eviction errors are absorbed here as usual.
    pub async fn send_tracked<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        text: &str,
        keyboard: Option<ReplyMarkup>,
    ) -> Result<MessageId, TransportError> {
        let message = transport.send_message(chat, text, keyboard).await?;
        self.track_sent(transport, chat, message).await;
        Ok(message)
    }

    /// Drop an id from the bookkeeping without any remote call. Used when
    /// the caller already knows the message is being consumed (e.g. a button
    /// press about to delete its own message).
    pub fn remove(&self, chat: ChatId, message: MessageId) {
        if let Some(mut window) = self.windows.get_mut(&chat) {
            window.retain(|id| *id != message);
        }
    }

    /// Register a chat without tracking anything yet.
    pub fn init_chat(&self, chat: ChatId) {
        self.windows.entry(chat).or_default();
    }

    pub fn contains_chat(&self, chat: ChatId) -> bool {
        self.windows.contains_key(&chat)
    }

    pub fn contains(&self, chat: ChatId, message: MessageId) -> bool {
        self.windows
            .get(&chat)
            .is_some_and(|window| window.contains(&message))
    }

    /// Number of tracked messages in a chat.
    pub fn window_len(&self, chat: ChatId) -> usize {
        self.windows.get(&chat).map_or(0, |window| window.len())
    }

    /// Trim one chat back to capacity.
    pub async fn sweep<T: Transport>(&self, transport: &T, chat: ChatId) {
        let overflow = self
            .windows
            .get(&chat)
            .map(|window| self.overflow_of(&window))
            .unwrap_or_default();
        if !overflow.is_empty() {
            self.evict(transport, chat, overflow).await;
        }
    }

    /// Trim every known chat back to capacity. This is the periodic
    /// maintenance entry point.
    pub async fn sweep_all<T: Transport>(&self, transport: &T) {
        let chats: Vec<ChatId> = self.windows.iter().map(|entry| *entry.key()).collect();
        for chat in chats {
            self.sweep(transport, chat).await;
        }
    }

    async fn track_inner<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        message: MessageId,
        origin: &str,
    ) {
        let overflow = {
            let mut window = self.windows.entry(chat).or_default();
            if window.contains(&message) {
                return;
            }
            window.push_back(message);
            debug!(%chat, %message, len = window.len(), origin, "tracking message");
            self.overflow_of(&window)
        };

        if !overflow.is_empty() {
            self.evict(transport, chat, overflow).await;
        }
    }

    /// The oldest `len - capacity` ids, in eviction order. Empty when the
    /// window is within capacity.
    fn overflow_of(&self, window: &VecDeque<MessageId>) -> Vec<MessageId> {
        let excess = window.len().saturating_sub(self.capacity);
        window.iter().take(excess).copied().collect()
    }

    /// Delete the candidates remotely, then drop the confirmed ones from the
    /// window. "Already gone" failures count as confirmed: the target window
    /// size is the truth, not remote-delete success. Concurrent evictions for
    /// the same chat converge because a double delete reports the message as
    /// already gone.
    async fn evict<T: Transport>(&self, transport: &T, chat: ChatId, candidates: Vec<MessageId>) {
        debug!(%chat, count = candidates.len(), "evicting old messages");

        let mut confirmed = Vec::with_capacity(candidates.len());
        for (i, message) in candidates.iter().copied().enumerate() {
            match transport.delete_message(chat, message).await {
                Ok(()) => {
                    debug!(%chat, %message, "deleted old message");
                    confirmed.push(message);
                }
                Err(err) if err.is_message_gone() => {
                    confirmed.push(message);
                }
                Err(err) => {
                    // Left in the window; retried on the next eviction pass.
                    warn!(%chat, %message, error = %err, "failed to delete old message");
                }
            }
            if i + 1 < candidates.len() {
                tokio::time::sleep(self.delete_pacing).await;
            }
        }

        if let Some(mut window) = self.windows.get_mut(&chat) {
            window.retain(|id| !confirmed.contains(id));
            debug!(%chat, len = window.len(), "window after eviction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Transport double that records deletes and fails the ids it is told to.
    #[derive(Default)]
    struct FakeTransport {
        deleted: Mutex<Vec<(ChatId, MessageId)>>,
        failures: Mutex<HashMap<MessageId, TransportError>>,
        next_message_id: AtomicI64,
    }

    impl FakeTransport {
        fn fail_with(&self, message: MessageId, err: TransportError) {
            self.failures.lock().unwrap().insert(message, err);
        }

        fn deleted(&self) -> Vec<(ChatId, MessageId)> {
            self.deleted.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        async fn send_message(
            &self,
            _chat: ChatId,
            _text: &str,
            _keyboard: Option<ReplyMarkup>,
        ) -> Result<MessageId, TransportError> {
            Ok(MessageId(
                1000 + self.next_message_id.fetch_add(1, Ordering::SeqCst),
            ))
        }

        async fn delete_message(
            &self,
            chat: ChatId,
            message: MessageId,
        ) -> Result<(), TransportError> {
            if let Some(err) = self.failures.lock().unwrap().get(&message) {
                return Err(err.clone());
            }
            self.deleted.lock().unwrap().push((chat, message));
            Ok(())
        }

        async fn edit_message_text(
            &self,
            _chat: ChatId,
            _message: MessageId,
            _text: &str,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    const CHAT: ChatId = ChatId(7);

    fn window(capacity: usize) -> MessageWindow {
        MessageWindow::new(capacity, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn window_never_exceeds_capacity() {
        let transport = FakeTransport::default();
        let cache = window(4);

        for i in 1..=20 {
            cache.track(&transport, CHAT, MessageId(i)).await;
            assert!(cache.window_len(CHAT) <= 4, "window grew past capacity");
        }
    }

    #[tokio::test]
    async fn track_is_idempotent() {
        let transport = FakeTransport::default();
        let cache = window(4);

        cache.track(&transport, CHAT, MessageId(1)).await;
        cache.track(&transport, CHAT, MessageId(1)).await;
        cache.track(&transport, CHAT, MessageId(1)).await;

        assert_eq!(cache.window_len(CHAT), 1);
    }

    #[tokio::test]
    async fn eviction_deletes_exactly_the_oldest() {
        let transport = FakeTransport::default();
        let cache = window(3);

        for i in 1..=5 {
            cache.track(&transport, CHAT, MessageId(i)).await;
        }

        // ids 1 and 2 were the oldest two overflows
        assert_eq!(
            transport.deleted(),
            vec![(CHAT, MessageId(1)), (CHAT, MessageId(2))]
        );
        assert!(!cache.contains(CHAT, MessageId(1)));
        assert!(cache.contains(CHAT, MessageId(3)));
        assert!(cache.contains(CHAT, MessageId(5)));
    }

    #[tokio::test]
    async fn already_gone_deletes_are_treated_as_evicted() {
        let transport = FakeTransport::default();
        let cache = window(2);
        transport.fail_with(MessageId(1), TransportError::MessageNotFound);

        for i in 1..=3 {
            cache.track(&transport, CHAT, MessageId(i)).await;
        }

        assert_eq!(cache.window_len(CHAT), 2);
        assert!(!cache.contains(CHAT, MessageId(1)));
    }

    #[tokio::test]
    async fn unclassified_failures_are_retried_on_next_pass() {
        let transport = FakeTransport::default();
        let cache = window(2);
        transport.fail_with(
            MessageId(1),
            TransportError::Api {
                code: 500,
                description: "internal".into(),
            },
        );

        cache.track(&transport, CHAT, MessageId(1)).await;
        cache.track(&transport, CHAT, MessageId(2)).await;
        cache.track(&transport, CHAT, MessageId(3)).await;

        // delete of 1 failed with an unclassified error, so it stays
        assert!(cache.contains(CHAT, MessageId(1)));
        assert_eq!(cache.window_len(CHAT), 3);

        // next triggering call retries id 1 (now deletable) and id 2
        transport.failures.lock().unwrap().clear();
        cache.track(&transport, CHAT, MessageId(4)).await;
        assert_eq!(cache.window_len(CHAT), 2);
        assert!(!cache.contains(CHAT, MessageId(1)));
        assert!(!cache.contains(CHAT, MessageId(2)));
    }

    #[tokio::test]
    async fn remove_is_local_only() {
        let transport = FakeTransport::default();
        let cache = window(4);

        cache.track(&transport, CHAT, MessageId(1)).await;
        cache.remove(CHAT, MessageId(1));

        assert_eq!(cache.window_len(CHAT), 0);
        assert!(transport.deleted().is_empty());
    }

    #[tokio::test]
    async fn send_tracked_tracks_the_assigned_id() {
        let transport = FakeTransport::default();
        let cache = window(4);

        let id = cache
            .send_tracked(&transport, CHAT, "hello", None)
            .await
            .unwrap();
        assert!(cache.contains(CHAT, id));
    }

    #[tokio::test]
    async fn sweep_all_trims_every_chat() {
        let transport = FakeTransport::default();
        let cache = window(1);
        let other = ChatId(8);

        // fill both chats past capacity without triggering track-side
        // eviction for the second id: simulate a restart by seeding windows
        // directly through track with failing deletes
        transport.fail_with(
            MessageId(1),
            TransportError::Api {
                code: 500,
                description: "internal".into(),
            },
        );
        transport.fail_with(
            MessageId(10),
            TransportError::Api {
                code: 500,
                description: "internal".into(),
            },
        );
        cache.track(&transport, CHAT, MessageId(1)).await;
        cache.track(&transport, CHAT, MessageId(2)).await;
        cache.track(&transport, other, MessageId(10)).await;
        cache.track(&transport, other, MessageId(11)).await;
        assert_eq!(cache.window_len(CHAT), 2);
        assert_eq!(cache.window_len(other), 2);

        transport.failures.lock().unwrap().clear();
        cache.sweep_all(&transport).await;

        assert_eq!(cache.window_len(CHAT), 1);
        assert_eq!(cache.window_len(other), 1);
    }

    #[tokio::test]
    async fn init_chat_registers_without_tracking() {
        let cache = window(4);
        assert!(!cache.contains_chat(CHAT));
        cache.init_chat(CHAT);
        assert!(cache.contains_chat(CHAT));
        assert_eq!(cache.window_len(CHAT), 0);
    }
}
