//! Thin handler/router layer: maps inbound events onto the engine.
//!
//! Every update flows through `handle_event` exactly once, strictly in
//! arrival order. The common middleware tracks inbound messages into the
//! window, upserts the sender, and records a visit; the branches below it
//! are plain menu plumbing around the four core components (window, flow
//! store, dispatcher, supervisor-owned session).
//!
//! Failures here never reach the user as raw transport errors: sends are
//! logged and reported to the supervisor's observer, broadcasts surface
//! aggregate counts or a generic failure line.

pub mod menu;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use courier_core::broadcast::Dispatcher;
use courier_core::flow::FlowStore;
use courier_core::orders::OrderDirectory;
use courier_core::repository::UserRepository;
use courier_core::transport::Transport;
use courier_core::window::MessageWindow;
use courier_infra::telegram::Update;
use courier_types::broadcast::BroadcastTarget;
use courier_types::flow::{BroadcastAudience, OrderDocKind, PendingFlow};
use courier_types::ids::{ChatId, MessageId, TelegramUserId};
use courier_types::keyboard::ReplyMarkup;
use courier_types::transport::TransportError;
use courier_types::user::{KeyboardType, User, UserPatch};

use menu::action;

/// Sender identity attached to every event.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// An inbound event, reduced to what the router acts on.
#[derive(Debug, Clone)]
pub enum Event {
    Message {
        chat: ChatId,
        from: TelegramUserId,
        profile: Profile,
        message_id: MessageId,
        text: Option<String>,
        contact_phone: Option<String>,
    },
    ButtonPress {
        chat: ChatId,
        from: TelegramUserId,
        profile: Profile,
        /// The message carrying the pressed button.
        message_id: MessageId,
        action: String,
    },
}

impl Event {
    /// Reduce a wire update to an event, dropping what the bot ignores
    /// (edits, channel posts, messages without a sender, bot senders).
    pub fn from_update(update: Update) -> Option<Event> {
        if let Some(message) = update.message {
            let from = message.from.filter(|account| !account.is_bot)?;
            return Some(Event::Message {
                chat: ChatId(message.chat.id),
                from: TelegramUserId(from.id),
                profile: Profile {
                    username: from.username,
                    first_name: from.first_name,
                    last_name: from.last_name,
                },
                message_id: MessageId(message.message_id),
                text: message.text,
                contact_phone: message.contact.map(|contact| contact.phone_number),
            });
        }

        if let Some(callback) = update.callback_query {
            let action = callback.data?;
            // without the carrying message there is no chat to respond in
            let message = callback.message?;
            return Some(Event::ButtonPress {
                chat: ChatId(message.chat.id),
                from: TelegramUserId(callback.from.id),
                profile: Profile {
                    username: callback.from.username,
                    first_name: callback.from.first_name,
                    last_name: callback.from.last_name,
                },
                message_id: MessageId(message.message_id),
                action,
            });
        }

        None
    }
}

/// The router: owns references to the engine components and the user store.
pub struct Handlers<R> {
    users: Arc<R>,
    window: Arc<MessageWindow>,
    flows: Arc<FlowStore>,
    dispatcher: Arc<Dispatcher>,
    orders: Arc<OrderDirectory>,
    errors: Option<mpsc::UnboundedSender<TransportError>>,
}

impl<R: UserRepository> Handlers<R> {
    pub fn new(
        users: Arc<R>,
        window: Arc<MessageWindow>,
        flows: Arc<FlowStore>,
        dispatcher: Arc<Dispatcher>,
        orders: Arc<OrderDirectory>,
    ) -> Self {
        Self {
            users,
            window,
            flows,
            dispatcher,
            orders,
            errors: None,
        }
    }

    /// Route send failures to the supervisor's error observer so network
    /// errors during handling still trigger the reconnect path.
    pub fn with_error_sink(mut self, errors: mpsc::UnboundedSender<TransportError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Process one inbound event. Called strictly sequentially per process.
    pub async fn handle_event<T: Transport>(&self, transport: &T, event: Event) {
        match event {
            Event::Message {
                chat,
                from,
                profile,
                message_id,
                text,
                contact_phone,
            } => {
                self.window.init_chat(chat);
                let user = self.touch_user(from, &profile).await;
                self.window.track(transport, chat, message_id).await;

                if let Some(phone) = contact_phone {
                    self.handle_contact(transport, chat, from, phone).await;
                } else if let Some(text) = text {
                    self.handle_text(transport, chat, from, user, message_id, text)
                        .await;
                }
            }
            Event::ButtonPress {
                chat,
                from,
                profile,
                message_id,
                action,
            } => {
                self.window.init_chat(chat);
                self.touch_user(from, &profile).await;
                self.handle_action(transport, chat, from, message_id, &action)
                    .await;
            }
        }
    }

    // -----------------------------------------------------------------
    // Middleware
    // -----------------------------------------------------------------

    /// Upsert the sender and record a visit. Store failures are logged and
    /// never block handling.
    async fn touch_user(&self, from: TelegramUserId, profile: &Profile) -> Option<User> {
        let patch = UserPatch {
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            phone: None,
        };
        match self.users.upsert(from, patch).await {
            Ok(user) => {
                if let Err(err) = self.users.record_visit(user.id).await {
                    debug!(%from, error = %err, "failed to record visit");
                }
                Some(user)
            }
            Err(err) => {
                warn!(%from, error = %err, "failed to upsert user");
                None
            }
        }
    }

    // -----------------------------------------------------------------
    // Text messages
    // -----------------------------------------------------------------

    async fn handle_text<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        user: Option<User>,
        message_id: MessageId,
        text: String,
    ) {
        let trimmed = text.trim();

        if trimmed == "/start" {
            if let Some(user) = &user {
                self.handle_start(transport, chat, user).await;
            }
            return;
        }

        // broadcast composer first: peek, then validate privileges
        if let Some(PendingFlow::ComposingBroadcast(audience)) = self.flows.peek(from) {
            if user.as_ref().is_some_and(User::is_admin) {
                self.flows.consume(from);
                self.run_broadcast(transport, chat, audience, trimmed, message_id)
                    .await;
                return;
            }
            // a stale composer flag on a non-admin is dropped, not served
            self.flows.clear(from);
        }

        if let Some(PendingFlow::AwaitingOrderNumber(kind)) = self.flows.peek(from) {
            self.flows.consume(from);
            self.send_order_document(transport, chat, kind, trimmed).await;
            return;
        }

        // reply-keyboard menus arrive as plain text
        if let Some(user) = user {
            if user.keyboard_type == KeyboardType::Reply {
                self.handle_menu_text(transport, chat, from, &user, trimmed)
                    .await;
            }
        }
    }

    async fn handle_menu_text<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        user: &User,
        text: &str,
    ) {
        match text {
            menu::LABEL_GET_TTN | "Get TTN" | menu::LABEL_TTN | "TTN" => {
                self.request_document(transport, chat, from, OrderDocKind::Ttn)
                    .await;
            }
            menu::LABEL_GET_RECEIPT | "Get receipt" | menu::LABEL_RECEIPT | "Receipt" => {
                self.request_document(transport, chat, from, OrderDocKind::Receipt)
                    .await;
            }
            menu::LABEL_BONUSES | "Bonuses" => {
                self.send(transport, chat, menu::BONUSES_TEXT, None).await;
            }
            menu::LABEL_PROMOTIONS | "Promotions" => {
                self.send(transport, chat, menu::PROMOTIONS_TEXT, None).await;
            }
            menu::LABEL_INSTAGRAM | "Instagram" => {
                self.send(transport, chat, menu::INSTAGRAM_TEXT, None).await;
            }
            menu::LABEL_MANAGER | "Manager" => {
                self.send(transport, chat, menu::MANAGER_TEXT, None).await;
            }
            menu::LABEL_ADMIN | "Admin" => {
                if user.is_admin() {
                    self.show_admin_menu(transport, chat).await;
                } else {
                    self.send(transport, chat, menu::NO_ADMIN_ACCESS_TEXT, None)
                        .await;
                }
            }
            menu::LABEL_START | "Start" => {
                self.handle_start(transport, chat, user).await;
            }
            menu::LABEL_SETTINGS | "Settings" => {
                self.show_settings(transport, chat, user).await;
            }
            other => {
                debug!(%chat, text = other, "unrecognized menu text, ignoring");
            }
        }
    }

    // -----------------------------------------------------------------
    // Button presses
    // -----------------------------------------------------------------

    async fn handle_action<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        message_id: MessageId,
        action_name: &str,
    ) {
        // a pressed button consumes its own message; the bookkeeping entry
        // goes first so eviction never races the explicit delete
        self.window.remove(chat, message_id);
        if let Err(err) = transport.delete_message(chat, message_id).await {
            debug!(%chat, %message_id, error = %err, "failed to delete menu message");
        }

        match action_name {
            action::GET_TTN | action::MENU_TTN => {
                self.request_document(transport, chat, from, OrderDocKind::Ttn)
                    .await;
            }
            action::GET_RECEIPT | action::MENU_RECEIPT => {
                self.request_document(transport, chat, from, OrderDocKind::Receipt)
                    .await;
            }
            action::MENU_BONUSES => {
                self.send(transport, chat, menu::BONUSES_TEXT, None).await;
            }
            action::MENU_PROMOTIONS => {
                self.send(transport, chat, menu::PROMOTIONS_TEXT, None).await;
            }
            action::MENU_INSTAGRAM => {
                self.send(transport, chat, menu::INSTAGRAM_TEXT, None).await;
            }
            action::MENU_MANAGER => {
                self.send(transport, chat, menu::MANAGER_TEXT, None).await;
            }
            action::MENU_START => {
                if let Some(user) = self.fetch_user(from).await {
                    self.handle_start(transport, chat, &user).await;
                }
            }
            action::MENU_BACK => {
                if let Some(user) = self.fetch_user(from).await {
                    self.show_main_menu(transport, chat, &user).await;
                }
            }
            action::MENU_SETTINGS => {
                if let Some(user) = self.fetch_user(from).await {
                    self.show_settings(transport, chat, &user).await;
                }
            }
            action::SETTINGS_KEYBOARD_REPLY => {
                self.update_keyboard_type(transport, chat, from, KeyboardType::Reply)
                    .await;
            }
            action::SETTINGS_KEYBOARD_INLINE => {
                self.update_keyboard_type(transport, chat, from, KeyboardType::Inline)
                    .await;
            }
            action::ADMIN_MENU => {
                if self.is_admin(from).await {
                    self.show_admin_menu(transport, chat).await;
                } else {
                    self.send(transport, chat, menu::NO_ADMIN_ACCESS_TEXT, None)
                        .await;
                }
            }
            action::ADMIN_BROADCAST => {
                self.arm_broadcast(transport, chat, from, BroadcastAudience::All)
                    .await;
            }
            action::ADMIN_BROADCAST_VIP => {
                self.arm_broadcast(transport, chat, from, BroadcastAudience::Vip)
                    .await;
            }
            action::ADMIN_STATISTICS => {
                self.show_statistics(transport, chat, from).await;
            }
            other => {
                debug!(%chat, action = other, "unknown callback action, ignoring");
            }
        }
    }

    // -----------------------------------------------------------------
    // Start, menus, settings
    // -----------------------------------------------------------------

    /// `/start`: straight to the main menu when a phone is on file, the
    /// onboarding teaser otherwise.
    async fn handle_start<T: Transport>(&self, transport: &T, chat: ChatId, user: &User) {
        if user.has_phone() {
            self.show_main_menu(transport, chat, user).await;
        } else {
            self.send(
                transport,
                chat,
                &menu::onboarding_text(user),
                Some(menu::onboarding_keyboard(user)),
            )
            .await;
        }
    }

    async fn show_main_menu<T: Transport>(&self, transport: &T, chat: ChatId, user: &User) {
        self.send(
            transport,
            chat,
            menu::MAIN_MENU_TEXT,
            Some(menu::main_menu_keyboard(user)),
        )
        .await;
    }

    async fn show_settings<T: Transport>(&self, transport: &T, chat: ChatId, user: &User) {
        self.send(
            transport,
            chat,
            &menu::settings_text(user.keyboard_type),
            Some(menu::settings_keyboard(user.keyboard_type)),
        )
        .await;
    }

    async fn update_keyboard_type<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        keyboard_type: KeyboardType,
    ) {
        if let Err(err) = self.users.set_keyboard_type(from, keyboard_type).await {
            warn!(%from, error = %err, "failed to persist keyboard type");
            return;
        }
        if let Some(user) = self.fetch_user(from).await {
            self.show_main_menu(transport, chat, &user).await;
        }
    }

    // -----------------------------------------------------------------
    // Order document flows
    // -----------------------------------------------------------------

    /// Entry point of the TTN/receipt flows: ask for a phone number first if
    /// none is on file, otherwise ask for the order number right away. Either
    /// way the pending slot remembers what the user is after.
    async fn request_document<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        kind: OrderDocKind,
    ) {
        self.flows.set(from, PendingFlow::AwaitingOrderNumber(kind));

        let has_phone = self
            .fetch_user(from)
            .await
            .is_some_and(|user| user.has_phone());

        if has_phone {
            self.send(transport, chat, menu::order_prompt(kind), None).await;
        } else {
            self.send(
                transport,
                chat,
                menu::phone_prompt(kind),
                Some(menu::contact_request_keyboard()),
            )
            .await;
        }
    }

    /// A shared contact: save the phone, then resume the pending document
    /// flow if one is set, otherwise fall through to the main menu.
    async fn handle_contact<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        phone: String,
    ) {
        let patch = UserPatch {
            phone: Some(phone),
            ..UserPatch::default()
        };
        if let Err(err) = self.users.upsert(from, patch).await {
            warn!(%from, error = %err, "failed to save phone number");
        }

        match self.flows.peek(from) {
            Some(PendingFlow::AwaitingOrderNumber(kind)) => {
                // the contact was the awaited input; the slot now waits for
                // the order number
                self.flows.consume(from);
                self.flows.set(from, PendingFlow::AwaitingOrderNumber(kind));
                self.send(transport, chat, menu::order_prompt(kind), None).await;
            }
            _ => {
                if let Some(user) = self.fetch_user(from).await {
                    self.show_main_menu(transport, chat, &user).await;
                }
            }
        }
    }

    async fn send_order_document<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        kind: OrderDocKind,
        order_number: &str,
    ) {
        let text = match kind {
            OrderDocKind::Ttn => self
                .orders
                .lookup_ttn(order_number)
                .map(menu::ttn_text),
            OrderDocKind::Receipt => self
                .orders
                .lookup_receipt(order_number)
                .map(menu::receipt_text),
        };
        let text = text.unwrap_or_else(|| menu::order_not_found_text(kind, order_number));
        self.send(transport, chat, &text, None).await;
    }

    // -----------------------------------------------------------------
    // Admin panel
    // -----------------------------------------------------------------

    async fn show_admin_menu<T: Transport>(&self, transport: &T, chat: ChatId) {
        self.send(
            transport,
            chat,
            menu::ADMIN_MENU_TEXT,
            Some(menu::admin_menu_keyboard()),
        )
        .await;
    }

    async fn arm_broadcast<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
        audience: BroadcastAudience,
    ) {
        if !self.is_admin(from).await {
            return;
        }
        self.flows
            .set(from, PendingFlow::ComposingBroadcast(audience));
        self.send(transport, chat, menu::broadcast_prompt(audience), None)
            .await;
    }

    /// Run a composed broadcast and report the aggregate counts in place.
    async fn run_broadcast<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        audience: BroadcastAudience,
        text: &str,
        source_message: MessageId,
    ) {
        // the composing message is consumed
        self.window.remove(chat, source_message);
        if let Err(err) = transport.delete_message(chat, source_message).await {
            debug!(%chat, error = %err, "failed to delete broadcast source message");
        }

        let status = self
            .send(transport, chat, menu::broadcast_started_text(audience), None)
            .await;

        let listed = match audience {
            BroadcastAudience::All => self.users.list_all().await,
            BroadcastAudience::Vip => self.users.list_vip().await,
        };

        let report = match listed {
            Ok(users) => {
                let targets: Vec<BroadcastTarget> =
                    users.iter().map(User::broadcast_target).collect();
                let outcome = self.dispatcher.dispatch(transport, &targets, text).await;
                menu::broadcast_report_text(audience, outcome)
            }
            Err(err) => {
                warn!(error = %err, "failed to load broadcast audience");
                menu::BROADCAST_FAILED_TEXT.to_string()
            }
        };

        // edit the status message in place, fall back to a fresh send
        let edited = match status {
            Some(status_id) => transport
                .edit_message_text(chat, status_id, &report)
                .await
                .is_ok(),
            None => false,
        };
        if !edited {
            self.send(transport, chat, &report, None).await;
        }
    }

    async fn show_statistics<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        from: TelegramUserId,
    ) {
        if !self.is_admin(from).await {
            return;
        }
        match self.users.stats().await {
            Ok(stats) => {
                self.send(
                    transport,
                    chat,
                    &menu::stats_text(&stats),
                    Some(menu::stats_keyboard()),
                )
                .await;
            }
            Err(err) => {
                warn!(error = %err, "failed to load statistics");
                self.send(transport, chat, menu::STATS_FAILED_TEXT, None).await;
            }
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    async fn fetch_user(&self, from: TelegramUserId) -> Option<User> {
        match self.users.find_by_telegram_id(from).await {
            Ok(user) => user,
            Err(err) => {
                warn!(%from, error = %err, "failed to load user");
                None
            }
        }
    }

    async fn is_admin(&self, from: TelegramUserId) -> bool {
        self.fetch_user(from).await.is_some_and(|user| user.is_admin())
    }

    /// Tracked send that absorbs failures: log, report to the observer, move
    /// on. Returns the new message id when the send went through.
    async fn send<T: Transport>(
        &self,
        transport: &T,
        chat: ChatId,
        text: &str,
        keyboard: Option<ReplyMarkup>,
    ) -> Option<MessageId> {
        match self.window.send_tracked(transport, chat, text, keyboard).await {
            Ok(message_id) => Some(message_id),
            Err(err) => {
                warn!(%chat, error = %err, "failed to send message");
                if let Some(errors) = &self.errors {
                    let _ = errors.send(err);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use courier_types::user::{UserRole, UserStats};

    // -----------------------------------------------------------------
    // Doubles
    // -----------------------------------------------------------------

    #[derive(Debug, Clone)]
    struct SentMessage {
        chat: ChatId,
        text: String,
        has_keyboard: bool,
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<SentMessage>>,
        deleted: Mutex<Vec<(ChatId, MessageId)>>,
        edits: Mutex<Vec<(ChatId, MessageId, String)>>,
        next_id: AtomicI64,
    }

    impl FakeTransport {
        fn sent(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap().clone()
        }

        fn sent_texts_to(&self, chat: ChatId) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter(|m| m.chat == chat)
                .map(|m| m.text)
                .collect()
        }

        fn last_text_to(&self, chat: ChatId) -> String {
            self.sent_texts_to(chat).pop().expect("no message sent")
        }
    }

    impl Transport for FakeTransport {
        async fn send_message(
            &self,
            chat: ChatId,
            text: &str,
            keyboard: Option<ReplyMarkup>,
        ) -> Result<MessageId, TransportError> {
            self.sent.lock().unwrap().push(SentMessage {
                chat,
                text: text.to_string(),
                has_keyboard: keyboard.is_some(),
            });
            Ok(MessageId(1000 + self.next_id.fetch_add(1, Ordering::SeqCst)))
        }

        async fn delete_message(
            &self,
            chat: ChatId,
            message: MessageId,
        ) -> Result<(), TransportError> {
            self.deleted.lock().unwrap().push((chat, message));
            Ok(())
        }

        async fn edit_message_text(
            &self,
            chat: ChatId,
            message: MessageId,
            text: &str,
        ) -> Result<(), TransportError> {
            self.edits
                .lock()
                .unwrap()
                .push((chat, message, text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemoryUsers {
        users: Mutex<HashMap<TelegramUserId, User>>,
        visits: AtomicU64,
    }

    impl InMemoryUsers {
        fn seed(&self, key: TelegramUserId, user: User) {
            self.users.lock().unwrap().insert(key, user);
        }

        fn get(&self, key: TelegramUserId) -> Option<User> {
            self.users.lock().unwrap().get(&key).cloned()
        }
    }

    fn blank_user(telegram_id: TelegramUserId) -> User {
        User {
            id: Uuid::now_v7(),
            telegram_id: Some(telegram_id),
            username: None,
            first_name: None,
            last_name: None,
            phone: None,
            role: UserRole::User,
            is_vip: false,
            keyboard_type: KeyboardType::Reply,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    impl UserRepository for InMemoryUsers {
        async fn find_by_telegram_id(
            &self,
            telegram_id: TelegramUserId,
        ) -> Result<Option<User>, courier_types::error::RepositoryError> {
            Ok(self.get(telegram_id))
        }

        async fn upsert(
            &self,
            telegram_id: TelegramUserId,
            patch: UserPatch,
        ) -> Result<User, courier_types::error::RepositoryError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .entry(telegram_id)
                .or_insert_with(|| blank_user(telegram_id));
            if let Some(username) = patch.username {
                user.username = Some(username);
            }
            if let Some(first_name) = patch.first_name {
                user.first_name = Some(first_name);
            }
            if let Some(last_name) = patch.last_name {
                user.last_name = Some(last_name);
            }
            if let Some(phone) = patch.phone {
                user.phone = Some(phone);
            }
            Ok(user.clone())
        }

        async fn set_role(
            &self,
            telegram_id: TelegramUserId,
            role: UserRole,
        ) -> Result<(), courier_types::error::RepositoryError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(&telegram_id)
                .ok_or(courier_types::error::RepositoryError::NotFound)?;
            user.role = role;
            Ok(())
        }

        async fn set_keyboard_type(
            &self,
            telegram_id: TelegramUserId,
            keyboard_type: KeyboardType,
        ) -> Result<(), courier_types::error::RepositoryError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(&telegram_id)
                .ok_or(courier_types::error::RepositoryError::NotFound)?;
            user.keyboard_type = keyboard_type;
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<User>, courier_types::error::RepositoryError> {
            Ok(self.users.lock().unwrap().values().cloned().collect())
        }

        async fn list_vip(&self) -> Result<Vec<User>, courier_types::error::RepositoryError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .filter(|user| user.is_vip)
                .cloned()
                .collect())
        }

        async fn record_visit(
            &self,
            _user_id: Uuid,
        ) -> Result<(), courier_types::error::RepositoryError> {
            self.visits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stats(&self) -> Result<UserStats, courier_types::error::RepositoryError> {
            let users = self.users.lock().unwrap();
            Ok(UserStats {
                visits_today: self.visits.load(Ordering::SeqCst),
                total_users: users.len() as u64,
                total_vip: users.values().filter(|u| u.is_vip).count() as u64,
                new_users_today: users.len() as u64,
                new_vip_today: 0,
            })
        }
    }

    // -----------------------------------------------------------------
    // Scaffolding
    // -----------------------------------------------------------------

    const ALICE: TelegramUserId = TelegramUserId(100);
    const ALICE_CHAT: ChatId = ChatId(100);

    fn handlers(users: Arc<InMemoryUsers>) -> Handlers<InMemoryUsers> {
        Handlers::new(
            users,
            Arc::new(MessageWindow::new(100, Duration::from_millis(1))),
            Arc::new(FlowStore::new()),
            Arc::new(Dispatcher::new(Duration::from_millis(1))),
            Arc::new(OrderDirectory::seeded()),
        )
    }

    fn text_event(from: TelegramUserId, message_id: i64, text: &str) -> Event {
        Event::Message {
            chat: ChatId(from.0),
            from,
            profile: Profile {
                first_name: Some("Jane".into()),
                ..Profile::default()
            },
            message_id: MessageId(message_id),
            text: Some(text.to_string()),
            contact_phone: None,
        }
    }

    fn contact_event(from: TelegramUserId, message_id: i64, phone: &str) -> Event {
        Event::Message {
            chat: ChatId(from.0),
            from,
            profile: Profile::default(),
            message_id: MessageId(message_id),
            text: None,
            contact_phone: Some(phone.to_string()),
        }
    }

    fn press_event(from: TelegramUserId, message_id: i64, action: &str) -> Event {
        Event::ButtonPress {
            chat: ChatId(from.0),
            from,
            profile: Profile::default(),
            message_id: MessageId(message_id),
            action: action.to_string(),
        }
    }

    fn seed_with_phone(users: &InMemoryUsers, id: TelegramUserId) {
        let mut user = blank_user(id);
        user.phone = Some("+380501112233".into());
        users.seed(id, user);
    }

    fn seed_admin_with_phone(users: &InMemoryUsers, id: TelegramUserId) {
        let mut user = blank_user(id);
        user.phone = Some("+380501112233".into());
        user.role = UserRole::Admin;
        users.seed(id, user);
    }

    // -----------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn start_without_phone_shows_onboarding() {
        let users = Arc::new(InMemoryUsers::default());
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, text_event(ALICE, 1, "/start"))
            .await;

        let reply = transport.last_text_to(ALICE_CHAT);
        assert!(reply.contains("Welcome, Jane"));
        assert!(transport.sent()[0].has_keyboard);
        // inbound message and the menu reply are both tracked
        assert_eq!(handlers.window.window_len(ALICE_CHAT), 2);
    }

    #[tokio::test]
    async fn start_with_phone_shows_main_menu() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, text_event(ALICE, 1, "/start"))
            .await;

        assert_eq!(transport.last_text_to(ALICE_CHAT), menu::MAIN_MENU_TEXT);
    }

    #[tokio::test]
    async fn ttn_button_then_order_number_returns_the_document() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, press_event(ALICE, 5, action::GET_TTN))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("order number"));

        handlers
            .handle_event(&transport, text_event(ALICE, 6, "12345"))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("TTN-2024-001234"));
        // consumed exactly once
        assert_eq!(handlers.flows.peek(ALICE), None);
    }

    #[tokio::test]
    async fn unknown_order_number_reports_not_found() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, press_event(ALICE, 5, action::GET_RECEIPT))
            .await;
        handlers
            .handle_event(&transport, text_event(ALICE, 6, "00000"))
            .await;

        let reply = transport.last_text_to(ALICE_CHAT);
        assert!(reply.contains("No receipt found"));
        assert!(reply.contains("00000"));
    }

    #[tokio::test]
    async fn contact_saves_phone_and_resumes_the_flow() {
        let users = Arc::new(InMemoryUsers::default());
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        // no phone on file: the TTN request asks for a contact first
        handlers
            .handle_event(&transport, press_event(ALICE, 5, action::GET_TTN))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("phone number"));

        handlers
            .handle_event(&transport, contact_event(ALICE, 6, "+380501234567"))
            .await;

        assert_eq!(
            users.get(ALICE).unwrap().phone.as_deref(),
            Some("+380501234567")
        );
        assert!(transport.last_text_to(ALICE_CHAT).contains("order number"));
        assert_eq!(
            handlers.flows.peek(ALICE),
            Some(PendingFlow::AwaitingOrderNumber(OrderDocKind::Ttn))
        );
    }

    #[tokio::test]
    async fn admin_broadcast_flow_reports_counts_in_place() {
        let users = Arc::new(InMemoryUsers::default());
        seed_admin_with_phone(&users, ALICE);
        users.seed(TelegramUserId(201), blank_user(TelegramUserId(201)));
        users.seed(TelegramUserId(202), blank_user(TelegramUserId(202)));
        let mut no_id = blank_user(TelegramUserId(999));
        no_id.telegram_id = None;
        users.seed(TelegramUserId(999), no_id);

        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, press_event(ALICE, 5, action::ADMIN_BROADCAST))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("broadcast"));

        handlers
            .handle_event(&transport, text_event(ALICE, 6, "hello subscribers"))
            .await;

        // the composing message was consumed
        assert!(
            transport
                .deleted
                .lock()
                .unwrap()
                .contains(&(ALICE_CHAT, MessageId(6)))
        );

        // all three deliverable users (admin included) got the payload
        let payloads: Vec<SentMessage> = transport
            .sent()
            .into_iter()
            .filter(|m| m.text == "hello subscribers")
            .collect();
        assert_eq!(payloads.len(), 3);

        // the status message was edited into the report
        let edits = transport.edits.lock().unwrap();
        assert_eq!(edits.len(), 1);
        let report = &edits[0].2;
        assert!(report.contains("Sent: 3"));
        assert!(report.contains("Failed: 1"));
        assert!(report.contains("Recipients: 3"));
    }

    #[tokio::test]
    async fn stale_composer_flag_on_non_admin_is_dropped() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .flows
            .set(ALICE, PendingFlow::ComposingBroadcast(BroadcastAudience::All));
        handlers
            .handle_event(&transport, text_event(ALICE, 6, "hello subscribers"))
            .await;

        assert_eq!(handlers.flows.peek(ALICE), None);
        assert!(transport.edits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_admin_is_denied_the_admin_menu() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, press_event(ALICE, 5, action::ADMIN_MENU))
            .await;
        assert_eq!(transport.last_text_to(ALICE_CHAT), menu::NO_ADMIN_ACCESS_TEXT);

        // and the broadcast arm is silently refused
        handlers
            .handle_event(&transport, press_event(ALICE, 6, action::ADMIN_BROADCAST))
            .await;
        assert_eq!(handlers.flows.peek(ALICE), None);
    }

    #[tokio::test]
    async fn settings_toggle_persists_the_keyboard_type() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, press_event(ALICE, 5, action::MENU_SETTINGS))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("Settings"));

        handlers
            .handle_event(
                &transport,
                press_event(ALICE, 6, action::SETTINGS_KEYBOARD_INLINE),
            )
            .await;

        assert_eq!(
            users.get(ALICE).unwrap().keyboard_type,
            KeyboardType::Inline
        );
        assert_eq!(transport.last_text_to(ALICE_CHAT), menu::MAIN_MENU_TEXT);
    }

    #[tokio::test]
    async fn button_press_consumes_its_own_message() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        // the menu message arrived earlier and is tracked
        handlers
            .handle_event(&transport, text_event(ALICE, 50, "/start"))
            .await;

        handlers
            .handle_event(&transport, press_event(ALICE, 50, action::MENU_BONUSES))
            .await;

        assert!(!handlers.window.contains(ALICE_CHAT, MessageId(50)));
        assert!(
            transport
                .deleted
                .lock()
                .unwrap()
                .contains(&(ALICE_CHAT, MessageId(50)))
        );
        assert!(transport.last_text_to(ALICE_CHAT).contains("Bonus"));
    }

    #[tokio::test]
    async fn reply_menu_text_reaches_the_static_pages() {
        let users = Arc::new(InMemoryUsers::default());
        seed_with_phone(&users, ALICE);
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, text_event(ALICE, 1, menu::LABEL_PROMOTIONS))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("promotions"));

        handlers
            .handle_event(&transport, text_event(ALICE, 2, "Manager"))
            .await;
        assert!(transport.last_text_to(ALICE_CHAT).contains("manager"));
    }

    #[tokio::test]
    async fn every_inbound_message_is_tracked() {
        let users = Arc::new(InMemoryUsers::default());
        let handlers = handlers(Arc::clone(&users));
        let transport = FakeTransport::default();

        handlers
            .handle_event(&transport, text_event(ALICE, 1, "anything at all"))
            .await;

        assert!(handlers.window.contains(ALICE_CHAT, MessageId(1)));
        assert_eq!(users.visits.load(Ordering::SeqCst), 1);
    }
}
