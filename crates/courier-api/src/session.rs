//! The live bot session: client acquisition, handshake, and update pump.
//!
//! `BotConnector` implements the supervisor's `Connector` port. Each connect
//! builds a fresh `TelegramClient`, verifies the token with `getMe`, and
//! spawns the long-poll loop. The loop processes updates strictly one at a
//! time -- ordering of menu state and window bookkeeping depends on it --
//! and reports transport errors to the supervisor's observer through a
//! channel.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use courier_core::repository::UserRepository;
use courier_core::session::{Connector, SessionHandle};
use courier_infra::telegram::TelegramClient;
use courier_types::transport::TransportError;

use crate::handlers::{Event, Handlers};

/// Pause after a non-fatal polling error before the next attempt.
const POLL_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// A connected session: the client plus the running update pump.
pub struct BotSession {
    client: Arc<TelegramClient>,
    polling: CancellationToken,
}

impl BotSession {
    pub fn client(&self) -> &Arc<TelegramClient> {
        &self.client
    }
}

impl SessionHandle for BotSession {
    async fn close(&self) {
        self.polling.cancel();
    }
}

/// Builds sessions for the supervisor.
pub struct BotConnector<R> {
    handlers: Arc<Handlers<R>>,
    poll_timeout_secs: u64,
    errors: mpsc::UnboundedSender<TransportError>,
}

impl<R> BotConnector<R> {
    pub fn new(
        handlers: Arc<Handlers<R>>,
        poll_timeout_secs: u64,
        errors: mpsc::UnboundedSender<TransportError>,
    ) -> Self {
        Self {
            handlers,
            poll_timeout_secs,
            errors,
        }
    }
}

impl<R: UserRepository + 'static> Connector for BotConnector<R> {
    type Session = BotSession;

    async fn connect(&self, token: &SecretString) -> Result<BotSession, TransportError> {
        let client = Arc::new(TelegramClient::new(token, self.poll_timeout_secs));

        let me = client.get_me().await?;
        info!(
            bot = me.username.as_deref().unwrap_or(&me.first_name),
            "bot handshake complete"
        );

        let polling = CancellationToken::new();
        tokio::spawn(poll_loop(
            Arc::clone(&client),
            Arc::clone(&self.handlers),
            self.errors.clone(),
            polling.clone(),
        ));

        Ok(BotSession { client, polling })
    }
}

/// Long-poll loop feeding the router.
///
/// Exits when cancelled or when a connection-class error occurs -- the
/// supervisor reconnects with a fresh session in that case. Other errors are
/// reported and polling continues after a short pause.
async fn poll_loop<R: UserRepository>(
    client: Arc<TelegramClient>,
    handlers: Arc<Handlers<R>>,
    errors: mpsc::UnboundedSender<TransportError>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;

    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.get_updates(offset) => result,
        };

        match batch {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);

                    // acknowledge button presses up front so clients stop
                    // showing the spinner even if handling takes a moment
                    if let Some(callback) = &update.callback_query {
                        if let Err(err) = client.answer_callback_query(&callback.id, None).await {
                            debug!(error = %err, "failed to answer callback query");
                        }
                    }

                    if let Some(event) = Event::from_update(update) {
                        handlers.handle_event(client.as_ref(), event).await;
                    }
                }
            }
            Err(err) => {
                let connection_lost = err.is_connection_loss();
                if errors.send(err).is_err() {
                    warn!("error channel closed, stopping update pump");
                    break;
                }
                if connection_lost {
                    // the supervisor tears this session down and reconnects
                    break;
                }
                tokio::time::sleep(POLL_RETRY_PAUSE).await;
            }
        }
    }

    debug!("update pump stopped");
}
