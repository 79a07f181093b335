//! Connection supervisor: keeps one bot session alive across transient
//! failures.
//!
//! State machine: `Stopped -> Starting -> Running -> ReconnectWaiting ->
//! Starting -> ...`. Two background tasks exist at most once each, guarded
//! by `CancellationToken`s: a repeating reconnect loop (armed on connection
//! loss, cancelled on the next successful start) and a periodic maintenance
//! tick (armed while running).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use courier_types::config::EngineConfig;
use courier_types::transport::TransportError;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Connector, MaintenanceCallback, SessionHandle, SessionState};

/// Timer settings for the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Delay between reconnect attempts after a connection loss.
    pub reconnect_delay: Duration,
    /// Interval of the periodic maintenance tick while running.
    pub maintenance_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            maintenance_interval: Duration::from_secs(30),
        }
    }
}

impl SupervisorConfig {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            maintenance_interval: config.maintenance_interval(),
        }
    }
}

/// Owns the session lifecycle and the single live session handle.
pub struct Supervisor<C: Connector> {
    connector: C,
    token: SecretString,
    config: SupervisorConfig,
    on_maintenance: MaintenanceCallback<C::Session>,
    state: Mutex<SessionState>,
    session: tokio::sync::Mutex<Option<Arc<C::Session>>>,
    reconnect_task: Mutex<Option<CancellationToken>>,
    maintenance_task: Mutex<Option<CancellationToken>>,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(
        connector: C,
        token: SecretString,
        config: SupervisorConfig,
        on_maintenance: MaintenanceCallback<C::Session>,
    ) -> Arc<Self> {
        Arc::new(Self {
            connector,
            token,
            config,
            on_maintenance,
            state: Mutex::new(SessionState::Stopped),
            session: tokio::sync::Mutex::new(None),
            reconnect_task: Mutex::new(None),
            maintenance_task: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Start (or restart) the bot session. Returns whether the session is
    /// running when the call resolves.
    ///
    /// Single-flight: if another attempt is already in flight this logs and
    /// returns without doing anything. A running session is torn down before
    /// the new connect, so at most one live session exists at any time.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if *state == SessionState::Starting {
                debug!("session start already in progress, skipping");
                return false;
            }
            *state = SessionState::Starting;
        }

        {
            let mut session = self.session.lock().await;
            if let Some(old) = session.take() {
                debug!("closing previous session before reconnect");
                old.close().await;
            }
        }

        match self.connector.connect(&self.token).await {
            Ok(new_session) => {
                let new_session = Arc::new(new_session);
                {
                    let mut session = self.session.lock().await;
                    let stopped = {
                        let mut state = self.state.lock().unwrap();
                        if *state == SessionState::Stopped {
                            // stop() won the race while we were connecting
                            true
                        } else {
                            *session = Some(Arc::clone(&new_session));
                            *state = SessionState::Running;
                            false
                        }
                    };
                    if stopped {
                        drop(session);
                        new_session.close().await;
                        return false;
                    }
                }
                info!("bot session started");
                self.disarm_reconnect();
                self.arm_maintenance(new_session);
                true
            }
            Err(err) => {
                error!(error = %err, "failed to start bot session");
                {
                    let mut state = self.state.lock().unwrap();
                    if *state == SessionState::Stopped {
                        // stop() won the race while we were connecting
                        return false;
                    }
                    *state = SessionState::ReconnectWaiting;
                }
                self.arm_reconnect();
                false
            }
        }
    }

    /// Global error observer. Connection-class errors trigger the reconnect
    /// path; everything else is logged and does not touch the session.
    pub fn handle_error(self: &Arc<Self>, err: &TransportError) {
        if err.is_connection_loss() {
            self.connection_lost();
        } else {
            error!(error = %err, "bot error (non-fatal)");
        }
    }

    /// React to a lost connection: transition to `ReconnectWaiting` (warning
    /// exactly once per loss event) and arm the reconnect loop. Loss reports
    /// after `stop()` are ignored.
    pub fn connection_lost(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                SessionState::Stopped => return,
                SessionState::Running => {
                    *state = SessionState::ReconnectWaiting;
                    warn!("bot connection lost, scheduling reconnect attempts");
                }
                SessionState::Starting | SessionState::ReconnectWaiting => {
                    debug!("connection loss reported while not running");
                }
            }
        }
        self.arm_reconnect();
    }

    /// Tear the session down and disarm both timers. Teardown errors are the
    /// session's to swallow.
    pub async fn stop(&self) {
        *self.state.lock().unwrap() = SessionState::Stopped;
        self.disarm_reconnect();
        self.disarm_maintenance();
        if let Some(session) = self.session.lock().await.take() {
            session.close().await;
        }
        info!("bot session stopped");
    }

    /// Arm the repeating reconnect loop. Idempotent: a previously armed loop
    /// is cancelled first, so there is never more than one.
    fn arm_reconnect(self: &Arc<Self>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.reconnect_task.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }

        let supervisor = Arc::clone(self);
        let delay = self.config.reconnect_delay;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                match supervisor.state() {
                    SessionState::Running | SessionState::Starting => continue,
                    SessionState::Stopped => break,
                    SessionState::ReconnectWaiting => {
                        info!("attempting to reconnect bot session");
                        supervisor.start().await;
                    }
                }
            }
        });
    }

    fn disarm_reconnect(&self) {
        if let Some(token) = self.reconnect_task.lock().unwrap().take() {
            token.cancel();
        }
    }

    /// Arm the periodic maintenance tick for a freshly started session,
    /// replacing any tick left over from the previous session.
    fn arm_maintenance(self: &Arc<Self>, session: Arc<C::Session>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.maintenance_task.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }

        let callback = Arc::clone(&self.on_maintenance);
        let interval = self.config.maintenance_interval;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        (callback)(Arc::clone(&session)).await;
                    }
                }
            }
        });
    }

    fn disarm_maintenance(&self) {
        if let Some(token) = self.maintenance_task.lock().unwrap().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counters shared between a fake connector and its sessions.
    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        closes: AtomicUsize,
        maintenance_ticks: AtomicUsize,
    }

    struct FakeSession {
        counters: Arc<Counters>,
    }

    impl SessionHandle for FakeSession {
        async fn close(&self) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Connector that fails the first `fail_first` attempts, then succeeds.
    struct FakeConnector {
        counters: Arc<Counters>,
        fail_first: usize,
        connect_delay: Duration,
    }

    impl FakeConnector {
        fn new(counters: Arc<Counters>, fail_first: usize) -> Self {
            Self {
                counters,
                fail_first,
                connect_delay: Duration::ZERO,
            }
        }
    }

    impl Connector for FakeConnector {
        type Session = FakeSession;

        async fn connect(&self, _token: &SecretString) -> Result<FakeSession, TransportError> {
            if !self.connect_delay.is_zero() {
                tokio::time::sleep(self.connect_delay).await;
            }
            let attempt = self.counters.connects.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(TransportError::Network("connection refused".into()));
            }
            Ok(FakeSession {
                counters: Arc::clone(&self.counters),
            })
        }
    }

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            reconnect_delay: Duration::from_millis(20),
            maintenance_interval: Duration::from_millis(20),
        }
    }

    fn supervisor_with(
        counters: &Arc<Counters>,
        connector: FakeConnector,
    ) -> Arc<Supervisor<FakeConnector>> {
        let ticks = Arc::clone(counters);
        Supervisor::new(
            connector,
            SecretString::from("test-token"),
            fast_config(),
            Arc::new(move |_session| {
                let ticks = Arc::clone(&ticks);
                Box::pin(async move {
                    ticks.maintenance_ticks.fetch_add(1, Ordering::SeqCst);
                })
            }),
        )
    }

    #[tokio::test]
    async fn concurrent_starts_connect_once() {
        let counters = Arc::new(Counters::default());
        let mut connector = FakeConnector::new(Arc::clone(&counters), 0);
        connector.connect_delay = Duration::from_millis(30);
        let supervisor = supervisor_with(&counters, connector);

        let first = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.start().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = supervisor.start().await;

        assert!(first.await.unwrap());
        assert!(!second, "second start must be rejected by the guard");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert!(supervisor.is_running());

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn reconnect_retries_until_success_then_stops_firing() {
        let counters = Arc::new(Counters::default());
        let supervisor = supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), 2));

        assert!(!supervisor.start().await);
        assert_eq!(supervisor.state(), SessionState::ReconnectWaiting);

        // two failures then success: 3 attempts total
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(supervisor.is_running());
        assert_eq!(counters.connects.load(Ordering::SeqCst), 3);

        // reconnect loop is disarmed after the successful start
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counters.connects.load(Ordering::SeqCst), 3);

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn connection_loss_rearms_and_recovers() {
        let counters = Arc::new(Counters::default());
        let supervisor = supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), 0));

        assert!(supervisor.start().await);
        supervisor.connection_lost();
        assert_eq!(supervisor.state(), SessionState::ReconnectWaiting);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(supervisor.is_running());
        // the first session was closed when the reconnect start replaced it
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

        supervisor.stop().await;
        assert_eq!(counters.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stop_disarms_the_reconnect_loop() {
        let counters = Arc::new(Counters::default());
        let supervisor =
            supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), usize::MAX));

        supervisor.start().await;
        supervisor.stop().await;
        let attempts_at_stop = counters.connects.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counters.connects.load(Ordering::SeqCst), attempts_at_stop);
        assert_eq!(supervisor.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn maintenance_ticks_while_running_and_stops_after_stop() {
        let counters = Arc::new(Counters::default());
        let supervisor = supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), 0));

        assert!(supervisor.start().await);
        tokio::time::sleep(Duration::from_millis(70)).await;
        let ticks = counters.maintenance_ticks.load(Ordering::SeqCst);
        assert!(ticks >= 2, "expected at least two ticks, got {ticks}");

        supervisor.stop().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let after_stop = counters.maintenance_ticks.load(Ordering::SeqCst);
        // allow one tick that was already in flight when stop landed
        assert!(after_stop <= ticks + 1);
    }

    #[tokio::test]
    async fn non_connection_errors_do_not_touch_the_session() {
        let counters = Arc::new(Counters::default());
        let supervisor = supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), 0));

        assert!(supervisor.start().await);
        supervisor.handle_error(&TransportError::Api {
            code: 400,
            description: "message is too long".into(),
        });
        assert!(supervisor.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn network_error_goes_through_the_reconnect_path() {
        let counters = Arc::new(Counters::default());
        let supervisor = supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), 0));

        assert!(supervisor.start().await);
        supervisor.handle_error(&TransportError::Network("broken pipe".into()));
        assert_eq!(supervisor.state(), SessionState::ReconnectWaiting);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(supervisor.is_running());

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn loss_reports_after_stop_are_ignored() {
        let counters = Arc::new(Counters::default());
        let supervisor = supervisor_with(&counters, FakeConnector::new(Arc::clone(&counters), 0));

        assert!(supervisor.start().await);
        supervisor.stop().await;
        supervisor.connection_lost();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(supervisor.state(), SessionState::Stopped);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }
}
