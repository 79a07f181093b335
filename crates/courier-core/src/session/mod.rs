//! Session lifecycle: ports and the connection supervisor.
//!
//! The supervisor owns the one live platform session per process. It knows
//! nothing about the wire protocol; acquiring a session (client + handshake
//! + update pump) is behind the [`Connector`] port, tearing one down behind
//! [`SessionHandle`].

use std::fmt;
use std::sync::Arc;

use courier_types::transport::TransportError;
use futures_util::future::BoxFuture;
use secrecy::SecretString;

mod supervisor;

pub use supervisor::{Supervisor, SupervisorConfig};

/// Lifecycle state of the bot session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    /// A connect attempt is in flight. Guards against concurrent starts.
    Starting,
    Running,
    /// Connection lost; the reconnect timer is driving retry attempts.
    ReconnectWaiting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Running => write!(f, "running"),
            SessionState::ReconnectWaiting => write!(f, "reconnect_waiting"),
        }
    }
}

/// A live platform session.
///
/// Implementations own whatever the session needs to stay alive (the HTTP
/// client, the update-polling task) and release all of it in `close`,
/// swallowing teardown errors.
pub trait SessionHandle: Send + Sync + 'static {
    fn close(&self) -> impl std::future::Future<Output = ()> + Send;
}

/// Acquires a fresh session: build a client, perform the platform
/// handshake, start pumping updates.
///
/// Each successful `connect` must yield an independent session; the
/// supervisor guarantees it closes the previous one first.
pub trait Connector: Send + Sync + 'static {
    type Session: SessionHandle;

    fn connect(
        &self,
        token: &SecretString,
    ) -> impl std::future::Future<Output = Result<Self::Session, TransportError>> + Send;
}

/// Caller-supplied periodic maintenance work (e.g. sweeping all message
/// windows). Invoked with the live session on every maintenance tick; the
/// supervisor does not know or care what it does.
pub type MaintenanceCallback<S> = Arc<dyn Fn(Arc<S>) -> BoxFuture<'static, ()> + Send + Sync>;
