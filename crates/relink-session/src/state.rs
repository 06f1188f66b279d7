//! Connection state and the read-only status surface.

use crate::config::Endpoint;
use std::fmt;
use tokio::sync::watch;

/// Connection state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConnectionState {
    /// No live handle.
    Disconnected,

    /// A handle exists but has not completed its login yet.
    Connecting,

    /// The live handle is logged in.
    Connected,
}

impl ConnectionState {
    /// Returns a static label, used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn as_gauge(&self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Connected => 2.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one timer the controller may have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PendingTimer {
    /// A backoff retry.
    Retry,
    /// The long pause after the attempt budget ran out.
    Cooldown,
    /// The short pause before connecting to a new endpoint or restarting.
    Switch,
}

/// Point-in-time view of the controller.
///
/// Snapshots are immutable values published as a whole after every
/// transition, so a reader never sees a half-applied change.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StatusSnapshot {
    /// Current connection state.
    pub state: ConnectionState,
    /// Consecutive failures since the last reset.
    pub attempts: u32,
    /// Reason of the most recent failure.
    pub last_error: Option<String>,
    /// Endpoint the controller connects to.
    pub endpoint: Endpoint,
    /// Account name used to join.
    pub username: String,
    /// Generation of the live handle, if one exists.
    pub generation: Option<u64>,
    /// Timer currently armed, if any.
    pub pending: Option<PendingTimer>,
    /// True after `stop()` until the next `start()`.
    pub dormant: bool,
}

impl StatusSnapshot {
    pub(crate) fn initial(endpoint: Endpoint, username: String) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            last_error: None,
            endpoint,
            username,
            generation: None,
            pending: None,
            dormant: true,
        }
    }

    /// Returns true if the controller is logged in.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Returns true if the controller is waiting out the cooldown.
    pub fn is_cooling_down(&self) -> bool {
        self.pending == Some(PendingTimer::Cooldown)
    }
}

/// Read-only access to the controller's latest [`StatusSnapshot`].
///
/// Cheap to clone and safe to use from any task or thread. Reading never
/// waits on the controller and never changes its state.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<StatusSnapshot>,
}

impl StatusHandle {
    pub(crate) fn new(rx: watch::Receiver<StatusSnapshot>) -> Self {
        Self { rx }
    }

    /// Returns the latest snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.rx.borrow().state
    }

    /// Returns the current attempt count.
    pub fn attempts(&self) -> u32 {
        self.rx.borrow().attempts
    }

    /// Waits until a snapshot satisfies `predicate` and returns it.
    ///
    /// Returns `None` if the controller shut down first.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<StatusSnapshot>
    where
        F: FnMut(&StatusSnapshot) -> bool,
    {
        self.rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}
