use crate::state::ConnectionState;
use relink_core::events::LinkEvent;
use relink_core::generation::Generation;
use std::time::{Duration, Instant};

/// Why the attempt counter went back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    /// The connection stayed up for the whole stability window.
    StabilityWindow,
    /// The cooldown expired.
    Cooldown,
    /// A new endpoint was configured.
    EndpointChange,
    /// A restart was requested.
    Restart,
}

/// Events emitted by the reconnection controller.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A new connection handle is being built.
    ConnectAttempt {
        name: String,
        timestamp: Instant,
        generation: Generation,
        endpoint: String,
        attempts: u32,
    },
    /// The connection state changed.
    StateTransition {
        name: String,
        timestamp: Instant,
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The live handle completed its login.
    Established {
        name: String,
        timestamp: Instant,
        generation: Generation,
    },
    /// The live handle was torn down after a failure.
    Disconnected {
        name: String,
        timestamp: Instant,
        generation: Generation,
        reason: String,
        attempts: u32,
    },
    /// A backoff retry was armed.
    RetryScheduled {
        name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// The attempt budget is exhausted; waiting out the cooldown.
    CooldownEntered {
        name: String,
        timestamp: Instant,
        attempts: u32,
        duration: Duration,
    },
    /// The attempt counter was reset.
    AttemptsReset {
        name: String,
        timestamp: Instant,
        cause: ResetCause,
    },
    /// A new endpoint replaced the old one.
    EndpointChanged {
        name: String,
        timestamp: Instant,
        endpoint: String,
    },
    /// The controller went dormant.
    Stopped { name: String, timestamp: Instant },
    /// An event from a superseded handle was discarded.
    StaleEventDropped {
        name: String,
        timestamp: Instant,
        generation: Generation,
        current: Option<Generation>,
    },
}

impl LinkEvent for ControllerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ControllerEvent::ConnectAttempt { .. } => "connect_attempt",
            ControllerEvent::StateTransition { .. } => "state_transition",
            ControllerEvent::Established { .. } => "established",
            ControllerEvent::Disconnected { .. } => "disconnected",
            ControllerEvent::RetryScheduled { .. } => "retry_scheduled",
            ControllerEvent::CooldownEntered { .. } => "cooldown_entered",
            ControllerEvent::AttemptsReset { .. } => "attempts_reset",
            ControllerEvent::EndpointChanged { .. } => "endpoint_changed",
            ControllerEvent::Stopped { .. } => "stopped",
            ControllerEvent::StaleEventDropped { .. } => "stale_event_dropped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ControllerEvent::ConnectAttempt { timestamp, .. }
            | ControllerEvent::StateTransition { timestamp, .. }
            | ControllerEvent::Established { timestamp, .. }
            | ControllerEvent::Disconnected { timestamp, .. }
            | ControllerEvent::RetryScheduled { timestamp, .. }
            | ControllerEvent::CooldownEntered { timestamp, .. }
            | ControllerEvent::AttemptsReset { timestamp, .. }
            | ControllerEvent::EndpointChanged { timestamp, .. }
            | ControllerEvent::Stopped { timestamp, .. }
            | ControllerEvent::StaleEventDropped { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ControllerEvent::ConnectAttempt { name, .. }
            | ControllerEvent::StateTransition { name, .. }
            | ControllerEvent::Established { name, .. }
            | ControllerEvent::Disconnected { name, .. }
            | ControllerEvent::RetryScheduled { name, .. }
            | ControllerEvent::CooldownEntered { name, .. }
            | ControllerEvent::AttemptsReset { name, .. }
            | ControllerEvent::EndpointChanged { name, .. }
            | ControllerEvent::Stopped { name, .. }
            | ControllerEvent::StaleEventDropped { name, .. } => name,
        }
    }
}
