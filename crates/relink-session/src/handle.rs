//! Contract with the game-protocol library.
//!
//! The controller sees a connection only through two narrow traits: a
//! [`Connector`] that builds one [`ConnectionHandle`] per attempt, and the
//! [`EventSink`] the handle reports through. Everything protocol specific
//! (packet codecs, world state, pathing) lives behind these traits.

use crate::config::SessionSettings;
use crate::error::{ConnectError, HandleError};
use relink_core::events::LinkEvent;
use relink_core::generation::Generation;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// An outbound action for the live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a public chat line.
    Chat(String),

    /// Run a command on behalf of `source` (e.g. "WebInterface").
    Command {
        /// Who asked for the command.
        source: String,
        /// The command line, prefix included.
        line: String,
    },

    /// Respawn after death.
    Respawn,
}

/// Something that happened in the game world, reported by the live handle.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// The player entered the world.
    Spawned,

    /// A public chat message.
    Chat {
        /// Author of the message.
        sender: String,
        /// Message text.
        text: String,
    },

    /// A private message addressed to the player.
    Whisper {
        /// Author of the message.
        sender: String,
        /// Message text.
        text: String,
    },

    /// Health or food changed.
    Health {
        /// Current health, 0 means dead.
        health: f32,
        /// Current food level.
        food: f32,
    },
}

/// Everything a connection handle can report.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleEvent {
    /// Login completed; the connection is usable.
    Established,

    /// The connection ended (disconnect, kick, server shutdown).
    Terminated(String),

    /// The connection failed with an error.
    Faulted(String),

    /// A domain event for downstream observers.
    Domain(DomainEvent),
}

/// A [`HandleEvent`] stamped with the generation of the handle that sent it.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) generation: Generation,
    pub(crate) event: HandleEvent,
}

/// Channel through which a connection handle reports its events.
///
/// Each sink is bound to the generation of the handle it was created for.
/// Events sent after the controller has moved on to a newer handle are
/// discarded by the router, so a handle may keep its sink as long as it likes.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSink {
    pub(crate) fn new(generation: Generation, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { generation, tx }
    }

    /// Returns the generation this sink reports for.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Reports a successful login.
    pub fn established(&self) -> bool {
        self.send(HandleEvent::Established)
    }

    /// Reports that the connection ended.
    pub fn terminated(&self, reason: impl Into<String>) -> bool {
        self.send(HandleEvent::Terminated(reason.into()))
    }

    /// Reports that the connection failed.
    pub fn faulted(&self, error: impl std::fmt::Display) -> bool {
        self.send(HandleEvent::Faulted(error.to_string()))
    }

    /// Reports a domain event.
    pub fn domain(&self, event: DomainEvent) -> bool {
        self.send(HandleEvent::Domain(event))
    }

    /// Sends `event`. Returns false once the controller is gone.
    pub fn send(&self, event: HandleEvent) -> bool {
        self.tx
            .send(Envelope {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// One attempt to communicate with the remote server.
///
/// Handles are created by a [`Connector`] and owned exclusively by the
/// controller. After reporting `Terminated` or `Faulted` a handle must not
/// report anything else.
pub trait ConnectionHandle: Send + 'static {
    /// Sends an outbound action.
    fn send_action(&self, action: Action) -> Result<(), HandleError>;

    /// Closes the connection. Must not report further events.
    fn close(&self, reason: &str);
}

impl<H: ConnectionHandle + ?Sized> ConnectionHandle for Box<H> {
    fn send_action(&self, action: Action) -> Result<(), HandleError> {
        (**self).send_action(action)
    }

    fn close(&self, reason: &str) {
        (**self).close(reason)
    }
}

/// Builds connection handles.
///
/// `connect` must not block on network I/O: it returns a handle right away
/// and reports progress through `events`. A synchronous error means the
/// handle could not even be constructed.
pub trait Connector: Send + Sync + 'static {
    /// The handle type produced.
    type Handle: ConnectionHandle;

    /// Starts a connection attempt for `settings`.
    fn connect(
        &self,
        settings: &SessionSettings,
        events: EventSink,
    ) -> Result<Self::Handle, ConnectError>;
}

impl<C: Connector> Connector for Arc<C> {
    type Handle = C::Handle;

    fn connect(
        &self,
        settings: &SessionSettings,
        events: EventSink,
    ) -> Result<Self::Handle, ConnectError> {
        (**self).connect(settings, events)
    }
}

/// A domain event as delivered to observers.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Name of the controller that routed the event.
    pub controller: String,
    /// Generation of the handle that produced it.
    pub generation: Generation,
    /// When the router delivered it.
    pub timestamp: Instant,
    /// What happened.
    pub kind: DomainEvent,
}

impl LinkEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            DomainEvent::Spawned => "spawned",
            DomainEvent::Chat { .. } => "chat",
            DomainEvent::Whisper { .. } => "whisper",
            DomainEvent::Health { .. } => "health",
        }
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn source_name(&self) -> &str {
        &self.controller
    }
}
