//! Routes handle events to the controller and to domain observers.
//!
//! The router holds a registration token, the [`Generation`] of the one
//! handle it currently listens to. Detaching clears the token synchronously;
//! from then on every event from that handle is stale, including events that
//! were already queued when the teardown happened.

use crate::handle::{DomainEvent, Envelope, HandleEvent, SessionEvent};
use relink_core::events::{BoxedEventListener, EventListeners};
use relink_core::generation::Generation;
use std::time::Instant;

/// Lifecycle events the controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Established,
    Terminated(String),
    Faulted(String),
}

/// Outcome of routing one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Routed {
    /// A lifecycle event from the current handle.
    Lifecycle(Generation, Lifecycle),
    /// A domain event handed to the observers.
    Delivered,
    /// The envelope came from a handle that is no longer current.
    Stale(Generation),
}

pub(crate) struct EventRouter {
    name: String,
    current: Option<Generation>,
    observers: EventListeners<SessionEvent>,
}

impl EventRouter {
    pub(crate) fn new(name: String, observers: EventListeners<SessionEvent>) -> Self {
        Self {
            name,
            current: None,
            observers,
        }
    }

    /// Listens to `generation` from now on, replacing any previous
    /// registration.
    pub(crate) fn attach(&mut self, generation: Generation) {
        debug_assert!(
            self.current.is_none(),
            "attach while {:?} is still registered",
            self.current
        );
        self.current = Some(generation);
    }

    /// Invalidates the current registration.
    pub(crate) fn detach(&mut self) -> Option<Generation> {
        self.current.take()
    }

    pub(crate) fn current(&self) -> Option<Generation> {
        self.current
    }

    pub(crate) fn add_observer(&mut self, observer: BoxedEventListener<SessionEvent>) {
        self.observers.add_shared(observer);
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn route(&self, envelope: Envelope) -> Routed {
        if self.current != Some(envelope.generation) {
            return Routed::Stale(envelope.generation);
        }

        let lifecycle = match envelope.event {
            HandleEvent::Established => Lifecycle::Established,
            HandleEvent::Terminated(reason) => Lifecycle::Terminated(reason),
            HandleEvent::Faulted(error) => Lifecycle::Faulted(error),
            HandleEvent::Domain(kind) => {
                self.deliver(envelope.generation, kind);
                return Routed::Delivered;
            }
        };
        Routed::Lifecycle(envelope.generation, lifecycle)
    }

    fn deliver(&self, generation: Generation, kind: DomainEvent) {
        if self.observers.is_empty() {
            return;
        }
        self.observers.emit(&SessionEvent {
            controller: self.name.clone(),
            generation,
            timestamp: Instant::now(),
            kind,
        });
    }
}
