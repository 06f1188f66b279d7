//! Event system for connection lifecycle observability.
//!
//! The controller and the event router both publish through
//! [`EventListeners`]; listeners are plain trait objects so that status
//! reporters, loggers and test recorders can be attached without the publisher
//! knowing about them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events published by relink components.
pub trait LinkEvent: Send + Sync + fmt::Debug {
    /// Returns the kind of event (e.g. "retry_scheduled", "chat").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the component instance that published this event.
    fn source_name(&self) -> &str;
}

/// Trait for listening to relink events.
pub trait EventListener<E: LinkEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for shared event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered collection of event listeners.
///
/// Cloning is cheap: listeners are shared, the collection is not.
#[derive(Clone)]
pub struct EventListeners<E: LinkEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: LinkEvent> EventListeners<E> {
    /// Creates a new empty listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Adds an already shared listener, keeping the caller's reference alive.
    pub fn add_shared(&mut self, listener: BoxedEventListener<E>) {
        self.listeners.push(listener);
    }

    /// Delivers `event` to every listener in registration order.
    ///
    /// A panicking listener is isolated: the panic is caught and the
    /// remaining listeners still receive the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            #[cfg(feature = "tracing")]
            if outcome.is_err() {
                tracing::warn!(
                    event_type = event.event_type(),
                    source = event.source_name(),
                    "event listener panicked"
                );
            }
            #[cfg(not(feature = "tracing"))]
            let _ = outcome;
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: LinkEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LinkEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A closure-backed event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps `f` as a listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: LinkEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
