//! Core infrastructure for relink.
//!
//! This crate holds the pieces shared by the session controller and anything
//! that observes it:
//! - Event system ([`LinkEvent`], [`EventListener`], [`EventListeners`])
//! - Handle generations ([`Generation`], [`GenerationCounter`]) used to tell
//!   the live connection handle apart from superseded ones

pub mod events;
pub mod generation;

pub use events::{EventListener, EventListeners, FnListener, LinkEvent};
pub use generation::{Generation, GenerationCounter};
