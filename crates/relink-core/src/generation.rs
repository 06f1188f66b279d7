//! Generation tokens for connection handles.
//!
//! Every connection handle is stamped with a [`Generation`] when it is
//! created. Whoever owns the handles remembers the generation it currently
//! trusts; anything carrying another generation comes from a superseded
//! handle and must be ignored.

use std::fmt;

/// Identity of one connection handle.
///
/// Generations are strictly increasing for a given [`GenerationCounter`],
/// so a larger value always belongs to a newer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any handle was created.
    pub const ZERO: Generation = Generation(0);

    /// Returns the raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<Generation> for u64 {
    fn from(generation: Generation) -> u64 {
        generation.0
    }
}

/// Issues monotonically increasing generations.
///
/// Single owner: the counter lives inside the component that creates handles
/// and is advanced only from its event loop.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    last: u64,
}

impl GenerationCounter {
    /// Creates a counter whose first issued generation is `#1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next generation.
    pub fn next(&mut self) -> Generation {
        self.last = self.last.wrapping_add(1);
        Generation(self.last)
    }
}
