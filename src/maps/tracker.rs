//! Current/previous map tracking.

use crate::types::MapState;
use tracing::debug;

/// Two-slot state machine holding the current and previous map.
#[derive(Debug, Clone)]
pub struct MapTracker {
    state: MapState,
    transitions: u64,
}

impl MapTracker {
    /// Create a tracker with an initial current map and optional previous map.
    pub fn new(current: impl Into<String>, previous: Option<String>) -> Self {
        Self {
            state: MapState::new(current, previous),
            transitions: 0,
        }
    }

    /// Install a new current map, shifting the old current into previous.
    ///
    /// Any string is accepted, including empty and repeated values.
    pub fn set_current(&mut self, new_map: impl Into<String>) {
        let new_map = new_map.into();
        // Read the old current before it is overwritten.
        let old = std::mem::replace(&mut self.state.current, new_map);

        debug!(current = %self.state.current, previous = %old, "map changed");

        self.state.previous = Some(old);
        self.transitions += 1;
    }

    /// Copy of the current state for display.
    pub fn current_snapshot(&self) -> MapState {
        self.state.clone()
    }

    pub fn current(&self) -> &str {
        &self.state.current
    }

    pub fn previous(&self) -> Option<&str> {
        self.state.previous.as_deref()
    }

    /// Number of `set_current` calls since creation.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}
