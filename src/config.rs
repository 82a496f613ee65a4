//! Session configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! (or no file at all) yields a working session.

use crate::error::{Result, TrackerError};
use crate::types::{DispatchMode, LogEntry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Map shown as current before anything is dispatched.
    pub initial_current: String,

    /// Map shown as previous before anything is dispatched.
    pub initial_previous: Option<String>,

    /// Record appended by the "add an element" trigger.
    pub default_item: LogEntry,

    /// Whether dispatch also logs the map as an entry.
    pub dispatch_mode: DispatchMode,

    /// Buffer size for subscriptions created through the session.
    pub subscription_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_current: "Shaped Cage".to_string(),
            initial_previous: None,
            default_item: LogEntry::default(),
            dispatch_mode: DispatchMode::Unified,
            subscription_buffer: 1000,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    fn check(&self) -> Result<()> {
        if self.subscription_buffer == 0 {
            return Err(TrackerError::Config(
                "subscription_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
