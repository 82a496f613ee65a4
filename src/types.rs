//! Core types for the tracker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Position of an entry in the event log (1-based, assigned on append).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl EntryId {
    pub fn next(self) -> Self {
        EntryId(self.0 + 1)
    }

    /// Zero-based index into the log.
    pub(crate) fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. A clock set before the epoch reads as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// An item entry in the event pipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Display name, e.g. "Chaos Orb" or a map name.
    pub name: String,

    /// Optional display value, e.g. "1c".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LogEntry {
    /// Entry with a name and no value.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Entry with both a name and a value.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Default for LogEntry {
    /// The default item record added by the "add an element" trigger.
    fn default() -> Self {
        LogEntry::with_value("Chaos Orb", "1c")
    }
}

/// A log entry as stored by the log (entry plus assigned position).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEntry {
    pub id: EntryId,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Current and previous map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapState {
    pub current: String,
    pub previous: Option<String>,
}

impl MapState {
    pub fn new(current: impl Into<String>, previous: Option<String>) -> Self {
        Self {
            current: current.into(),
            previous,
        }
    }

    /// Previous map, empty string when none has been recorded.
    pub fn previous_or_empty(&self) -> &str {
        self.previous.as_deref().unwrap_or("")
    }
}

/// Whether a dispatched map change is also logged as an item entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every dispatch shifts the map tracker and appends `{name: map}`.
    #[default]
    Unified,
    /// Dispatch only shifts the map tracker; entries come from `add_element`.
    Independent,
}

/// Everything a renderer needs to draw the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub map: MapState,
    pub count: usize,
    pub entries: Vec<LoggedEntry>,
}
