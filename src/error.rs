//! Error types for the tracker.

use thiserror::Error;

/// Main error type for tracker operations.
///
/// The state containers themselves never fail; these cover the feeds and
/// configuration surrounding them.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tooltip error: {0}")]
    Tooltip(#[from] TooltipError),

    #[error("Session is closed")]
    SessionClosed,
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Config(e.to_string())
    }
}

/// Reasons a clipboard tooltip could not be turned into an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TooltipError {
    #[error("Empty tooltip")]
    Empty,

    #[error("No rarity line in tooltip")]
    MissingRarity,

    #[error("Unknown rarity: {0}")]
    UnknownRarity(String),

    #[error("Missing {0} line")]
    MissingLine(&'static str),

    #[error("Malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
