//! # Beancounter
//!
//! Session state for a map and loot tracker: an append-only event pipe of
//! dropped items, a current/previous map display, and a single dispatch
//! entry point that external triggers use to push map changes in.
//!
//! ## Core Concepts
//!
//! - **Event pipe**: append-only log of item entries, oldest first
//! - **Map tracker**: current and previous map, shifted on every change
//! - **Dispatcher**: the one handle external callers hold into a session
//! - **Subscriptions**: change events for renderers drawing the session
//! - **Feeds**: zone changes from the client log, items from tooltips
//!
//! ## Example
//!
//! ```ignore
//! use beancounter::{Session, SessionConfig};
//!
//! let session = Session::shared(SessionConfig::default());
//! let dispatcher = Session::dispatcher(&session);
//!
//! dispatcher.dispatch("Shaped Underground Sea")?;
//!
//! let view = session.lock().view();
//! assert_eq!(view.map.current, "Shaped Underground Sea");
//! assert_eq!(view.map.previous.as_deref(), Some("Shaped Cage"));
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod maps;
pub mod session;
pub mod subscriptions;
pub mod tooltip;
pub mod types;
pub mod zone;

// Re-exports
pub use config::SessionConfig;
pub use dispatcher::Dispatcher;
pub use error::{Result, TooltipError, TrackerError};
pub use events::EventLog;
pub use maps::MapTracker;
pub use session::{Session, SharedSession};
pub use subscriptions::{
    DropReason, SessionEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use tooltip::{parse_tooltip, Item, Rarity, StackSize};
pub use types::*;
pub use zone::{parse_zone_line, ZoneEvent, ZoneLogReader, ZoneLogWatcher};
