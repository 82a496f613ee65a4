//! Subscription system for live session updates.
//!
//! Renderers subscribe to the session and redraw from the events they
//! receive:
//! - Appended event pipe entries
//! - Map changes
//!
//! Subscriptions support:
//! - Filtering to entries or map changes
//! - Replay of existing state before going live
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let handle = session.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::maps(),
//!     replay: true,
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(SessionEvent::MapChanged { state }) => println!("Now in {}", state.current),
//!         Ok(SessionEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, SessionEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
