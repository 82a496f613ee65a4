//! Event pipe implementation.
//!
//! Item entries are kept in an append-only log in insertion order.

mod log;

pub use log::EventLog;
