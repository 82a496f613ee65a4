//! The session root tying the event pipe and map tracker together.

use crate::config::SessionConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::events::EventLog;
use crate::maps::MapTracker;
use crate::subscriptions::{
    SessionEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::tooltip::parse_tooltip;
use crate::types::{DispatchMode, LogEntry, LoggedEntry, MapState, SessionView};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// A session shared between its owner and any dispatchers.
pub type SharedSession = Arc<Mutex<Session>>;

/// Session state: the event pipe, the map tracker, and the renderers
/// watching them.
///
/// All mutation goes through `&mut self`; share it as a [`SharedSession`]
/// when more than one caller needs access.
pub struct Session {
    config: SessionConfig,

    /// Event pipe.
    log: EventLog,

    /// Current/previous map.
    maps: MapTracker,

    /// Renderer subscriptions.
    subscriptions: SubscriptionManager,
}

impl Session {
    /// Create a new session with an empty log and the configured initial map.
    pub fn new(config: SessionConfig) -> Self {
        info!(
            current = %config.initial_current,
            previous = ?config.initial_previous,
            mode = ?config.dispatch_mode,
            "session started"
        );

        let maps = MapTracker::new(
            config.initial_current.clone(),
            config.initial_previous.clone(),
        );

        Self {
            config,
            log: EventLog::new(),
            maps,
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Create a session wrapped for sharing.
    pub fn shared(config: SessionConfig) -> SharedSession {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Create the dispatcher bound to a shared session.
    pub fn dispatcher(session: &SharedSession) -> Dispatcher {
        Dispatcher::new(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- Writes ---

    /// Handle a dispatched value according to the configured mode.
    ///
    /// In unified mode the map is shifted and then the value is logged as an
    /// entry; both happen on every call.
    pub fn dispatch(&mut self, value: &str) {
        self.set_current(value);
        if self.config.dispatch_mode == DispatchMode::Unified {
            self.drop_item(LogEntry::named(value));
        }
    }

    /// Shift the map tracker to a new current map.
    pub fn set_current(&mut self, new_map: impl Into<String>) {
        self.maps.set_current(new_map);
        self.subscriptions.broadcast_map(&self.maps.current_snapshot());
    }

    /// Append the configured default item.
    pub fn add_element(&mut self) -> &LoggedEntry {
        let entry = self.config.default_item.clone();
        self.drop_item(entry)
    }

    /// Append an arbitrary entry to the event pipe.
    pub fn drop_item(&mut self, entry: LogEntry) -> &LoggedEntry {
        let logged = self.log.append(entry);
        self.subscriptions.broadcast_entry(logged);
        logged
    }

    /// Parse a clipboard tooltip and append the item it describes.
    ///
    /// Unparseable text leaves the log untouched.
    pub fn drop_tooltip(&mut self, text: &str) -> Result<&LoggedEntry> {
        match parse_tooltip(text) {
            Ok(item) => Ok(self.drop_item(item.to_log_entry())),
            Err(e) => {
                warn!(error = %e, "ignoring clipboard text");
                Err(e.into())
            }
        }
    }

    // --- Reads ---

    pub fn entries(&self) -> &[LoggedEntry] {
        self.log.entries()
    }

    pub fn count(&self) -> usize {
        self.log.count()
    }

    pub fn current_snapshot(&self) -> MapState {
        self.maps.current_snapshot()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn maps(&self) -> &MapTracker {
        &self.maps
    }

    /// Everything a renderer needs, in one serializable value.
    pub fn view(&self) -> SessionView {
        SessionView {
            map: self.maps.current_snapshot(),
            count: self.log.count(),
            entries: self.log.entries().to_vec(),
        }
    }

    // --- Subscriptions ---

    /// Subscribe to session events using the configured buffer size.
    pub fn subscribe_default(&self) -> SubscriptionHandle {
        self.subscribe(SubscriptionConfig {
            buffer_size: self.config.subscription_buffer,
            ..Default::default()
        })
    }

    /// Subscribe to session events.
    ///
    /// With `replay` set, the current map and every existing entry are sent
    /// before the subscription goes live. A subscriber whose buffer cannot
    /// hold the replay is dropped.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let replay = config.replay;
        let handle = self.subscriptions.subscribe(config);

        if replay && !self.replay_to(handle.id) {
            self.subscriptions.unsubscribe(handle.id);
            return handle;
        }

        self.subscriptions.mark_caught_up(handle.id);
        handle
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    fn replay_to(&self, id: SubscriptionId) -> bool {
        let filter = match self.subscriptions.filter_of(id) {
            Some(filter) => filter,
            None => return false,
        };

        if filter.include_map_changes {
            let event = SessionEvent::MapChanged {
                state: self.maps.current_snapshot(),
            };
            if !self.subscriptions.send_to(id, event) {
                return false;
            }
        }

        if filter.include_entries {
            for logged in self.log.entries() {
                let event = SessionEvent::EntryAppended {
                    id: logged.id,
                    entry: logged.entry.clone(),
                };
                if !self.subscriptions.send_to(id, event) {
                    return false;
                }
            }
        }

        true
    }
}
