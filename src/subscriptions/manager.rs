//! Subscription manager for broadcasting session events.

use crate::types::{LoggedEntry, MapState};
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::types::{
    DropReason, SessionEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    filter: SubscriptionFilter,
    sender: Sender<SessionEvent>,
    /// Whether replay is complete.
    caught_up: bool,
}

impl Subscription {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone.
    fn try_send(&self, event: SessionEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Manages subscriptions and broadcasts events.
///
/// Delivery never blocks: a subscriber that cannot keep up is dropped and
/// the session carries on.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// The subscription does not receive live events until
    /// [`mark_caught_up`](Self::mark_caught_up) is called.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions.write().insert(
            id,
            Subscription {
                filter: config.filter,
                sender,
                caught_up: false,
            },
        );

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.write().remove(&id) {
            let _ = sub.sender.try_send(SessionEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Mark a subscription as live. Returns false if it was dropped.
    pub fn mark_caught_up(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let delivered = match subs.get_mut(&id) {
            Some(sub) => {
                sub.caught_up = true;
                sub.try_send(SessionEvent::CaughtUp)
            }
            None => return false,
        };
        if !delivered {
            subs.remove(&id);
        }
        delivered
    }

    /// Send an event directly to one subscription (for replay).
    /// Returns false if the subscription was dropped.
    pub fn send_to(&self, id: SubscriptionId, event: SessionEvent) -> bool {
        let subs = self.subscriptions.read();
        match subs.get(&id) {
            Some(sub) => sub.try_send(event),
            None => false,
        }
    }

    /// Filter for a subscription (for replay logic).
    pub fn filter_of(&self, id: SubscriptionId) -> Option<SubscriptionFilter> {
        self.subscriptions.read().get(&id).map(|s| s.filter)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    /// Broadcast an appended entry.
    pub fn broadcast_entry(&self, logged: &LoggedEntry) {
        let event = SessionEvent::EntryAppended {
            id: logged.id,
            entry: logged.entry.clone(),
        };
        self.broadcast(|sub| sub.caught_up && sub.filter.include_entries, event);
    }

    /// Broadcast a map change.
    pub fn broadcast_map(&self, state: &MapState) {
        let event = SessionEvent::MapChanged {
            state: state.clone(),
        };
        self.broadcast(|sub| sub.caught_up && sub.filter.include_map_changes, event);
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast<F>(&self, filter: F, event: SessionEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if filter(sub) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(subscription = id.0, "dropping slow subscriber");
                    // Might fail, that's ok
                    let _ = sub.sender.try_send(SessionEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryId, LogEntry, Timestamp};
    use std::time::Duration;

    fn make_entry(id: u64, name: &str) -> LoggedEntry {
        LoggedEntry {
            id: EntryId(id),
            timestamp: Timestamp::now(),
            entry: LogEntry::named(name),
        }
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::new();

        let handle = manager.subscribe(SubscriptionConfig::default());
        assert_eq!(manager.subscription_count(), 1);

        manager.unsubscribe(handle.id);
        assert_eq!(manager.subscription_count(), 0);
        assert_eq!(
            handle.try_recv().unwrap(),
            SessionEvent::Dropped {
                reason: DropReason::Unsubscribed
            }
        );
    }

    #[test]
    fn test_broadcast_to_matching() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig {
            filter: SubscriptionFilter::entries(),
            ..Default::default()
        });
        assert!(manager.mark_caught_up(handle.id));

        let caught_up = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(caught_up, SessionEvent::CaughtUp);

        manager.broadcast_entry(&make_entry(1, "Chaos Orb"));
        manager.broadcast_map(&MapState::new("A", None));

        let events = handle.drain();
        assert_eq!(
            events,
            vec![SessionEvent::EntryAppended {
                id: EntryId(1),
                entry: LogEntry::named("Chaos Orb"),
            }]
        );
    }

    #[test]
    fn test_not_caught_up_doesnt_receive() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig::default());

        manager.broadcast_map(&MapState::new("A", None));

        assert!(handle.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_drop_slow_subscriber() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig {
            buffer_size: 2,
            ..Default::default()
        });
        assert!(manager.mark_caught_up(handle.id));

        for i in 0..10 {
            manager.broadcast_entry(&make_entry(i + 1, "flood"));
        }

        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_disconnected_receiver_is_dropped() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig::default());
        assert!(manager.mark_caught_up(handle.id));
        drop(handle);

        manager.broadcast_map(&MapState::new("A", None));
        assert_eq!(manager.subscription_count(), 0);
    }
}
