//! Append-only event log ("Event Pipe").

use crate::types::{EntryId, LogEntry, LoggedEntry, Timestamp};
use tracing::debug;

/// Append-only, insertion-ordered log of item entries.
///
/// There is no removal and no eviction: the log grows for the life of the
/// session.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    entries: Vec<LoggedEntry>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the end of the log.
    ///
    /// Returns the stored entry with its assigned id.
    pub fn append(&mut self, entry: LogEntry) -> &LoggedEntry {
        let id = self.next_id();

        debug!(%id, name = %entry.name, value = ?entry.value, "entry appended");

        self.entries.push(LoggedEntry {
            id,
            timestamp: Timestamp::now(),
            entry,
        });
        // Just pushed, so the log is non-empty.
        &self.entries[self.entries.len() - 1]
    }

    /// Number of entries appended so far.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LoggedEntry] {
        &self.entries
    }

    /// Get an entry by id.
    pub fn get(&self, id: EntryId) -> Option<&LoggedEntry> {
        id.index().and_then(|i| self.entries.get(i))
    }

    /// Most recently appended entry.
    pub fn last(&self) -> Option<&LoggedEntry> {
        self.entries.last()
    }

    /// Id the next append will receive.
    pub fn next_id(&self) -> EntryId {
        EntryId(self.entries.len() as u64).next()
    }

    /// Iterate entries starting at `from` (inclusive).
    ///
    /// Renderers use this to catch up from the last id they drew.
    pub fn iter_from(&self, from: EntryId) -> impl Iterator<Item = &LoggedEntry> {
        let start = from.index().unwrap_or(0).min(self.entries.len());
        self.entries[start..].iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_count() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.append(LogEntry::default());
        log.append(LogEntry::named("Shaped Cage"));

        assert_eq!(log.count(), 2);
        assert_eq!(log.entries()[0].entry.name, "Chaos Orb");
        assert_eq!(log.entries()[1].entry.name, "Shaped Cage");
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut log = EventLog::new();
        assert_eq!(log.next_id(), EntryId(1));

        let first = log.append(LogEntry::named("a")).id;
        let second = log.append(LogEntry::named("b")).id;

        assert_eq!(first, EntryId(1));
        assert_eq!(second, EntryId(2));
        assert_eq!(log.next_id(), EntryId(3));
        assert_eq!(log.get(EntryId(2)).unwrap().entry.name, "b");
        assert!(log.get(EntryId(0)).is_none());
        assert!(log.get(EntryId(3)).is_none());
    }

    #[test]
    fn test_entries_stable_between_appends() {
        let mut log = EventLog::new();
        log.append(LogEntry::named("a"));

        let first_read = log.entries().to_vec();
        let second_read = log.entries().to_vec();
        assert_eq!(first_read, second_read);

        log.append(LogEntry::named("b"));
        assert_eq!(&log.entries()[..1], &first_read[..]);
    }

    #[test]
    fn test_iter_from() {
        let mut log = EventLog::new();
        for name in ["a", "b", "c", "d"] {
            log.append(LogEntry::named(name));
        }

        let names: Vec<_> = log
            .iter_from(EntryId(3))
            .map(|e| e.entry.name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "d"]);

        assert_eq!(log.iter_from(EntryId(0)).count(), 4);
        assert_eq!(log.iter_from(EntryId(99)).count(), 0);
    }

    #[test]
    fn test_empty_name_accepted() {
        let mut log = EventLog::new();
        log.append(LogEntry::named(""));
        assert_eq!(log.last().unwrap().entry.name, "");
    }
}
