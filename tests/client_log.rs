//! Following the game client's log file.

use beancounter::{
    Session, SessionConfig, SessionEvent, SubscriptionConfig, SubscriptionFilter, ZoneLogReader,
    ZoneLogWatcher,
};
use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind};
use notify::{Event, EventKind};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const CAGE: &str =
    "2019/01/05 14:23:11 12345678 a1b [INFO Client 1234] : You have entered Shaped Cage.\n";
const SEA: &str =
    "2019/01/05 14:31:02 12399999 a1b [INFO Client 1234] : You have entered Shaped Underground Sea.\n";
const NOISE: &str = "2019/01/05 14:31:01 12399990 a1b [INFO Client 1234] Connecting to instance server at 1.2.3.4:6112\n";

fn append(path: &Path, text: &str) {
    append_bytes(path, text.as_bytes());
}

fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

fn modified(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any))).add_path(path.to_path_buf()))
}

#[test]
fn test_reads_only_new_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, CAGE).unwrap();

    let mut reader = ZoneLogReader::open(&path).unwrap();
    let zones = reader.poll_zones().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].area, "Shaped Cage");

    assert!(reader.poll_zones().unwrap().is_empty());

    append(&path, NOISE);
    append(&path, SEA);
    let zones = reader.poll_zones().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].area, "Shaped Underground Sea");
    assert_eq!(
        zones[0].logged_at.map(|t| t.to_string()).as_deref(),
        Some("2019-01-05 14:31:02")
    );
}

#[test]
fn test_open_at_end_skips_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, CAGE).unwrap();

    let mut reader = ZoneLogReader::open_at_end(&path).unwrap();
    assert_eq!(reader.offset(), CAGE.len() as u64);
    assert!(reader.poll_zones().unwrap().is_empty());

    append(&path, SEA);
    assert_eq!(reader.poll_zones().unwrap().len(), 1);
}

#[test]
fn test_partial_line_held_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, "").unwrap();
    let mut reader = ZoneLogReader::open(&path).unwrap();

    let (head, tail) = SEA.split_at(40);
    append(&path, head);
    assert!(reader.read_new_lines().unwrap().is_empty());

    append(&path, tail);
    let lines = reader.read_new_lines().unwrap();
    assert_eq!(lines, vec![SEA.trim_end().to_string()]);
}

#[test]
fn test_crlf_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, CAGE.replace('\n', "\r\n")).unwrap();

    let mut reader = ZoneLogReader::open(&path).unwrap();
    let lines = reader.read_new_lines().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].ends_with('\r'));
}

#[test]
fn test_truncated_log_restarts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, format!("{}{}", CAGE, SEA)).unwrap();

    let mut reader = ZoneLogReader::open(&path).unwrap();
    assert_eq!(reader.poll_zones().unwrap().len(), 2);

    fs::write(&path, CAGE).unwrap();
    let zones = reader.poll_zones().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].area, "Shaped Cage");
}

#[test]
fn test_feed_dispatches_areas() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, format!("{}{}{}", CAGE, NOISE, SEA)).unwrap();

    let session = Session::shared(SessionConfig {
        initial_current: "Hideout".to_string(),
        ..Default::default()
    });
    let dispatcher = Session::dispatcher(&session);

    let mut reader = ZoneLogReader::open(&path).unwrap();
    assert_eq!(reader.feed(&dispatcher).unwrap(), 2);

    let guard = session.lock();
    let map = guard.current_snapshot();
    assert_eq!(map.current, "Shaped Underground Sea");
    assert_eq!(map.previous.as_deref(), Some("Shaped Cage"));
    assert_eq!(guard.count(), 2);
}

#[test]
fn test_character_split_across_writes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, "").unwrap();
    let mut reader = ZoneLogReader::open(&path).unwrap();

    // "é" is 0xC3 0xA9; the first write ends between the two bytes.
    append_bytes(&path, b"2019/01/05 14:23:11 1 a [INFO Client 1] : You have entered Caf\xC3");
    assert!(reader.poll_zones().unwrap().is_empty());

    append_bytes(&path, b"\xA9.\n");
    let zones = reader.poll_zones().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].area, "Caf\u{e9}");
}

// --- Watcher ---

#[test]
fn test_watcher_feeds_on_modify() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, "").unwrap();

    let session = Session::shared(SessionConfig::default());
    let reader = ZoneLogReader::open(&path).unwrap();
    let mut watcher = ZoneLogWatcher::new(reader, Session::dispatcher(&session)).unwrap();

    append(&path, SEA);
    assert_eq!(watcher.handle(modified(&path)).unwrap(), 1);
    assert_eq!(session.lock().current_snapshot().current, "Shaped Underground Sea");

    // Nothing new since the last read.
    assert_eq!(watcher.handle(modified(&path)).unwrap(), 0);
}

#[test]
fn test_watcher_ignores_unrelated_events() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, "").unwrap();

    let session = Session::shared(SessionConfig::default());
    let reader = ZoneLogReader::open(&path).unwrap();
    let mut watcher = ZoneLogWatcher::new(reader, Session::dispatcher(&session)).unwrap();

    append(&path, SEA);
    let other = Event::new(EventKind::Create(CreateKind::File))
        .add_path(dir.path().join("other.txt"));
    let read = Event::new(EventKind::Access(AccessKind::Any)).add_path(path.clone());

    assert_eq!(watcher.handle(Ok(other)).unwrap(), 0);
    assert_eq!(watcher.handle(Ok(read)).unwrap(), 0);
    assert_eq!(session.lock().count(), 0);
}

#[test]
fn test_watcher_follows_live_writes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Client.txt");
    fs::write(&path, CAGE).unwrap();

    let session = Session::shared(SessionConfig::default());
    let changes = session.lock().subscribe(SubscriptionConfig {
        filter: SubscriptionFilter::maps(),
        ..Default::default()
    });

    let reader = ZoneLogReader::open_at_end(&path).unwrap();
    let watcher = ZoneLogWatcher::new(reader, Session::dispatcher(&session)).unwrap();
    thread::spawn(move || watcher.run());

    append(&path, SEA);

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = None;
    while seen.is_none() && Instant::now() < deadline {
        if let Ok(SessionEvent::MapChanged { state }) =
            changes.recv_timeout(Duration::from_millis(100))
        {
            seen = Some(state.current);
        }
    }
    assert_eq!(seen.as_deref(), Some("Shaped Underground Sea"));
}
