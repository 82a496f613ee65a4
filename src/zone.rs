//! Zone changes read from the game client's log file.
//!
//! The client appends a line such as
//!
//! ```text
//! 2019/01/05 14:23:11 12345678 a1b [INFO Client 1234] : You have entered Shaped Cage.
//! ```
//!
//! every time the player changes area. [`ZoneLogReader`] tails the file and
//! turns those lines into [`ZoneEvent`]s that can be fed to a dispatcher;
//! [`ZoneLogWatcher`] re-reads it whenever the file system reports a write.

use crate::dispatcher::Dispatcher;
use crate::error::{Result, TrackerError};
use chrono::NaiveDateTime;
use crossbeam_channel::{unbounded, Receiver};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ENTERED_MARKER: &str = " : You have entered ";

/// Length of the `YYYY/MM/DD HH:MM:SS` prefix.
const STAMP_LEN: usize = 19;

const STAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A change of area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEvent {
    pub area: String,
    /// Client wall-clock time (local, no zone), if the line carries one.
    pub logged_at: Option<NaiveDateTime>,
}

/// Parse one client log line. Returns `None` for lines that are not area
/// changes.
pub fn parse_zone_line(line: &str) -> Option<ZoneEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    let start = line.find(ENTERED_MARKER)?;
    let rest = &line[start + ENTERED_MARKER.len()..];
    let area = rest.strip_suffix('.').unwrap_or(rest).trim();

    Some(ZoneEvent {
        area: area.to_string(),
        logged_at: parse_stamp(line),
    })
}

fn parse_stamp(line: &str) -> Option<NaiveDateTime> {
    let stamp = line.get(..STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// Incremental reader over a growing log file.
///
/// Each call to [`read_new_lines`](Self::read_new_lines) returns the complete
/// lines written since the previous call. Bytes after the last newline are
/// held back until the line is finished, so characters split across writes
/// are decoded whole. If the file shrinks (rotated or truncated) reading
/// restarts from the beginning.
#[derive(Debug)]
pub struct ZoneLogReader {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
}

impl ZoneLogReader {
    /// Read the file from its first byte.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::open(&path)?;
        Ok(Self {
            path,
            offset: 0,
            pending: Vec::new(),
        })
    }

    /// Skip existing content and only report lines written from now on.
    pub fn open_at_end(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let offset = File::open(&path)?.metadata()?.len();
        Ok(Self {
            path,
            offset,
            pending: Vec::new(),
        })
    }

    /// Byte offset up to which the file has been consumed.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read complete lines appended since the last call.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();

        if len < self.offset {
            debug!(path = %self.path.display(), "log shrank, rereading from start");
            self.offset = 0;
            self.pending.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let read = file.read_to_end(&mut self.pending)?;
        self.offset += read as u64;

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end]);
            lines.push(line.trim_end_matches('\r').to_string());
        }

        Ok(lines)
    }

    /// Read new lines and keep only area changes.
    pub fn poll_zones(&mut self) -> Result<Vec<ZoneEvent>> {
        Ok(self
            .read_new_lines()?
            .iter()
            .filter_map(|line| parse_zone_line(line))
            .collect())
    }

    /// Dispatch every new area change. Returns how many were dispatched.
    pub fn feed(&mut self, dispatcher: &Dispatcher) -> Result<usize> {
        let zones = self.poll_zones()?;
        for zone in &zones {
            dispatcher.dispatch(&zone.area)?;
        }
        Ok(zones.len())
    }
}

/// Feeds a [`ZoneLogReader`] into a dispatcher whenever the log changes.
///
/// Watches the log's directory, so a log that is deleted and recreated keeps
/// being followed.
pub struct ZoneLogWatcher {
    reader: ZoneLogReader,
    dispatcher: Dispatcher,
    events: Receiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl ZoneLogWatcher {
    /// Start watching. Events arriving before [`run`](Self::run) are queued.
    pub fn new(reader: ZoneLogReader, dispatcher: Dispatcher) -> Result<Self> {
        let (sender, events) = unbounded();
        let mut watcher = notify::recommended_watcher(sender)?;

        let dir = reader
            .path()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            reader,
            dispatcher,
            events,
            _watcher: watcher,
        })
    }

    pub fn reader(&self) -> &ZoneLogReader {
        &self.reader
    }

    fn concerns_log(&self, event: &Event) -> bool {
        let name = self.reader.path().file_name();
        event.paths.is_empty() || event.paths.iter().any(|p| p.file_name() == name)
    }

    /// React to one file system event. Returns how many area changes were
    /// dispatched.
    pub fn handle(&mut self, event: notify::Result<Event>) -> Result<usize> {
        match event {
            Ok(event)
                if (event.kind.is_modify() || event.kind.is_create())
                    && self.concerns_log(&event) =>
            {
                self.reader.feed(&self.dispatcher)
            }
            Ok(_) => Ok(0),
            Err(e) => {
                warn!(error = %e, "watch error");
                Ok(0)
            }
        }
    }

    /// Catch up, then follow the log until the session closes.
    pub fn run(mut self) -> Result<()> {
        match self.reader.feed(&self.dispatcher) {
            Err(TrackerError::SessionClosed) => return Ok(()),
            other => {
                other?;
            }
        }

        while let Ok(event) = self.events.recv() {
            match self.handle(event) {
                Ok(0) => {}
                Ok(n) => debug!(zones = n, "area changes dispatched"),
                Err(TrackerError::SessionClosed) => return Ok(()),
                Err(e) => warn!(error = %e, "can't read client log"),
            }
        }
        Ok(())
    }
}
