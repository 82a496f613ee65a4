//! Console front end for a tracker session.
//!
//! Reads commands from stdin and prints session events as JSON lines:
//!
//! - `dispatch <map>`: push a map change; the value is taken as written,
//!   and a bare `dispatch` pushes the empty map
//! - `add`: append the configured default item
//! - `tooltip <file>`: append the item described by a saved tooltip
//! - `tooltip`: read a pasted tooltip from the following lines, up to `end`
//! - `show`: print the full session view
//! - `quit`: exit
//!
//! Any other non-empty line is dispatched as is.
//!
//! With `--client-log`, area changes written to the game client's log are
//! dispatched as they appear.

use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use beancounter::{
    Dispatcher, DropReason, Session, SessionConfig, SessionEvent, SharedSession,
    SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, ZoneLogReader, ZoneLogWatcher,
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Closes a pasted tooltip block.
const BLOCK_END: &str = "end";

#[derive(Parser, Debug)]
#[command(author, version, about = "Map and loot tracker session")]
struct Args {
    /// JSON session configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Game client log (Client.txt) to follow for area changes
    #[arg(long)]
    client_log: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Quit,
    Add,
    Show,
    Dispatch(String),
    TooltipFile(PathBuf),
    TooltipBlock,
}

impl Command {
    /// Empty lines carry no command.
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches('\r');
        let command = match line {
            "" => return None,
            "quit" => Command::Quit,
            "add" => Command::Add,
            "show" => Command::Show,
            "dispatch" => Command::Dispatch(String::new()),
            "tooltip" => Command::TooltipBlock,
            _ => {
                if let Some(value) = line.strip_prefix("dispatch ") {
                    Command::Dispatch(value.to_string())
                } else if let Some(path) = line.strip_prefix("tooltip ") {
                    Command::TooltipFile(PathBuf::from(path))
                } else {
                    Command::Dispatch(line.to_string())
                }
            }
        };
        Some(command)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let subscription_buffer = config.subscription_buffer;

    let session = Session::shared(config);
    let dispatcher = Session::dispatcher(&session);

    let events = session.lock().subscribe(SubscriptionConfig {
        buffer_size: subscription_buffer,
        replay: true,
        filter: SubscriptionFilter::all(),
    });
    let subscription = events.id;
    let printer = thread::spawn(move || print_events(events, io::stdout()));

    if let Some(path) = &args.client_log {
        let reader = ZoneLogReader::open_at_end(path)?;
        let watcher = ZoneLogWatcher::new(reader, dispatcher.clone())?;
        info!(path = %path.display(), "following client log");
        thread::spawn(move || {
            if let Err(e) = watcher.run() {
                error!(error = %e, "stopped following client log");
            }
        });
    }

    let result = run_commands(io::stdin().lock(), io::stdout(), &session, &dispatcher);

    // Closing the subscription lets the printer finish what is buffered.
    session.lock().unsubscribe(subscription);
    match printer.join() {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(error = %e, "can't print events"),
        Err(_) => error!("event printer panicked"),
    }

    result
}

/// Write each event as a JSON line until the subscription ends.
fn print_events<W: Write>(events: SubscriptionHandle, mut out: W) -> io::Result<W> {
    while let Ok(event) = events.recv() {
        match &event {
            SessionEvent::CaughtUp => continue,
            SessionEvent::Dropped {
                reason: DropReason::Unsubscribed,
            } => break,
            _ => {}
        }
        match serde_json::to_string(&event) {
            Ok(line) => writeln!(out, "{}", line)?,
            Err(e) => error!(error = %e, "can't encode event"),
        }
        if matches!(event, SessionEvent::Dropped { .. }) {
            warn!("event printer fell behind and was dropped");
            break;
        }
    }
    out.flush()?;
    Ok(out)
}

fn run_commands<R: BufRead, W: Write>(
    input: R,
    mut out: W,
    session: &SharedSession,
    dispatcher: &Dispatcher,
) -> Result<(), Box<dyn Error>> {
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let command = match Command::parse(&line?) {
            Some(command) => command,
            None => continue,
        };

        match command {
            Command::Quit => break,
            Command::Add => {
                session.lock().add_element();
            }
            Command::Show => {
                let view = session.lock().view();
                writeln!(out, "{}", serde_json::to_string(&view)?)?;
            }
            Command::Dispatch(value) => dispatcher.dispatch(&value)?,
            Command::TooltipFile(path) => match fs::read_to_string(&path) {
                Ok(text) => drop_tooltip(session, &text),
                Err(e) => warn!(path = %path.display(), error = %e, "can't read tooltip"),
            },
            Command::TooltipBlock => {
                let mut text = String::new();
                for line in lines.by_ref() {
                    let line = line?;
                    let line = line.trim_end_matches('\r');
                    if line == BLOCK_END {
                        break;
                    }
                    text.push_str(line);
                    text.push('\n');
                }
                drop_tooltip(session, &text);
            }
        }
    }

    Ok(())
}

fn drop_tooltip(session: &SharedSession, text: &str) {
    let mut session = session.lock();
    match session.drop_tooltip(text) {
        Ok(logged) => info!(id = %logged.id, name = %logged.entry.name, "item dropped"),
        Err(e) => error!(error = %e, "tooltip not logged"),
    }
}
