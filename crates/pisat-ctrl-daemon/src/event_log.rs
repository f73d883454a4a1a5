//! Event log: the most recent daemon event plus a pluggable line sink.
//!
//! Every handler reports what it did through [`EventLog`]. The latest message
//! is kept as the current event and mirrored into telemetry; each line is also
//! handed to an [`EventSink`] for durable or console output.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use pisat_ctrl_types::{encode_text, TextField};
use tracing::{error, info, warn};

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Destination for event lines.
pub trait EventSink: Send + Sync {
    fn append(&self, level: EventLevel, message: &str);
}

/// Emits each event as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn append(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => info!(target: "pisat_ctrl::event", "{message}"),
            EventLevel::Warn => warn!(target: "pisat_ctrl::event", "{message}"),
            EventLevel::Error => error!(target: "pisat_ctrl::event", "{message}"),
        }
    }
}

/// Appends events to a file and also forwards them to tracing.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl FileSink {
    /// Open (or create) the log file for appending.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileSink {
    fn append(&self, level: EventLevel, message: &str) {
        TracingSink.append(level, message);

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        if let Err(e) = writeln!(file, "{secs} {level} {message}") {
            warn!(path = %self.path.display(), error = %e, "failed to append to event log file");
        }
    }
}

/// Records events in memory. Cloning shares the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(EventLevel, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event, oldest first.
    pub fn lines(&self) -> Vec<(EventLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Messages recorded at the given level.
    pub fn messages_at(&self, level: EventLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn append(&self, level: EventLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

/// The most recent event plus the sink every event is written to.
pub struct EventLog {
    sink: Box<dyn EventSink>,
    current: String,
    current_field: TextField,
}

impl EventLog {
    pub fn new(sink: Box<dyn EventSink>) -> Self {
        Self {
            sink,
            current: String::new(),
            current_field: encode_text(""),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(EventLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(EventLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(EventLevel::Error, message.into());
    }

    pub fn record(&mut self, level: EventLevel, message: String) {
        self.sink.append(level, &message);
        self.current_field = encode_text(&message);
        self.current = message;
    }

    /// The most recent message, untruncated.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The most recent message as a telemetry text field.
    pub fn current_field(&self) -> TextField {
        self.current_field
    }
}
