//! Function log retrieval and the deduplicating watch loop.
//!
//! The log endpoint returns a window of recent records, so consecutive polls
//! overlap. [`LogWatcher`] filters each polled batch down to records that are
//! new: a record is emitted only if it is not older than the last emitted
//! record and was not part of the previous batch.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default poll interval for `--watch`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity at which the watch loop checks for interruption while sleeping.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// The log line itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub line: String,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub timestamp: String,
}

/// One log record as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub project: String,
    pub log: LogEntry,
}

impl LogRecord {
    /// Identity hash over every field, in a fixed order.
    pub fn hash(&self) -> u64 {
        let mut key = String::with_capacity(
            self.container.len()
                + self.function.len()
                + self.project.len()
                + self.log.kind.len()
                + self.log.stream.len()
                + self.log.line.len()
                + self.log.timestamp.len(),
        );
        key.push_str(&self.container);
        key.push_str(&self.function);
        key.push_str(&self.project);
        key.push_str(&self.log.kind);
        key.push_str(&self.log.stream);
        key.push_str(&self.log.line);
        key.push_str(&self.log.timestamp);
        sdbm_hash(&key)
    }

    /// Parsed timestamp.
    pub fn timestamp(&self) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.log.timestamp)
            .map_err(|_| Error::InvalidTimestamp(self.log.timestamp.clone()))
    }
}

/// Display form of a record: `<timestamp>: <line>`.
pub fn format_line(record: &LogRecord) -> String {
    format!("{}: {}", record.log.timestamp, record.log.line)
}

/// sdbm string hash (`c + (h << 6) + (h << 16) - h` per byte).
pub fn sdbm_hash(data: &str) -> u64 {
    data.bytes().fold(0u64, |hash, c| {
        u64::from(c)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash)
    })
}

/// Deduplication state carried between polls.
#[derive(Debug, Default)]
pub struct LogWatcher {
    last_seen: HashSet<u64>,
    last_emitted: Option<DateTime<FixedOffset>>,
}

impl LogWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the most recently emitted record.
    pub fn last_emitted(&self) -> Option<DateTime<FixedOffset>> {
        self.last_emitted
    }

    /// Filter one polled batch, returning the records to emit in order.
    ///
    /// On error the watcher state is left untouched.
    pub fn process(&mut self, batch: &[LogRecord]) -> Result<Vec<LogRecord>> {
        let parsed = batch
            .iter()
            .map(|record| Ok((record, record.timestamp()?, record.hash())))
            .collect::<Result<Vec<_>>>()?;

        let mut emitted = Vec::new();
        let mut last_emitted = self.last_emitted;
        for (record, timestamp, hash) in &parsed {
            if last_emitted.is_some_and(|last| *timestamp < last) {
                continue;
            }
            if self.last_seen.contains(hash) {
                continue;
            }
            emitted.push((*record).clone());
            last_emitted = Some(*timestamp);
        }

        self.last_emitted = last_emitted;
        self.last_seen = parsed.iter().map(|(_, _, hash)| *hash).collect();
        Ok(emitted)
    }
}

/// Something that can be polled for the current log window.
pub trait LogSource {
    /// Fetch the current batch in chronological order.
    fn fetch(&mut self) -> Result<Vec<LogRecord>>;
}

impl<F> LogSource for F
where
    F: FnMut() -> Result<Vec<LogRecord>>,
{
    fn fetch(&mut self) -> Result<Vec<LogRecord>> {
        self()
    }
}

/// Poll `source` every `interval`, writing new records to `out` until
/// `running` is cleared.
///
/// Returns the number of records written. Fetch and parse errors end the
/// loop; there is no retry.
pub fn watch<S, W>(
    source: &mut S,
    out: &mut W,
    interval: Duration,
    running: &AtomicBool,
) -> Result<usize>
where
    S: LogSource + ?Sized,
    W: Write,
{
    let mut watcher = LogWatcher::new();
    let mut written = 0;

    while running.load(Ordering::SeqCst) {
        let batch = source.fetch()?;
        let fresh = watcher.process(&batch)?;
        tracing::debug!(fetched = batch.len(), emitted = fresh.len(), "polled logs");
        for record in &fresh {
            writeln!(out, "{}", format_line(record))?;
        }
        out.flush()?;
        written += fresh.len();

        sleep_while_running(interval, running);
    }

    Ok(written)
}

fn sleep_while_running(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
