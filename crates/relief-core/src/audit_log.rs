//! Append-only, timestamped event log attached to one processing run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const TRUNCATION_MESSAGE: &str = "Logs truncated due to size limit";
const TRUNCATION_COMPONENT: &str = "audit_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub unix_timestamp: f64,
    pub component: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    fn at(timestamp: DateTime<Utc>, component: &str, level: LogLevel, message: String) -> Self {
        Self {
            timestamp,
            unix_timestamp: unix_seconds(timestamp),
            component: component.to_string(),
            level,
            message,
        }
    }

    pub fn is_truncation_marker(&self) -> bool {
        self.component == TRUNCATION_COMPONENT && self.message == TRUNCATION_MESSAGE
    }
}

/// Ordered log sequence. Timestamps never decrease from one entry to the next.
///
/// Not synchronized: concurrent steps each build their own log and the
/// coordinator folds them in with [`AuditLog::absorb`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<LogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry stamped with the current time and mirrors it to
    /// the tracing subscriber. Every call appends, retries included.
    pub fn append(&mut self, component: &str, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!(component, "{message}"),
            LogLevel::Success => info!(component, outcome = "success", "{message}"),
            LogLevel::Error => error!(component, "{message}"),
        }
        let timestamp = self.clamp(Utc::now());
        self.entries
            .push(LogEntry::at(timestamp, component, level, message));
    }

    pub fn info(&mut self, component: &str, message: impl Into<String>) {
        self.append(component, LogLevel::Info, message);
    }

    pub fn success(&mut self, component: &str, message: impl Into<String>) {
        self.append(component, LogLevel::Success, message);
    }

    pub fn error(&mut self, component: &str, message: impl Into<String>) {
        self.append(component, LogLevel::Error, message);
    }

    /// Moves every entry of `other` to the end of this log, in order.
    ///
    /// Entries stamped earlier than the current tail (a step that finished
    /// before its sibling was merged) are lifted to the tail's timestamp.
    pub fn absorb(&mut self, other: AuditLog) {
        for mut entry in other.entries {
            let timestamp = self.clamp(entry.timestamp);
            if timestamp != entry.timestamp {
                entry.timestamp = timestamp;
                entry.unix_timestamp = unix_seconds(timestamp);
            }
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the log as a JSON array no larger than `ceiling` bytes in
    /// the common case. An oversized log is replaced by its first `head`
    /// entries followed by a single truncation marker.
    pub fn to_bounded_json(&self, ceiling: usize, head: usize) -> serde_json::Result<String> {
        let full = serde_json::to_string(&self.entries)?;
        if full.len() <= ceiling {
            return Ok(full);
        }

        let mut kept: Vec<LogEntry> = self.entries.iter().take(head).cloned().collect();
        let floor = kept.last().map(|entry| entry.timestamp);
        let stamp = match floor {
            Some(last) if last > Utc::now() => last,
            _ => Utc::now(),
        };
        kept.push(LogEntry::at(
            stamp,
            TRUNCATION_COMPONENT,
            LogLevel::Info,
            TRUNCATION_MESSAGE.to_string(),
        ));
        serde_json::to_string(&kept)
    }

    fn clamp(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        match self.entries.last() {
            Some(last) if last.timestamp > candidate => last.timestamp,
            _ => candidate,
        }
    }
}

fn unix_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1_000_000.0
}
