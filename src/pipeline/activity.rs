//! Activity log: bounded, timestamped record of engine findings.
//!
//! Each entry is also emitted as a `tracing` event so the daemon log and the
//! in-memory log served by the API stay in step.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let local = self.timestamp.with_timezone(&Local);
        write!(
            f,
            "[{}] {} {}",
            local.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Append-only ring of activity entries; oldest dropped first.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl ActivityLog {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries,
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogLevel::Error, message);
    }

    pub fn record(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(target: "ipv6_sentry::activity", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "ipv6_sentry::activity", "{}", message),
            LogLevel::Error => tracing::error!(target: "ipv6_sentry::activity", "{}", message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// Most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(crate::config::defaults::ACTIVITY_LOG_MAX_ENTRIES)
    }
}
