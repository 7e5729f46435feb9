//! Domain-visible activity log.
//!
//! Provider operations record their outcomes here (tagged with the owning
//! stash id) for the admin UI, independently of `tracing`. The contract is
//! "never blocks, never fails the caller": entries go through a bounded
//! queue via `try_send` and are dropped outright on backpressure rather than
//! stalling a request.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Queue capacity between callers and the drain task.
const QUEUE_CAPACITY: usize = 1024;

/// Maximum entries retained for the read API.
const RETAIN_ENTRIES: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stash_id: Option<String>,
    pub message: String,
}

/// Bounded, best-effort activity log.
pub struct ActivityLog {
    tx: mpsc::Sender<LogEntry>,
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
}

impl ActivityLog {
    /// Create the log and spawn its drain task on the current runtime.
    pub fn new() -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<LogEntry>(QUEUE_CAPACITY);
        let entries = Arc::new(RwLock::new(VecDeque::with_capacity(256)));

        let sink = Arc::clone(&entries);
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let mut entries = sink.write();
                if entries.len() >= RETAIN_ENTRIES {
                    entries.pop_front();
                }
                entries.push_back(entry);
            }
        });

        Arc::new(Self { tx, entries })
    }

    /// Record an entry; drops silently when the queue is full.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, stash_id: Option<&str>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            stash_id: stash_id.map(String::from),
            message: message.into(),
        };
        let _ = self.tx.try_send(entry);
    }

    pub fn debug(&self, message: impl Into<String>, stash_id: Option<&str>) {
        self.log(LogLevel::Debug, message, stash_id);
    }

    pub fn info(&self, message: impl Into<String>, stash_id: Option<&str>) {
        self.log(LogLevel::Info, message, stash_id);
    }

    pub fn warning(&self, message: impl Into<String>, stash_id: Option<&str>) {
        self.log(LogLevel::Warning, message, stash_id);
    }

    pub fn error(&self, message: impl Into<String>, stash_id: Option<&str>) {
        self.log(LogLevel::Error, message, stash_id);
    }

    /// Most recent entries first, optionally filtered by level and stash id.
    pub fn recent(
        &self,
        level: Option<LogLevel>,
        stash_id: Option<&str>,
        limit: usize,
    ) -> Vec<LogEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .filter(|e| level.map_or(true, |l| e.level == l))
            .filter(|e| stash_id.map_or(true, |id| e.stash_id.as_deref() == Some(id)))
            .take(limit)
            .cloned()
            .collect()
    }
}
