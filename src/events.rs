//! Append-only execution log for a run.
//!
//! This is run-visible history (the feed an observer renders), not the
//! crate's internal diagnostics file in [`crate::log`]. Entries are never
//! mutated or removed; iteration order is append order is causal order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    /// Intermediate reasoning surfaced by an agent, distinct from results.
    Thought,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Thought => "thought",
        };
        write!(f, "{}", s)
    }
}

/// One record in the execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry id.
    pub id: Uuid,
    /// Sequence number within the run, monotonically increasing from 0.
    pub sequence: u64,
    /// Name of the agent (or subsystem) that produced the entry.
    pub agent: String,
    /// Human-readable message.
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// The run's append-only event history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning its sequence number.
    pub fn push(&mut self, agent: impl Into<String>, message: impl Into<String>, severity: Severity) {
        let entry = LogEntry {
            id: Uuid::new_v4(),
            sequence: self.entries.len() as u64,
            agent: agent.into(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        };
        self.entries.push(entry);
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry, if any.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}
