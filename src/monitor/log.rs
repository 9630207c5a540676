//! In-memory activity log.
//!
//! Each simulated incoming message appends one pending entry; the entry is
//! mutated exactly once when its reply resolves. Resolution is a keyed
//! replace, so resolving the same id twice with the same text is idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder reply text while generation is in flight.
pub const PENDING_REPLY: &str = "...";

/// Where a log entry came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogSource {
    /// Fabricated by the interval-driven simulator.
    Simulator,
    /// Triggered manually (e.g. a test-message button or CLI command).
    Manual,
}

/// One incoming message and its (eventual) outbound reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLogEntry {
    pub id: String,
    /// Synthetic sender phone string.
    pub from: String,
    pub incoming_message: String,
    /// [`PENDING_REPLY`] until resolved.
    pub outbound_reply: String,
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
}

impl ActivityLogEntry {
    pub fn is_pending(&self) -> bool {
        self.outbound_reply == PENDING_REPLY
    }
}

/// Ordered collection of log entries, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<ActivityLogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending entry and return its id.
    pub fn push_pending(
        &mut self,
        from: impl Into<String>,
        incoming_message: impl Into<String>,
        source: LogSource,
        timestamp: DateTime<Utc>,
    ) -> String {
        let entry = ActivityLogEntry {
            id: Uuid::new_v4().to_string(),
            from: from.into(),
            incoming_message: incoming_message.into(),
            outbound_reply: PENDING_REPLY.to_string(),
            timestamp,
            source,
        };
        let id = entry.id.clone();
        self.entries.insert(0, entry);
        id
    }

    /// Replace the reply text of the entry with the given id.
    ///
    /// Returns `false` when no such entry exists. Writing the same id twice
    /// is safe; the last write wins.
    pub fn resolve(&mut self, id: &str, reply: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.outbound_reply = reply.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ActivityLogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[ActivityLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Discard all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_entry_carries_placeholder() {
        let mut log = ActivityLog::new();
        let id = log.push_pending("+1 (555) 123-4567", "Hi", LogSource::Manual, Utc::now());

        let entry = log.get(&id).unwrap();
        assert!(entry.is_pending());
        assert_eq!(entry.outbound_reply, PENDING_REPLY);
        assert_eq!(log.pending_count(), 1);
    }

    #[test]
    fn entries_are_newest_first() {
        let mut log = ActivityLog::new();
        log.push_pending("a", "first", LogSource::Simulator, Utc::now());
        let newest = log.push_pending("b", "second", LogSource::Simulator, Utc::now());

        assert_eq!(log.entries()[0].id, newest);
        assert_eq!(log.entries()[1].incoming_message, "first");
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut log = ActivityLog::new();
        let id = log.push_pending("a", "question", LogSource::Simulator, Utc::now());

        assert!(log.resolve(&id, "answer"));
        let once = log.clone();

        assert!(log.resolve(&id, "answer"));
        assert_eq!(log.entries(), once.entries());
        assert_eq!(log.pending_count(), 0);
    }

    #[test]
    fn resolve_unknown_id_is_a_noop() {
        let mut log = ActivityLog::new();
        log.push_pending("a", "question", LogSource::Simulator, Utc::now());
        assert!(!log.resolve("missing", "answer"));
        assert_eq!(log.pending_count(), 1);
    }
}
