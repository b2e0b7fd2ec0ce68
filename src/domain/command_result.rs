//! Summary of what a command (or a chain of commands) appended.

use serde::{Deserialize, Serialize};

/// One appended event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub stream: String,
    pub sequence: usize,
    pub event_type: String,
}

/// Merge-capable handle over appended events. Callers chaining commands
/// (migrations, workspace lifecycle) merge the results of each step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    events: Vec<RecordedEvent>,
}

impl CommandResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<RecordedEvent>) -> Self {
        Self { events }
    }

    pub fn merge(mut self, other: CommandResult) -> Self {
        self.events.extend(other.events);
        self
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Highest sequence appended to `stream` by this result.
    pub fn last_sequence(&self, stream: &str) -> Option<usize> {
        self.events
            .iter()
            .filter(|e| e.stream == stream)
            .map(|e| e.sequence)
            .max()
    }
}
