//! Append-only stream logs.
//!
//! A log holds any number of named streams. Each stream is a totally ordered
//! sequence of records numbered from 1. Appends carry the version the writer
//! expects the stream to be at; a mismatch is a conflict and nothing is written.

use crate::domain::types::TimestampUtc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// A stored event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub stream: String,
    pub sequence: u64,
    pub recorded_at: TimestampUtc,
    pub event_type: String,
    pub event_version: String,
    pub payload: serde_json::Value,
    pub metadata: HashMap<String, String>,
}

/// An event about to be appended; the log assigns sequence and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: String,
    pub event_version: String,
    pub payload: serde_json::Value,
    pub metadata: HashMap<String, String>,
}

/// A stored snapshot of a stream's folded state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub stream: String,
    pub sequence: u64,
    pub snapshot_at: TimestampUtc,
    pub state: serde_json::Value,
}

#[derive(Debug)]
pub enum LogError {
    /// The stream is not at the version the writer expected.
    VersionMismatch { stream: String, expected: u64, actual: u64 },
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl Display for LogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VersionMismatch {
                stream,
                expected,
                actual,
            } => write!(
                f,
                "stream {} is at version {}, expected {}",
                stream, actual, expected
            ),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for LogError {}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Storage behind the event store.
pub trait StreamLog: Send + Sync {
    /// All records of `stream` in order; empty if the stream does not exist.
    fn read(&self, stream: &str) -> Result<Vec<StoredEvent>, LogError>;

    /// Appends `events` if `stream` is at `expected_version`.
    fn append(&self, stream: &str, expected_version: u64, events: Vec<NewEvent>) -> Result<Vec<StoredEvent>, LogError>;

    /// Names of all streams that hold at least one record.
    fn streams(&self) -> Result<Vec<String>, LogError>;

    fn load_snapshot(&self, stream: &str) -> Result<Option<StoredSnapshot>, LogError>;

    fn save_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), LogError>;

    /// Sequence of the last record of `stream`, 0 if empty.
    fn version(&self, stream: &str) -> Result<u64, LogError> {
        Ok(self.read(stream)?.last().map(|e| e.sequence).unwrap_or(0))
    }
}

/// Numbers `events` after `current` and stamps them.
pub(crate) fn stamp(stream: &str, current: u64, events: Vec<NewEvent>) -> Vec<StoredEvent> {
    events
        .into_iter()
        .enumerate()
        .map(|(i, e)| StoredEvent {
            stream: stream.to_string(),
            sequence: current + i as u64 + 1,
            recorded_at: TimestampUtc::now(),
            event_type: e.event_type,
            event_version: e.event_version,
            payload: e.payload,
            metadata: e.metadata,
        })
        .collect()
}
