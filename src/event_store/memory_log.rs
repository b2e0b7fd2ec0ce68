//! In-memory stream log for tests and throwaway repositories.

use super::log::{stamp, LogError, NewEvent, StoredEvent, StoredSnapshot, StreamLog};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryStreamLog {
    streams: Mutex<BTreeMap<String, Vec<StoredEvent>>>,
    snapshots: Mutex<BTreeMap<String, StoredSnapshot>>,
}

impl MemoryStreamLog {
    pub fn new() -> Self {
        Self::default()
    }
}

// Appends never leave a stream half-written, so poisoned data stays valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StreamLog for MemoryStreamLog {
    fn read(&self, stream: &str) -> Result<Vec<StoredEvent>, LogError> {
        Ok(lock(&self.streams).get(stream).cloned().unwrap_or_default())
    }

    fn append(&self, stream: &str, expected_version: u64, events: Vec<NewEvent>) -> Result<Vec<StoredEvent>, LogError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let mut streams = lock(&self.streams);
        let records = streams.entry(stream.to_string()).or_default();
        let actual = records.last().map(|e| e.sequence).unwrap_or(0);
        if actual != expected_version {
            return Err(LogError::VersionMismatch {
                stream: stream.to_string(),
                expected: expected_version,
                actual,
            });
        }
        let stamped = stamp(stream, actual, events);
        records.extend(stamped.iter().cloned());
        Ok(stamped)
    }

    fn streams(&self) -> Result<Vec<String>, LogError> {
        Ok(lock(&self.streams)
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn load_snapshot(&self, stream: &str) -> Result<Option<StoredSnapshot>, LogError> {
        Ok(lock(&self.snapshots).get(stream).cloned())
    }

    fn save_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), LogError> {
        lock(&self.snapshots).insert(snapshot.stream.clone(), snapshot.clone());
        Ok(())
    }
}
