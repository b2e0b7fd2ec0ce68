//! File-based stream log.
//!
//! Stores each stream as JSONL (one JSON object per line) below one directory:
//! - Optimistic concurrency via file locking
//! - Snapshots for faster aggregate loading
//! - Atomic snapshot writes via temp file + rename

use super::log::{stamp, LogError, NewEvent, StoredEvent, StoredSnapshot, StreamLog};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOG_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone)]
pub struct FileStreamLog {
    /// Directory holding one `<stream>.jsonl` per stream.
    pub root: PathBuf,
}

impl FileStreamLog {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn log_path(&self, stream: &str) -> PathBuf {
        self.root.join(format!("{}.{}", encode_stream_name(stream), LOG_EXTENSION))
    }

    fn snapshot_path(&self, stream: &str) -> PathBuf {
        self.root
            .join("snapshots")
            .join(format!("{}.json", encode_stream_name(stream)))
    }
}

impl StreamLog for FileStreamLog {
    fn read(&self, stream: &str) -> Result<Vec<StoredEvent>, LogError> {
        let file = match File::open(self.log_path(stream)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let records = read_records(&file);
        file.unlock()?;
        records
    }

    fn append(&self, stream: &str, expected_version: u64, events: Vec<NewEvent>) -> Result<Vec<StoredEvent>, LogError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(&self.root)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.log_path(stream))?;

        // Acquire exclusive lock for writing
        file.lock_exclusive()?;

        // Check for concurrent writes (optimistic concurrency)
        let actual = read_records(&file)?.last().map(|e| e.sequence).unwrap_or(0);
        if actual != expected_version {
            file.unlock()?;
            return Err(LogError::VersionMismatch {
                stream: stream.to_string(),
                expected: expected_version,
                actual,
            });
        }

        let records = stamp(stream, actual, events);
        for record in &records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
        }

        // Ensure all data is persisted
        file.flush()?;
        file.sync_all()?;
        file.unlock()?;
        Ok(records)
    }

    fn streams(&self) -> Result<Vec<String>, LogError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut streams = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()).and_then(decode_stream_name) {
                streams.push(name);
            }
        }
        streams.sort();
        Ok(streams)
    }

    fn load_snapshot(&self, stream: &str) -> Result<Option<StoredSnapshot>, LogError> {
        let content = match std::fs::read_to_string(self.snapshot_path(stream)) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), LogError> {
        let path = self.snapshot_path(&snapshot.stream);
        write_atomically(&path, &serde_json::to_string(snapshot)?)
    }
}

fn read_records(file: &File) -> Result<Vec<StoredEvent>, LogError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Write to temp file, then rename for atomicity.
fn write_atomically(path: &Path, content: &str) -> Result<(), LogError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Stream names become file names: ASCII alphanumerics, `-` and `_` are kept,
/// every other byte is written as `%XX`.
pub(crate) fn encode_stream_name(stream: &str) -> String {
    let mut encoded = String::with_capacity(stream.len());
    for byte in stream.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

pub(crate) fn decode_stream_name(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
#[path = "tests/file_log_tests.rs"]
mod tests;
