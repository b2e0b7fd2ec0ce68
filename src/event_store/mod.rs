//! Event storage for the content repository.
//!
//! This module provides append-only stream logs (JSONL files with advisory
//! locks, or memory) and the cqrs-es event store on top of them, which
//! composes forked histories and keeps snapshots.

pub mod file_log;
pub mod log;
pub mod memory_log;
pub mod store;

pub use file_log::FileStreamLog;
pub use log::{LogError, NewEvent, StoredEvent, StoredSnapshot, StreamLog};
pub use memory_log::MemoryStreamLog;
pub use store::{LogAggregateContext, LogEventStore, StoredAggregate};
