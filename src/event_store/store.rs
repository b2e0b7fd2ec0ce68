//! cqrs-es event store over a `StreamLog`.
//!
//! Every aggregate instance owns one stream named `<aggregate type>-<id>`.
//! A stream may continue another stream's history: when the first own event
//! says so (e.g. a content stream fork), loading the aggregate first replays
//! the source stream up to the recorded version, recursively. Nothing is
//! copied on fork.

use super::log::{LogError, NewEvent, StoredEvent, StoredSnapshot, StreamLog};
use crate::domain::types::TimestampUtc;
use async_trait::async_trait;
use cqrs_es::{Aggregate, AggregateContext, AggregateError, DomainEvent, EventEnvelope, EventStore};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// How an aggregate maps onto streams.
pub trait StoredAggregate: Aggregate {
    fn stream_name(aggregate_id: &str) -> String {
        format!("{}-{}", Self::aggregate_type(), aggregate_id)
    }

    /// The (aggregate id, version) whose history precedes this stream, read
    /// from the stream's first own event.
    fn inherited_history(_first_event: &Self::Event) -> Option<(String, usize)> {
        None
    }
}

pub struct LogEventStore<A> {
    log: Arc<dyn StreamLog>,
    /// Snapshot after every N events (0 = disabled).
    snapshot_every: u64,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for LogEventStore<A> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            snapshot_every: self.snapshot_every,
            _aggregate: PhantomData,
        }
    }
}

/// Aggregate context for log-based storage.
pub struct LogAggregateContext<A: Aggregate> {
    pub aggregate_id: String,
    /// The rehydrated aggregate, including inherited history.
    pub aggregate: A,
    /// Sequence of the last own event applied.
    pub current_sequence: u64,
}

impl<A: Aggregate> AggregateContext<A> for LogAggregateContext<A> {
    fn aggregate(&self) -> &A {
        &self.aggregate
    }
}

impl<A: StoredAggregate> LogEventStore<A> {
    pub fn new(log: Arc<dyn StreamLog>, snapshot_every: u64) -> Self {
        Self {
            log,
            snapshot_every,
            _aggregate: PhantomData,
        }
    }

    pub fn log(&self) -> &Arc<dyn StreamLog> {
        &self.log
    }

    /// The stream's own events, without inherited history.
    pub fn own_events(&self, aggregate_id: &str) -> Result<Vec<EventEnvelope<A>>, AggregateError<A::Error>> {
        self.log
            .read(&A::stream_name(aggregate_id))
            .map_err(log_error)?
            .into_iter()
            .map(|stored| decode(aggregate_id, stored))
            .collect()
    }

    /// Number of own events in the stream.
    pub fn version(&self, aggregate_id: &str) -> Result<usize, AggregateError<A::Error>> {
        let version = self.log.version(&A::stream_name(aggregate_id)).map_err(log_error)?;
        Ok(version as usize)
    }

    /// Inherited history followed by own events, optionally cut at own
    /// sequence `up_to`.
    pub fn composed_events(
        &self,
        aggregate_id: &str,
        up_to: Option<usize>,
    ) -> Result<Vec<A::Event>, AggregateError<A::Error>> {
        let own = self.own_events(aggregate_id)?;
        let mut events = match own.first().and_then(|e| A::inherited_history(&e.payload)) {
            Some((source, version)) => self.composed_events(&source, Some(version))?,
            None => Vec::new(),
        };
        events.extend(
            own.into_iter()
                .filter(|e| match up_to {
                    Some(limit) => e.sequence <= limit,
                    None => true,
                })
                .map(|e| e.payload),
        );
        Ok(events)
    }

    /// The aggregate as of own sequence `up_to` (or the latest state).
    pub fn replay(&self, aggregate_id: &str, up_to: Option<usize>) -> Result<A, AggregateError<A::Error>> {
        let mut aggregate = A::default();
        for event in self.composed_events(aggregate_id, up_to)? {
            aggregate.apply(event);
        }
        Ok(aggregate)
    }

    /// Appends events that were already validated elsewhere, each with its own
    /// metadata, if the stream is still at `expected_version`.
    pub fn append_events(
        &self,
        aggregate_id: &str,
        expected_version: usize,
        events: Vec<(A::Event, HashMap<String, String>)>,
    ) -> Result<Vec<EventEnvelope<A>>, AggregateError<A::Error>> {
        let mut new_events = Vec::with_capacity(events.len());
        for (event, metadata) in &events {
            new_events.push(NewEvent {
                event_type: event.event_type(),
                event_version: event.event_version(),
                payload: serde_json::to_value(event).map_err(|e| AggregateError::UnexpectedError(Box::new(e)))?,
                metadata: metadata.clone(),
            });
        }
        let stored = self
            .log
            .append(&A::stream_name(aggregate_id), expected_version as u64, new_events)
            .map_err(|e| match e {
                LogError::VersionMismatch { .. } => AggregateError::AggregateConflict,
                other => log_error(other),
            })?;
        Ok(stored
            .into_iter()
            .zip(events)
            .map(|(record, (event, metadata))| EventEnvelope {
                aggregate_id: aggregate_id.to_string(),
                sequence: record.sequence as usize,
                payload: event,
                metadata,
            })
            .collect())
    }

    fn load_snapshot(&self, aggregate_id: &str) -> Result<Option<(A, u64)>, AggregateError<A::Error>> {
        let Some(snapshot) = self.log.load_snapshot(&A::stream_name(aggregate_id)).map_err(log_error)? else {
            return Ok(None);
        };
        let state: A = serde_json::from_value(snapshot.state)
            .map_err(|e| AggregateError::DeserializationError(Box::new(e)))?;
        Ok(Some((state, snapshot.sequence)))
    }
}

#[async_trait]
impl<A: StoredAggregate> EventStore<A> for LogEventStore<A> {
    type AC = LogAggregateContext<A>;

    async fn load_events(&self, aggregate_id: &str) -> Result<Vec<EventEnvelope<A>>, AggregateError<A::Error>> {
        self.own_events(aggregate_id)
    }

    async fn load_aggregate(&self, aggregate_id: &str) -> Result<Self::AC, AggregateError<A::Error>> {
        let own = self.own_events(aggregate_id)?;

        // Try to load from snapshot first
        let (mut aggregate, mut current_sequence) = match self.load_snapshot(aggregate_id)? {
            Some(snapshot) => snapshot,
            None => {
                let inherited = own.first().and_then(|e| A::inherited_history(&e.payload));
                let aggregate = match inherited {
                    Some((source, version)) => self.replay(&source, Some(version))?,
                    None => A::default(),
                };
                (aggregate, 0)
            }
        };

        // Apply events after snapshot
        for envelope in own {
            let sequence = envelope.sequence as u64;
            if sequence > current_sequence {
                current_sequence = sequence;
                aggregate.apply(envelope.payload);
            }
        }

        Ok(LogAggregateContext {
            aggregate_id: aggregate_id.to_string(),
            aggregate,
            current_sequence,
        })
    }

    async fn commit(
        &self,
        events: Vec<A::Event>,
        context: Self::AC,
        metadata: HashMap<String, String>,
    ) -> Result<Vec<EventEnvelope<A>>, AggregateError<A::Error>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let LogAggregateContext {
            aggregate_id,
            mut aggregate,
            current_sequence,
        } = context;

        let mut new_events = Vec::with_capacity(events.len());
        for event in &events {
            new_events.push(NewEvent {
                event_type: event.event_type(),
                event_version: event.event_version(),
                payload: serde_json::to_value(event).map_err(|e| AggregateError::UnexpectedError(Box::new(e)))?,
                metadata: metadata.clone(),
            });
        }

        let stream = A::stream_name(&aggregate_id);
        let stored = self
            .log
            .append(&stream, current_sequence, new_events)
            .map_err(|e| match e {
                LogError::VersionMismatch { .. } => AggregateError::AggregateConflict,
                other => log_error(other),
            })?;

        let mut envelopes = Vec::with_capacity(events.len());
        let mut last_sequence = current_sequence;
        for (record, event) in stored.into_iter().zip(events) {
            last_sequence = record.sequence;
            aggregate.apply(event.clone());
            envelopes.push(EventEnvelope {
                aggregate_id: aggregate_id.clone(),
                sequence: record.sequence as usize,
                payload: event,
                metadata: record.metadata,
            });
        }

        // Take snapshot if threshold reached
        if should_snapshot(current_sequence, last_sequence, self.snapshot_every) {
            let snapshot = StoredSnapshot {
                stream,
                sequence: last_sequence,
                snapshot_at: TimestampUtc::now(),
                state: serde_json::to_value(&aggregate).map_err(|e| AggregateError::UnexpectedError(Box::new(e)))?,
            };
            if let Err(e) = self.log.save_snapshot(&snapshot) {
                tracing::warn!("Failed to save snapshot for {}: {:?}", aggregate_id, e);
            }
        }

        Ok(envelopes)
    }
}

fn decode<A: Aggregate>(aggregate_id: &str, stored: StoredEvent) -> Result<EventEnvelope<A>, AggregateError<A::Error>> {
    let payload: A::Event =
        serde_json::from_value(stored.payload).map_err(|e| AggregateError::DeserializationError(Box::new(e)))?;
    // Validate event type and version match
    if stored.event_type != payload.event_type() || stored.event_version != payload.event_version() {
        return Err(AggregateError::UnexpectedError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "event version/type mismatch",
        ))));
    }
    Ok(EventEnvelope {
        aggregate_id: aggregate_id.to_string(),
        sequence: stored.sequence as usize,
        payload,
        metadata: stored.metadata,
    })
}

fn log_error<E: std::error::Error>(error: LogError) -> AggregateError<E> {
    match error {
        LogError::Serialization(e) => AggregateError::DeserializationError(Box::new(e)),
        other => AggregateError::UnexpectedError(Box::new(other)),
    }
}

/// Whether a commit moving from `previous` to `sequence` crossed a snapshot boundary.
fn should_snapshot(previous: u64, sequence: u64, snapshot_every: u64) -> bool {
    if snapshot_every == 0 {
        return false;
    }
    sequence / snapshot_every > previous / snapshot_every
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
