//! CQRS query handlers for content stream events.
//!
//! `ContentStreamQuery` broadcasts every committed event to subscribers via a
//! tokio channel. Projections outside this crate consume the channel.

use super::{ContentStreamAggregate, ContentStreamEvent};
use crate::event_store::StoredAggregate;
use async_trait::async_trait;
use cqrs_es::{EventEnvelope, Query};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

/// A committed event as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStreamEventEnvelope {
    /// Stream name, e.g. `ContentStream-<id>`.
    pub stream: String,
    pub sequence: usize,
    pub event: ContentStreamEvent,
    pub metadata: HashMap<String, String>,
}

impl From<(&str, &EventEnvelope<ContentStreamAggregate>)> for ContentStreamEventEnvelope {
    fn from((stream, envelope): (&str, &EventEnvelope<ContentStreamAggregate>)) -> Self {
        Self {
            stream: stream.to_string(),
            sequence: envelope.sequence,
            event: envelope.payload.clone(),
            metadata: envelope.metadata.clone(),
        }
    }
}

pub struct ContentStreamQuery {
    pub event_tx: broadcast::Sender<ContentStreamEventEnvelope>,
}

impl ContentStreamQuery {
    pub fn new(event_tx: broadcast::Sender<ContentStreamEventEnvelope>) -> Self {
        Self { event_tx }
    }
}

#[async_trait]
impl Query<ContentStreamAggregate> for ContentStreamQuery {
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<ContentStreamAggregate>]) {
        let stream = ContentStreamAggregate::stream_name(aggregate_id);
        for event in events {
            // No receivers is fine; projections may subscribe later.
            if self.event_tx.receiver_count() == 0 {
                continue;
            }
            if let Err(e) = self.event_tx.send(ContentStreamEventEnvelope::from((stream.as_str(), event))) {
                tracing::warn!("Failed to broadcast event: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod tests;
