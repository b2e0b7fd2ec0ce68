//! Tests for the content stream event broadcast.

use super::*;
use crate::domain::types::ContentStreamId;
use cqrs_es::EventEnvelope;

fn envelope(sequence: usize, content_stream_id: &str) -> EventEnvelope<ContentStreamAggregate> {
    let mut metadata = HashMap::new();
    metadata.insert("initiating_user_id".to_string(), "system".to_string());
    EventEnvelope {
        aggregate_id: content_stream_id.to_string(),
        sequence,
        payload: ContentStreamEvent::ContentStreamWasCreated {
            content_stream_id: ContentStreamId::from(content_stream_id),
        },
        metadata,
    }
}

#[tokio::test]
async fn dispatch_broadcasts_every_event_with_its_stream_name() {
    let (event_tx, mut event_rx) = broadcast::channel(16);
    let query = ContentStreamQuery::new(event_tx);

    query.dispatch("cs-1", &[envelope(1, "cs-1"), envelope(2, "cs-1")]).await;

    let first = event_rx.recv().await.unwrap();
    let second = event_rx.recv().await.unwrap();
    assert_eq!(first.stream, "ContentStream-cs-1");
    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);
    assert_eq!(first.metadata.get("initiating_user_id").map(String::as_str), Some("system"));
}

#[tokio::test]
async fn dispatch_without_subscribers_is_silent() {
    let (event_tx, event_rx) = broadcast::channel(4);
    drop(event_rx);
    let query = ContentStreamQuery::new(event_tx.clone());

    query.dispatch("cs-1", &[envelope(1, "cs-1")]).await;

    let mut late = event_tx.subscribe();
    assert!(late.try_recv().is_err());
}
