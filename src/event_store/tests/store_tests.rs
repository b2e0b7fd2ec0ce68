use super::*;
use crate::domain::cqrs::commands::ContentStreamCommand;
use crate::domain::types::ContentStreamId;
use crate::domain::{ContentStreamAggregate, ContentStreamEvent};
use crate::event_store::{FileStreamLog, MemoryStreamLog};
use crate::testing::{create_root, create_text, id, services};
use tempfile::tempdir;

type Store = LogEventStore<ContentStreamAggregate>;

fn memory_store(snapshot_every: u64) -> Store {
    LogEventStore::new(Arc::new(MemoryStreamLog::new()), snapshot_every)
}

/// Loads, handles and commits one command, like the repository does.
async fn run(store: &Store, stream: &str, command: ContentStreamCommand) {
    let context = store.load_aggregate(stream).await.unwrap();
    let events = context.aggregate.handle(command, &services()).await.unwrap();
    store.commit(events, context, HashMap::new()).await.unwrap();
}

async fn live_with_root(store: &Store) {
    run(
        store,
        "live",
        ContentStreamCommand::CreateContentStream {
            content_stream_id: ContentStreamId::from("live"),
        },
    )
    .await;
    run(store, "live", create_root("root")).await;
}

fn fork(version: usize) -> ContentStreamCommand {
    ContentStreamCommand::ForkContentStream {
        content_stream_id: ContentStreamId::from("user"),
        source_content_stream_id: ContentStreamId::from("live"),
        version_of_source_content_stream: version,
    }
}

#[test]
fn test_stream_name_prefixes_the_aggregate_type() {
    assert_eq!(ContentStreamAggregate::stream_name("cs-1"), "ContentStream-cs-1");
}

#[test]
fn test_should_snapshot() {
    assert!(!should_snapshot(48, 49, 50));
    assert!(should_snapshot(49, 50, 50));
    assert!(should_snapshot(48, 52, 50));
    assert!(!should_snapshot(50, 51, 50));
    assert!(!should_snapshot(0, 500, 0)); // Disabled
}

#[tokio::test]
async fn test_commit_and_reload() {
    let store = memory_store(0);
    live_with_root(&store).await;

    let context = store.load_aggregate("live").await.unwrap();

    assert_eq!(context.current_sequence, 2);
    assert!(context.aggregate.graph().unwrap().node_aggregate(&id("root")).is_some());
    assert_eq!(store.version("live").unwrap(), 2);
}

#[tokio::test]
async fn test_fork_inherits_history_up_to_the_fork_version() {
    let store = memory_store(0);
    live_with_root(&store).await;
    run(&store, "user", fork(2)).await;
    run(&store, "live", create_text("late", "mul", "root")).await;
    run(&store, "user", create_text("mine", "mul", "root")).await;

    let user = store.load_aggregate("user").await.unwrap();
    let graph = user.aggregate.graph().unwrap();

    // fork plus one creation event per covered point
    assert_eq!(user.current_sequence, 5);
    assert!(graph.node_aggregate(&id("root")).is_some());
    assert!(graph.node_aggregate(&id("mine")).is_some());
    assert!(graph.node_aggregate(&id("late")).is_none());
    assert_eq!(user.aggregate.data().unwrap().id(), &ContentStreamId::from("user"));

    let own = store.own_events("user").unwrap();
    assert_eq!(own.len(), 5);
    assert!(matches!(own[0].payload, ContentStreamEvent::ContentStreamWasForked { .. }));
    assert_eq!(store.composed_events("user", None).unwrap().len(), 7);
}

#[tokio::test]
async fn test_replay_stops_at_the_requested_sequence() {
    let store = memory_store(0);
    live_with_root(&store).await;

    let before_root = store.replay("live", Some(1)).unwrap();

    assert!(before_root.exists());
    assert!(before_root.graph().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_context_conflicts() {
    let store = memory_store(0);
    live_with_root(&store).await;
    let stale = store.load_aggregate("live").await.unwrap();
    run(&store, "live", create_text("first", "mul", "root")).await;

    let events = stale.aggregate.handle(create_text("second", "mul", "root"), &services()).await.unwrap();
    let result = store.commit(events, stale, HashMap::new()).await;

    assert!(matches!(result, Err(AggregateError::AggregateConflict)));
}

#[tokio::test]
async fn test_append_events_checks_the_expected_version() {
    let store = memory_store(0);
    live_with_root(&store).await;
    let event = ContentStreamEvent::ContentStreamWasClosed {
        content_stream_id: ContentStreamId::from("live"),
    };

    let stale = store.append_events("live", 1, vec![(event.clone(), HashMap::new())]);
    let current = store.append_events("live", 2, vec![(event, HashMap::new())]).unwrap();

    assert!(matches!(stale, Err(AggregateError::AggregateConflict)));
    assert_eq!(current[0].sequence, 3);
}

#[tokio::test]
async fn test_snapshot_is_used_on_load() {
    let dir = tempdir().expect("temp dir");
    let store: Store = LogEventStore::new(Arc::new(FileStreamLog::new(dir.path().to_path_buf())), 2);
    live_with_root(&store).await;

    let snapshot = store.log().load_snapshot("ContentStream-live").unwrap().unwrap();
    assert_eq!(snapshot.sequence, 2);

    run(&store, "live", create_text("text", "mul", "root")).await;
    let reopened: Store = LogEventStore::new(Arc::new(FileStreamLog::new(dir.path().to_path_buf())), 2);
    let context = reopened.load_aggregate("live").await.unwrap();

    let snapshot = reopened.log().load_snapshot("ContentStream-live").unwrap().unwrap();
    assert_eq!(snapshot.sequence, 6);
    assert_eq!(context.current_sequence, 6);
    assert!(context.aggregate.graph().unwrap().node_aggregate(&id("text")).is_some());
}
