use super::*;
use crate::domain::types::TimestampUtc;
use serde_json::json;
use std::collections::HashMap;
use tempfile::tempdir;

fn new_event(n: u64) -> NewEvent {
    NewEvent {
        event_type: "Counted".to_string(),
        event_version: "1.0".to_string(),
        payload: json!({ "n": n }),
        metadata: HashMap::new(),
    }
}

#[test]
fn test_append_and_read_back() {
    let dir = tempdir().expect("temp dir");
    let log = FileStreamLog::new(dir.path().to_path_buf());

    let stored = log.append("ContentStream-cs", 0, vec![new_event(1), new_event(2)]).unwrap();
    assert_eq!(stored.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2]);

    // A fresh log over the same directory sees the same records
    let reopened = FileStreamLog::new(dir.path().to_path_buf());
    let records = reopened.read("ContentStream-cs").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].payload, json!({ "n": 2 }));
    assert_eq!(reopened.version("ContentStream-cs").unwrap(), 2);
}

#[test]
fn test_missing_stream_reads_empty() {
    let dir = tempdir().expect("temp dir");
    let log = FileStreamLog::new(dir.path().join("not-yet-created"));

    assert!(log.read("ContentStream-nothing").unwrap().is_empty());
    assert_eq!(log.version("ContentStream-nothing").unwrap(), 0);
    assert!(log.streams().unwrap().is_empty());
}

#[test]
fn test_stale_expected_version_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let log = FileStreamLog::new(dir.path().to_path_buf());
    log.append("ContentStream-cs", 0, vec![new_event(1)]).unwrap();

    let result = log.append("ContentStream-cs", 0, vec![new_event(2)]);

    assert!(matches!(
        result,
        Err(LogError::VersionMismatch { expected: 0, actual: 1, .. })
    ));
    assert_eq!(log.read("ContentStream-cs").unwrap().len(), 1);
}

#[test]
fn test_empty_append_writes_nothing() {
    let dir = tempdir().expect("temp dir");
    let log = FileStreamLog::new(dir.path().to_path_buf());

    assert!(log.append("ContentStream-cs", 7, Vec::new()).unwrap().is_empty());
    assert!(log.streams().unwrap().is_empty());
}

#[test]
fn test_stream_names_survive_file_name_encoding() {
    let dir = tempdir().expect("temp dir");
    let log = FileStreamLog::new(dir.path().to_path_buf());
    log.append("Workspace-user/jane doe", 0, vec![new_event(1)]).unwrap();
    log.append("ContentStream-cs_1", 0, vec![new_event(1)]).unwrap();

    assert_eq!(
        log.streams().unwrap(),
        vec!["ContentStream-cs_1".to_string(), "Workspace-user/jane doe".to_string()]
    );
    assert_eq!(encode_stream_name("a/b c"), "a%2Fb%20c");
    assert_eq!(decode_stream_name("a%2Fb%20c").as_deref(), Some("a/b c"));
    assert_eq!(decode_stream_name("broken%2"), None);
}

#[test]
fn test_snapshot_round_trip() {
    let dir = tempdir().expect("temp dir");
    let log = FileStreamLog::new(dir.path().to_path_buf());
    assert!(log.load_snapshot("ContentStream-cs").unwrap().is_none());

    log.save_snapshot(&StoredSnapshot {
        stream: "ContentStream-cs".to_string(),
        sequence: 50,
        snapshot_at: TimestampUtc::now(),
        state: json!({ "state": "Uninitialized" }),
    })
    .unwrap();

    let snapshot = log.load_snapshot("ContentStream-cs").unwrap().unwrap();
    assert_eq!(snapshot.sequence, 50);
    assert!(!dir.path().join("snapshots").join("ContentStream-cs.json.tmp").exists());
}
