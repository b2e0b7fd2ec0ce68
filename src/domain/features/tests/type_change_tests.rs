use crate::domain::cqrs::commands::{ChangeNodeAggregateName, ChangeNodeAggregateType, ContentStreamCommand};
use crate::domain::cqrs::ContentStreamEvent;
use crate::domain::errors::ContentRepositoryError;
use crate::domain::strategies::NodeAggregateTypeChangeConflictResolutionStrategy;
use crate::domain::types::{NodeAggregateId, NodeAggregateIdsByNodePaths, NodeName, NodeTypeName};
use crate::testing::{create_document, create_text, execute, id, services, stream_with_root};

fn change_type(node: &str, node_type: &str, strategy: NodeAggregateTypeChangeConflictResolutionStrategy) -> ContentStreamCommand {
    ContentStreamCommand::ChangeNodeAggregateType(ChangeNodeAggregateType {
        node_aggregate_id: id(node),
        new_node_type_name: NodeTypeName::from(node_type),
        strategy,
        tethered_descendant_node_aggregate_ids: NodeAggregateIdsByNodePaths::new(),
    })
}

fn rename(node: &str, name: &str) -> ContentStreamCommand {
    ContentStreamCommand::ChangeNodeAggregateName(ChangeNodeAggregateName {
        node_aggregate_id: id(node),
        new_node_name: NodeName::from(name),
    })
}

// ===== Type changes =====

#[tokio::test]
async fn happy_path_refuses_to_orphan_children() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();

    let result = execute(
        &mut stream,
        &services,
        change_type("doc", "Acme:Folder", NodeAggregateTypeChangeConflictResolutionStrategy::HappyPath),
    )
    .await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeConstraintViolation { .. })));
    let doc = stream.graph().unwrap().node_aggregate(&id("doc")).unwrap();
    assert_eq!(doc.node_type_name(), &NodeTypeName::from("Acme:Document"));
}

#[tokio::test]
async fn delete_strategy_removes_disallowed_children() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("text", "mul", "doc")).await.unwrap();
    let main_id = NodeAggregateId::derived(&id("doc"), "main");

    let events = execute(
        &mut stream,
        &services,
        change_type("doc", "Acme:Folder", NodeAggregateTypeChangeConflictResolutionStrategy::Delete),
    )
    .await
    .unwrap();

    assert!(matches!(
        &events[..],
        [
            ContentStreamEvent::NodeAggregateWasRemoved { node_aggregate_id, .. },
            ContentStreamEvent::NodeAggregateTypeWasChanged { .. },
        ] if node_aggregate_id == &main_id
    ));
    let graph = stream.graph().unwrap();
    assert!(graph.node_aggregate(&main_id).is_none());
    assert!(graph.node_aggregate(&id("text")).is_some());
    assert_eq!(
        graph.node_aggregate(&id("doc")).unwrap().node_type_name(),
        &NodeTypeName::from("Acme:Folder")
    );
}

#[tokio::test]
async fn new_tethered_children_are_created() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();

    execute(
        &mut stream,
        &services,
        change_type("text", "Acme:Document", NodeAggregateTypeChangeConflictResolutionStrategy::HappyPath),
    )
    .await
    .unwrap();

    let graph = stream.graph().unwrap();
    let main = graph.tethered_child(&id("text"), &NodeName::from("main")).unwrap();
    assert_eq!(main.covered_points().len(), 4);
    assert_eq!(main.node_type_name(), &NodeTypeName::from("Acme:Collection"));
}

#[tokio::test]
async fn root_type_cannot_be_changed() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let result = execute(
        &mut stream,
        &services,
        change_type("root", "Acme:Sites", NodeAggregateTypeChangeConflictResolutionStrategy::HappyPath),
    )
    .await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeAggregateIsRoot { .. })));
}

// ===== Renaming =====

#[tokio::test]
async fn rename_changes_the_node_name() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();

    execute(&mut stream, &services, rename("text", "renamed")).await.unwrap();

    let text = stream.graph().unwrap().node_aggregate(&id("text")).unwrap();
    assert_eq!(text.node_name(), Some(&NodeName::from("renamed")));
}

#[tokio::test]
async fn rename_rejects_taken_names_root_and_tethered() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("a", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("b", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    let main_id = NodeAggregateId::derived(&id("doc"), "main");

    let result = execute(&mut stream, &services, rename("b", "a")).await;
    assert!(matches!(result, Err(ContentRepositoryError::NodeNameIsAlreadyCovered { .. })));

    let result = execute(&mut stream, &services, rename("root", "other")).await;
    assert!(matches!(result, Err(ContentRepositoryError::NodeAggregateIsRoot { .. })));

    let result = execute(&mut stream, &services, rename(main_id.as_str(), "other")).await;
    assert!(matches!(result, Err(ContentRepositoryError::NodeAggregateIsTethered { .. })));
}
