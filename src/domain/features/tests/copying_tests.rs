use super::*;
use crate::domain::cqrs::commands::ContentStreamCommand;
use crate::domain::cqrs::ContentStreamAggregate;
use crate::domain::errors::ContentRepositoryError;
use crate::domain::subgraph::VisibilityConstraints;
use crate::testing::{create_document, create_text, execute, id, lang, origin, services, stream_with_root};
use serde_json::json;

fn snapshot(stream: &ContentStreamAggregate, node: &str, at: &str) -> NodeSubtreeSnapshot {
    let graph = stream.graph().unwrap();
    let subgraph = graph.subgraph(lang(at), VisibilityConstraints::without_restrictions());
    NodeSubtreeSnapshot::from_subgraph(&subgraph, &id(node)).unwrap()
}

fn copy_doc(tree: NodeSubtreeSnapshot, at: &str, parent: &str) -> ContentStreamCommand {
    let main_id = NodeAggregateId::derived(&id("doc"), "main");
    ContentStreamCommand::CopyNodesRecursively(CopyNodesRecursively {
        node_tree_to_insert: tree,
        target_dimension_space_point: origin(at),
        target_parent_node_aggregate_id: id(parent),
        target_succeeding_sibling_node_aggregate_id: None,
        target_node_name: None,
        node_aggregate_id_mapping: NodeAggregateIdMapping::new()
            .with(id("doc"), id("copy"))
            .with(main_id, id("copy-main")),
    })
}

#[tokio::test]
async fn snapshot_walks_the_visible_subtree() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("text", "mul", "doc")).await.unwrap();

    let tree = snapshot(&stream, "doc", "mul");

    let walked: Vec<&NodeAggregateId> = tree.walk().into_iter().map(|n| &n.node_aggregate_id).collect();
    assert_eq!(walked.len(), 3);
    assert_eq!(walked[0], &id("doc"));
    assert_eq!(walked[2], &id("text"));
    assert_eq!(tree.child_nodes[0].classification, NodeAggregateClassification::Tethered);
}

#[tokio::test]
async fn copy_recreates_the_subtree_with_mapped_ids() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    let tree = snapshot(&stream, "doc", "mul");

    execute(&mut stream, &services, copy_doc(tree, "de", "root")).await.unwrap();

    let graph = stream.graph().unwrap();
    let copy = graph.node_aggregate(&id("copy")).unwrap();
    assert_eq!(copy.covered_points(), DimensionSpacePointSet::new([lang("de"), lang("gsw")]));
    assert_eq!(
        copy.variant(&origin("de")).unwrap().properties.value("title"),
        Some(&json!("untitled"))
    );
    let main = graph.tethered_child(&id("copy"), &NodeName::from("main")).unwrap();
    assert_eq!(main.id(), &id("copy-main"));
    assert_eq!(main.parent_in(&lang("gsw")), Some(&id("copy")));
}

#[tokio::test]
async fn copy_keeps_references_between_copied_nodes_mapped() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    let mut tree = snapshot(&stream, "doc", "mul");
    tree.references.insert(
        ReferenceName::from("related"),
        vec![NodeReference::to(id("doc"))],
    );

    execute(&mut stream, &services, copy_doc(tree, "mul", "root")).await.unwrap();

    let graph = stream.graph().unwrap();
    let variant = graph.node_aggregate(&id("copy")).unwrap().variant(&origin("mul")).unwrap();
    assert_eq!(
        variant.references[&ReferenceName::from("related")],
        vec![NodeReference::to(id("copy"))]
    );
}

#[tokio::test]
async fn copy_onto_existing_ids_is_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    let tree = snapshot(&stream, "doc", "mul");
    execute(&mut stream, &services, copy_doc(tree.clone(), "mul", "root")).await.unwrap();

    let result = execute(&mut stream, &services, copy_doc(tree, "mul", "root")).await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeAggregateCurrentlyExists { .. })));
}
