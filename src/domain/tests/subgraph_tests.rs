use super::*;
use crate::dimension::{ContentDimensionConfig, ContentDimensionSource, DimensionSpacePointSet};
use crate::domain::cqrs::commands::{ContentStreamCommand, ToggleNodeAggregate};
use crate::domain::services::ContentRepositoryServices;
use crate::domain::strategies::NodeVariantSelectionStrategy;
use crate::node_type::NodeTypeManager;
use crate::testing::{
    create_document, create_text, create_variant, execute, id, lang, origin, services, set_property, stream_with_root,
    NODE_TYPES,
};
use serde_json::json;

fn ids(nodes: &[Node]) -> Vec<NodeAggregateId> {
    nodes.iter().map(|n| n.node_aggregate_id.clone()).collect()
}

fn disable(node: &str, at: &str) -> ContentStreamCommand {
    ContentStreamCommand::DisableNodeAggregate(ToggleNodeAggregate {
        node_aggregate_id: id(node),
        covered_dimension_space_point: lang(at),
        node_variant_selection_strategy: NodeVariantSelectionStrategy::AllVariants,
    })
}

fn enable(node: &str, at: &str) -> ContentStreamCommand {
    ContentStreamCommand::EnableNodeAggregate(ToggleNodeAggregate {
        node_aggregate_id: id(node),
        covered_dimension_space_point: lang(at),
        node_variant_selection_strategy: NodeVariantSelectionStrategy::AllVariants,
    })
}

#[tokio::test]
async fn nodes_show_the_variant_covering_the_point() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_variant("text", "mul", "de")).await.unwrap();
    execute(&mut stream, &services, set_property("text", "de", "text", json!("Hallo"))).await.unwrap();
    let graph = stream.graph().unwrap();

    let swiss = graph.subgraph(lang("gsw"), VisibilityConstraints::frontend());
    let english = graph.subgraph(lang("en"), VisibilityConstraints::frontend());

    let node = swiss.find_node_by_id(&id("text")).unwrap();
    assert_eq!(node.origin_dimension_space_point, origin("de"));
    assert_eq!(node.dimension_space_point, lang("gsw"));
    assert_eq!(node.properties.value("text"), Some(&json!("Hallo")));
    assert_eq!(english.find_node_by_id(&id("text")).unwrap().properties.value("text"), None);
}

#[tokio::test]
async fn uncovered_nodes_are_absent() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "de", "root")).await.unwrap();
    let graph = stream.graph().unwrap();

    let subgraph = graph.subgraph(lang("en"), VisibilityConstraints::frontend());

    assert!(subgraph.find_node_by_id(&id("text")).is_none());
    assert!(subgraph.find_child_nodes(&id("root")).is_empty());
    assert_eq!(ids(&subgraph.find_root_nodes()), vec![id("root")]);
}

#[tokio::test]
async fn disabled_nodes_hide_their_subtree_from_the_frontend() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("text", "mul", "doc")).await.unwrap();
    execute(&mut stream, &services, disable("doc", "mul")).await.unwrap();
    let graph = stream.graph().unwrap();

    let frontend = graph.subgraph(lang("de"), VisibilityConstraints::frontend());
    let backend = graph.subgraph(lang("de"), VisibilityConstraints::without_restrictions());

    assert!(frontend.find_node_by_id(&id("doc")).is_none());
    assert!(frontend.find_node_by_id(&id("text")).is_none());
    assert!(frontend.find_child_nodes(&id("root")).is_empty());

    let doc = backend.find_node_by_id(&id("doc")).unwrap();
    assert!(doc.disabled);
    assert!(backend.find_node_by_id(&id("text")).is_some_and(|n| !n.disabled));
}

#[tokio::test]
async fn siblings_follow_the_child_order() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    for node in ["a", "b", "c"] {
        execute(&mut stream, &services, create_text(node, "mul", "root")).await.unwrap();
    }
    let graph = stream.graph().unwrap();

    let subgraph = graph.subgraph(lang("mul"), VisibilityConstraints::frontend());

    assert_eq!(ids(&subgraph.find_preceding_siblings(&id("c"))), vec![id("b"), id("a")]);
    assert_eq!(ids(&subgraph.find_succeeding_siblings(&id("a"))), vec![id("b"), id("c")]);
    assert!(subgraph.find_succeeding_siblings(&id("c")).is_empty());
    assert_eq!(
        subgraph
            .find_child_node_by_name(&id("root"), &NodeName::from("b"))
            .map(|n| n.node_aggregate_id),
        Some(id("b"))
    );
}

#[tokio::test]
async fn descendants_and_parents_are_resolved_per_point() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("text", "mul", "doc")).await.unwrap();
    let main_id = NodeAggregateId::derived(&id("doc"), "main");
    let graph = stream.graph().unwrap();

    let subgraph = graph.subgraph(lang("en"), VisibilityConstraints::frontend());

    assert_eq!(
        ids(&subgraph.find_descendant_nodes(&id("root"))),
        vec![id("doc"), main_id, id("text")]
    );
    assert_eq!(
        subgraph.find_parent_node(&id("text")).map(|n| n.node_aggregate_id),
        Some(id("doc"))
    );
    assert!(subgraph.find_parent_node(&id("root")).is_none());
}

#[tokio::test]
async fn enabling_a_disabled_node_restores_its_subtree_unchanged() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("text", "mul", "doc")).await.unwrap();
    execute(&mut stream, &services, set_property("text", "mul", "text", json!("Hello"))).await.unwrap();

    execute(&mut stream, &services, disable("doc", "mul")).await.unwrap();
    execute(&mut stream, &services, enable("doc", "mul")).await.unwrap();

    let graph = stream.graph().unwrap();
    let frontend = graph.subgraph(lang("gsw"), VisibilityConstraints::frontend());
    assert!(frontend.find_node_by_id(&id("doc")).is_some_and(|n| !n.disabled));
    let text = frontend.find_node_by_id(&id("text")).unwrap();
    assert_eq!(text.properties.value("text"), Some(&json!("Hello")));
    assert_eq!(ids(&frontend.find_child_nodes(&id("root"))), vec![id("doc")]);
    assert!(graph.node_aggregate(&id("doc")).unwrap().disabled_points().is_empty());
}

const REGIONAL_ENGLISH: &str = r#"
- id: language
  values:
    - value: mul
      specializations:
        - value: en_US
          specializations:
            - value: en_GB
"#;

#[tokio::test]
async fn disabling_only_the_specialized_point_keeps_the_origin_visible() {
    let configs: Vec<ContentDimensionConfig> = serde_yaml::from_str(REGIONAL_ENGLISH).unwrap();
    let services = ContentRepositoryServices::new(
        &ContentDimensionSource::from_configs(&configs).unwrap(),
        NodeTypeManager::from_yaml(NODE_TYPES).unwrap(),
    );
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "en_US", "root")).await.unwrap();
    let covered = stream.graph().unwrap().node_aggregate(&id("text")).unwrap().covered_points();
    assert_eq!(covered, DimensionSpacePointSet::new([lang("en_US"), lang("en_GB")]));

    let only_british = ContentStreamCommand::DisableNodeAggregate(ToggleNodeAggregate {
        node_aggregate_id: id("text"),
        covered_dimension_space_point: lang("en_GB"),
        node_variant_selection_strategy: NodeVariantSelectionStrategy::OnlyGivenVariant,
    });
    execute(&mut stream, &services, only_british).await.unwrap();

    let graph = stream.graph().unwrap();
    let american = graph.subgraph(lang("en_US"), VisibilityConstraints::frontend());
    let british = graph.subgraph(lang("en_GB"), VisibilityConstraints::frontend());
    assert!(american.find_node_by_id(&id("text")).is_some());
    assert!(british.find_node_by_id(&id("text")).is_none());
    assert!(graph.subgraph(lang("mul"), VisibilityConstraints::frontend()).find_node_by_id(&id("text")).is_none());
}
