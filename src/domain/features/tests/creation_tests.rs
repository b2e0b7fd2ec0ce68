use crate::dimension::DimensionSpacePointSet;
use crate::domain::cqrs::commands::{ContentStreamCommand, CreateRootNodeAggregateWithNode};
use crate::domain::cqrs::ContentStreamEvent;
use crate::domain::errors::ContentRepositoryError;
use crate::domain::properties::PropertyValuesToWrite;
use crate::domain::types::{NodeAggregateId, NodeAggregateIdsByNodePaths, NodeName, NodeTypeName, PropertyName};
use crate::testing::{create_document, create_node, create_text, execute, id, lang, origin, services, stream_with_root};
use serde_json::json;

fn created_points(events: &[ContentStreamEvent], node: &NodeAggregateId) -> DimensionSpacePointSet {
    events
        .iter()
        .filter_map(|e| match e {
            ContentStreamEvent::NodeAggregateWithNodeWasCreated {
                node_aggregate_id,
                covered_dimension_space_point,
                ..
            } if node_aggregate_id == node => Some(covered_dimension_space_point.clone()),
            _ => None,
        })
        .collect()
}

// ===== Root node aggregates =====

#[tokio::test]
async fn root_covers_the_whole_allowed_subspace() {
    let services = services();
    let stream = stream_with_root(&services).await;
    let graph = stream.graph().unwrap();

    let root = graph.node_aggregate(&id("root")).unwrap();
    assert!(root.is_root());
    assert_eq!(root.covered_points(), services.variation_graph.allowed_subspace());
    assert_eq!(root.covered_points().len(), 4);
    assert_eq!(root.parent_in(&lang("de")), None);
}

#[tokio::test]
async fn second_root_of_the_same_type_is_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let result = execute(&mut stream, &services, crate::testing::create_root("another")).await;

    assert!(matches!(
        result,
        Err(ContentRepositoryError::NodeAggregateCurrentlyExists { node_aggregate_id }) if node_aggregate_id == id("root")
    ));
}

#[tokio::test]
async fn roots_of_different_types_coexist() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let command = ContentStreamCommand::CreateRootNodeAggregateWithNode(CreateRootNodeAggregateWithNode {
        node_aggregate_id: id("sites"),
        node_type_name: NodeTypeName::from("Acme:Sites"),
    });
    execute(&mut stream, &services, command).await.unwrap();

    assert_eq!(stream.graph().unwrap().root_node_aggregates().count(), 2);
}

#[tokio::test]
async fn root_requires_a_root_type() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let command = ContentStreamCommand::CreateRootNodeAggregateWithNode(CreateRootNodeAggregateWithNode {
        node_aggregate_id: id("fake-root"),
        node_type_name: NodeTypeName::from("Acme:Document"),
    });
    let result = execute(&mut stream, &services, command).await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeTypeIsNotOfTypeRoot { .. })));
}

// ===== Regular node aggregates =====

#[tokio::test]
async fn creation_emits_one_event_per_covered_specialization() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let events = execute(&mut stream, &services, create_text("text", "de", "root")).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(
        created_points(&events, &id("text")),
        DimensionSpacePointSet::new([lang("de"), lang("gsw")])
    );
    let text = stream.graph().unwrap().node_aggregate(&id("text")).unwrap();
    assert!(text.occupies(&origin("de")));
    assert!(!text.covers(&lang("en")));
}

#[tokio::test]
async fn tethered_children_are_created_with_derived_ids() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let events = execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();

    let main_id = NodeAggregateId::derived(&id("doc"), "main");
    assert_eq!(created_points(&events, &id("doc")).len(), 4);
    assert_eq!(created_points(&events, &main_id).len(), 4);

    let graph = stream.graph().unwrap();
    let main = graph.tethered_child(&id("doc"), &NodeName::from("main")).unwrap();
    assert_eq!(main.id(), &main_id);
    assert!(main.is_tethered());
    assert_eq!(main.parent_in(&lang("gsw")), Some(&id("doc")));
}

#[tokio::test]
async fn tethered_ids_can_be_given_explicitly() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let command = ContentStreamCommand::CreateNodeAggregateWithNode(
        create_node("doc", "Acme:Document", "mul", "root")
            .with_tethered_descendant_ids(NodeAggregateIdsByNodePaths::new().with("main", id("doc-main"))),
    );
    execute(&mut stream, &services, command).await.unwrap();

    let main = stream.graph().unwrap().node_aggregate(&id("doc-main")).unwrap();
    assert_eq!(main.node_name(), Some(&NodeName::from("main")));
}

#[tokio::test]
async fn default_and_initial_property_values_are_merged() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let command = ContentStreamCommand::CreateNodeAggregateWithNode(
        create_node("doc", "Acme:Document", "mul", "root")
            .with_initial_property_values(PropertyValuesToWrite::new().with("count", json!(3))),
    );
    execute(&mut stream, &services, command).await.unwrap();

    let variant = stream.graph().unwrap().node_aggregate(&id("doc")).unwrap().variant(&origin("mul")).unwrap();
    assert_eq!(variant.properties.value("title"), Some(&json!("untitled")));
    assert_eq!(variant.properties.value("count"), Some(&json!(3)));
    assert_eq!(
        variant.properties.get(&PropertyName::from("count")).map(|v| v.type_name.as_str()),
        Some("integer")
    );
}

#[tokio::test]
async fn succeeding_sibling_controls_the_position() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("a", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("b", "mul", "root")).await.unwrap();

    let command = ContentStreamCommand::CreateNodeAggregateWithNode(
        create_node("c", "Acme:Text", "mul", "root").with_succeeding_sibling(id("b")),
    );
    execute(&mut stream, &services, command).await.unwrap();

    let order: Vec<NodeAggregateId> = stream
        .graph()
        .unwrap()
        .children_in(&id("root"), &lang("gsw"))
        .iter()
        .map(|a| a.id().clone())
        .collect();
    assert_eq!(order, vec![id("a"), id("c"), id("b")]);
}

// ===== Rejections =====

#[tokio::test]
async fn unknown_dimension_space_point_is_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let result = execute(&mut stream, &services, create_text("text", "fr", "root")).await;

    assert!(matches!(result, Err(ContentRepositoryError::DimensionSpacePointNotFound { .. })));
}

#[tokio::test]
async fn abstract_root_and_unknown_types_are_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    let create = |node_type: &str| {
        ContentStreamCommand::CreateNodeAggregateWithNode(create_node("node", node_type, "mul", "root"))
    };

    let result = execute(&mut stream, &services, create("Acme:Abstract")).await;
    assert!(matches!(result, Err(ContentRepositoryError::NodeTypeIsAbstract { .. })));

    let result = execute(&mut stream, &services, create("Acme:Sites")).await;
    assert!(matches!(result, Err(ContentRepositoryError::NodeTypeIsOfTypeRoot { .. })));

    let result = execute(&mut stream, &services, create("Acme:Missing")).await;
    assert!(matches!(result, Err(ContentRepositoryError::NodeTypeNotFound { .. })));
}

#[tokio::test]
async fn existing_aggregate_id_is_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();

    let result = execute(&mut stream, &services, create_document("text", "mul", "root")).await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeAggregateCurrentlyExists { .. })));
}

#[tokio::test]
async fn missing_parent_is_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let result = execute(&mut stream, &services, create_text("text", "mul", "nowhere")).await;

    assert!(matches!(
        result,
        Err(ContentRepositoryError::NodeAggregateCurrentlyDoesNotExist { node_aggregate_id }) if node_aggregate_id == id("nowhere")
    ));
}

#[tokio::test]
async fn parent_type_constraints_apply() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();

    let result = execute(&mut stream, &services, create_text("nested", "mul", "text")).await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeConstraintViolation { .. })));
}

#[tokio::test]
async fn parent_must_cover_the_origin() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "de", "root")).await.unwrap();

    let result = execute(&mut stream, &services, create_text("text", "en", "doc")).await;

    assert!(matches!(
        result,
        Err(ContentRepositoryError::NodeAggregateDoesCurrentlyNotCoverDimensionSpacePoint { .. })
    ));
}

#[tokio::test]
async fn node_names_are_unique_below_a_parent() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    let named = |node: &str| {
        ContentStreamCommand::CreateNodeAggregateWithNode(
            create_node(node, "Acme:Text", "mul", "root").with_node_name(NodeName::from("shared")),
        )
    };
    execute(&mut stream, &services, named("first")).await.unwrap();

    let result = execute(&mut stream, &services, named("second")).await;

    assert!(matches!(result, Err(ContentRepositoryError::NodeNameIsAlreadyCovered { .. })));
}

#[tokio::test]
async fn tethered_names_are_reserved_for_their_type() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();

    let command = ContentStreamCommand::CreateNodeAggregateWithNode(
        create_node("impostor", "Acme:Text", "mul", "doc").with_node_name(NodeName::from("main")),
    );
    let result = execute(&mut stream, &services, command).await;

    assert!(result.is_err());
    assert!(stream.graph().unwrap().node_aggregate(&id("impostor")).is_none());
}

#[tokio::test]
async fn invalid_initial_property_type_is_rejected() {
    let services = services();
    let mut stream = stream_with_root(&services).await;

    let command = ContentStreamCommand::CreateNodeAggregateWithNode(
        create_node("doc", "Acme:Document", "mul", "root")
            .with_initial_property_values(PropertyValuesToWrite::new().with("count", json!("three"))),
    );
    let result = execute(&mut stream, &services, command).await;

    assert!(matches!(result, Err(ContentRepositoryError::PropertyCannotBeSet { .. })));
}
