use crate::domain::cqrs::commands::{ContentStreamCommand, SetNodeReferences};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::properties::NodeReference;
use crate::domain::types::ReferenceName;
use crate::testing::{create_document, create_text, execute, id, origin, services, stream_with_root};

fn set_related(source: &str, targets: &[&str]) -> ContentStreamCommand {
    set_references(source, "related", targets)
}

fn set_references(source: &str, name: &str, targets: &[&str]) -> ContentStreamCommand {
    ContentStreamCommand::SetNodeReferences(SetNodeReferences {
        source_node_aggregate_id: id(source),
        source_origin_dimension_space_point: origin("mul"),
        reference_name: ReferenceName::from(name),
        references: targets.iter().map(|t| NodeReference::to(id(t))).collect(),
    })
}

#[tokio::test]
async fn references_replace_the_previous_set() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    for doc in ["source", "first", "second"] {
        execute(&mut stream, &services, create_document(doc, "mul", "root")).await.unwrap();
    }

    execute(&mut stream, &services, set_related("source", &["first", "second"])).await.unwrap();
    execute(&mut stream, &services, set_related("source", &["second"])).await.unwrap();

    let graph = stream.graph().unwrap();
    let variant = graph.node_aggregate(&id("source")).unwrap().variant(&origin("mul")).unwrap();
    let related = &variant.references[&ReferenceName::from("related")];
    assert_eq!(related, &vec![NodeReference::to(id("second"))]);
}

#[tokio::test]
async fn empty_reference_list_clears_the_reference() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("source", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_document("target", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, set_related("source", &["target"])).await.unwrap();

    execute(&mut stream, &services, set_related("source", &[])).await.unwrap();

    let graph = stream.graph().unwrap();
    let variant = graph.node_aggregate(&id("source")).unwrap().variant(&origin("mul")).unwrap();
    assert!(variant.references.is_empty());
}

#[tokio::test]
async fn reference_constraints_are_enforced() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    for doc in ["source", "a", "b", "c"] {
        execute(&mut stream, &services, create_document(doc, "mul", "root")).await.unwrap();
    }
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();

    let too_many = execute(&mut stream, &services, set_related("source", &["a", "b", "c"])).await;
    let wrong_type = execute(&mut stream, &services, set_related("source", &["text"])).await;
    let undeclared = execute(&mut stream, &services, set_references("source", "unknown", &["a"])).await;
    let missing_target = execute(&mut stream, &services, set_related("source", &["nowhere"])).await;

    assert!(matches!(too_many, Err(ContentRepositoryError::ReferenceCannotBeSet { .. })));
    assert!(matches!(wrong_type, Err(ContentRepositoryError::ReferenceCannotBeSet { .. })));
    assert!(matches!(undeclared, Err(ContentRepositoryError::ReferenceCannotBeSet { .. })));
    assert!(matches!(
        missing_target,
        Err(ContentRepositoryError::NodeAggregateCurrentlyDoesNotExist { .. })
    ));
}
