use super::*;
use crate::domain::ContentStreamAggregate;
use crate::testing::{create_document, execute, id, lang, origin, services, set_property, stream_with_root};
use serde_json::json;

/// A stream holding document `doc` authored in `mul`.
async fn stream_with_document() -> ContentStreamAggregate {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    stream
}

fn commands_for(stream: &ContentStreamAggregate, transformation: &NodeTransformation) -> Vec<ContentStreamCommand> {
    let aggregate = stream.graph().unwrap().node_aggregate(&id("doc")).unwrap();
    let mul = origin("mul");
    let covered_points = aggregate.coverage_by_origin(&mul);
    let node = NodeVariantContext {
        node_aggregate: aggregate,
        origin: &mul,
        variant: aggregate.variant(&mul).unwrap(),
        covered_points: &covered_points,
    };
    transformation.commands(&node)
}

fn written(commands: &[ContentStreamCommand]) -> &SetSerializedNodeProperties {
    match commands {
        [ContentStreamCommand::SetSerializedNodeProperties(set)] => set,
        other => panic!("expected one property write, got {:?}", other),
    }
}

fn property(name: &str) -> PropertyName {
    PropertyName::from(name)
}

// ===== Node based =====

#[tokio::test]
async fn add_new_property_only_fills_gaps() {
    let stream = stream_with_document().await;
    let add = |name: &str| {
        NodeTransformation::AddNewProperty(AddNewPropertySettings {
            new_property_name: property(name),
            serialized_value: json!("fresh"),
            type_name: "string".to_string(),
        })
    };

    let commands = commands_for(&stream, &add("teaser"));

    assert_eq!(
        written(&commands).property_values.get(&property("teaser")),
        Some(&SerializedPropertyValue::new(json!("fresh"), "string"))
    );
    assert!(commands_for(&stream, &add("title")).is_empty());
}

#[tokio::test]
async fn change_property_value_substitutes_the_current_value() {
    let stream = stream_with_document().await;
    let change = |new_value: &str, search: &str, replace: &str| {
        NodeTransformation::ChangePropertyValue(ChangePropertyValueSettings {
            property: property("title"),
            new_serialized_value: new_value.to_string(),
            search: search.to_string(),
            replace: replace.to_string(),
            current_value_placeholder: "{current}".to_string(),
        })
    };

    let appended = commands_for(&stream, &change("{current} draft", "", ""));
    let replaced = commands_for(&stream, &change("{current}", "untitled", "fresh"));
    let unchanged = commands_for(&stream, &change("{current}", "", ""));

    assert_eq!(written(&appended).property_values.value("title"), Some(&json!("untitled draft")));
    assert_eq!(written(&replaced).property_values.value("title"), Some(&json!("fresh")));
    assert!(unchanged.is_empty());
}

#[tokio::test]
async fn remove_and_rename_property_unset_the_old_name() {
    let stream = stream_with_document().await;

    let removed = commands_for(&stream, &NodeTransformation::RemoveProperty(PropertySettings { property: property("title") }));
    let renamed = commands_for(
        &stream,
        &NodeTransformation::RenameProperty(RenamePropertySettings {
            from: property("title"),
            to: property("headline"),
        }),
    );
    let absent = commands_for(&stream, &NodeTransformation::RemoveProperty(PropertySettings { property: property("teaser") }));

    assert_eq!(written(&removed).properties_to_unset, vec![property("title")]);
    assert!(written(&removed).property_values.is_empty());
    assert_eq!(written(&renamed).property_values.value("headline"), Some(&json!("untitled")));
    assert_eq!(written(&renamed).properties_to_unset, vec![property("title")]);
    assert!(absent.is_empty());
}

#[tokio::test]
async fn strip_tags_leaves_plain_text() {
    let services = services();
    let mut stream = stream_with_document().await;
    execute(&mut stream, &services, set_property("doc", "mul", "title", json!("<p>Hello <b>world</b></p>")))
        .await
        .unwrap();
    let strip = NodeTransformation::StripTagsOnProperty(PropertySettings { property: property("title") });

    let commands = commands_for(&stream, &strip);

    assert_eq!(written(&commands).property_values.value("title"), Some(&json!("Hello world")));
    assert_eq!(strip_tags("no tags"), "no tags");
}

#[tokio::test]
async fn remove_node_targets_covered_points_only() {
    let stream = stream_with_document().await;
    let remove = |at: Option<&str>| {
        NodeTransformation::RemoveNode(RemoveNodeSettings {
            strategy: NodeVariantSelectionStrategy::VirtualSpecializations,
            overridden_dimension_space_point: at.map(lang),
        })
    };

    let at_origin = commands_for(&stream, &remove(None));
    let overridden = commands_for(&stream, &remove(Some("de")));
    let elsewhere = commands_for(&stream, &remove(Some("fr")));

    assert!(matches!(
        &at_origin[..],
        [ContentStreamCommand::RemoveNodeAggregate(r)] if r.covered_dimension_space_point == lang("mul")
    ));
    assert!(matches!(
        &overridden[..],
        [ContentStreamCommand::RemoveNodeAggregate(r)] if r.covered_dimension_space_point == lang("de")
    ));
    assert!(elsewhere.is_empty());
}

// ===== Node aggregate based =====

#[tokio::test]
async fn aggregate_transformations_skip_what_already_holds() {
    let stream = stream_with_document().await;
    let graph = stream.graph().unwrap();
    let doc = graph.node_aggregate(&id("doc")).unwrap();
    let root = graph.node_aggregate(&id("root")).unwrap();

    let same_type = NodeAggregateTransformation::ChangeNodeType(ChangeNodeTypeSettings {
        new_type: NodeTypeName::from("Acme:Document"),
        force_delete_non_matching_child_nodes: false,
    });
    let forced = NodeAggregateTransformation::ChangeNodeType(ChangeNodeTypeSettings {
        new_type: NodeTypeName::from("Acme:Folder"),
        force_delete_non_matching_child_nodes: true,
    });
    let update_root = NodeAggregateTransformation::UpdateRootNodeAggregateDimensions;

    assert!(same_type.commands(doc).is_empty());
    assert!(matches!(
        &forced.commands(doc)[..],
        [ContentStreamCommand::ChangeNodeAggregateType(c)]
            if c.strategy == NodeAggregateTypeChangeConflictResolutionStrategy::Delete
    ));
    assert!(update_root.commands(doc).is_empty());
    assert_eq!(update_root.commands(root).len(), 1);
}

#[test]
fn global_transformations_emit_one_adjustment() {
    let settings = DimensionSpacePointAdjustmentSettings {
        from: lang("gsw"),
        to: lang("ch"),
    };

    let commands = GlobalTransformation::AddDimensionShineThrough(settings).commands();

    assert_eq!(
        commands,
        vec![ContentStreamCommand::AddDimensionShineThrough(DimensionAdjustment {
            source: lang("gsw"),
            target: lang("ch"),
        })]
    );
}

#[test]
fn remove_node_settings_validate_the_strategy() {
    let only_given = RemoveNodeSettings {
        strategy: NodeVariantSelectionStrategy::OnlyGivenVariant,
        overridden_dimension_space_point: None,
    };
    let all = RemoveNodeSettings {
        strategy: NodeVariantSelectionStrategy::AllVariants,
        overridden_dimension_space_point: None,
    };

    assert!(only_given.validate().is_ok());
    assert!(matches!(all.validate(), Err(ContentRepositoryError::UnsupportedStrategy { .. })));
}
