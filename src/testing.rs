//! Shared fixtures for unit tests.

use crate::dimension::{ContentDimensionConfig, ContentDimensionSource, DimensionSpacePoint, OriginDimensionSpacePoint};
use crate::domain::cqrs::commands::{
    CommandContext, ContentStreamCommand, CreateNodeAggregateWithNode, CreateNodeVariant,
    CreateRootNodeAggregateWithNode, SetNodeProperties,
};
use crate::domain::cqrs::{ContentStreamAggregate, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::properties::PropertyValuesToWrite;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::{ContentStreamId, NodeAggregateId, NodeName, NodeTypeName, WorkspaceName};
use crate::node_type::NodeTypeManager;
use crate::repository::ContentRepository;
use cqrs_es::Aggregate;
use serde_json::Value;

/// `mul` generalizes `de` and `en`; `de` generalizes `gsw`.
pub const DIMENSIONS: &str = r#"
- id: language
  values:
    - value: mul
      specializations:
        - value: de
          specializations:
            - value: gsw
        - value: en
"#;

pub const NODE_TYPES: &str = r#"
'Acme:Root':
  root: true
'Acme:Sites':
  root: true
'Acme:Abstract':
  abstract: true
'Acme:Document':
  properties:
    title:
      type: string
      defaultValue: untitled
    count:
      type: integer
    hidden:
      type: boolean
  references:
    related:
      constraints:
        nodeTypes:
          'Acme:Document': true
          '*': false
        maxItems: 2
  childNodes:
    main:
      type: 'Acme:Collection'
'Acme:Collection': {}
'Acme:Text':
  properties:
    text: {}
  constraints:
    nodeTypes:
      '*': false
'Acme:Folder':
  constraints:
    nodeTypes:
      'Acme:Text': true
      '*': false
"#;

pub fn lang(value: &str) -> DimensionSpacePoint {
    DimensionSpacePoint::new([("language", value)])
}

pub fn origin(value: &str) -> OriginDimensionSpacePoint {
    OriginDimensionSpacePoint::new([("language", value)])
}

pub fn dimension_source() -> ContentDimensionSource {
    let configs: Vec<ContentDimensionConfig> = serde_yaml::from_str(DIMENSIONS).unwrap();
    ContentDimensionSource::from_configs(&configs).unwrap()
}

pub fn services() -> ContentRepositoryServices {
    ContentRepositoryServices::new(&dimension_source(), NodeTypeManager::from_yaml(NODE_TYPES).unwrap())
}

pub fn id(value: &str) -> NodeAggregateId {
    NodeAggregateId::from(value)
}

pub fn create_root(root: &str) -> ContentStreamCommand {
    ContentStreamCommand::CreateRootNodeAggregateWithNode(CreateRootNodeAggregateWithNode {
        node_aggregate_id: id(root),
        node_type_name: NodeTypeName::from("Acme:Root"),
    })
}

pub fn create_node(node: &str, node_type: &str, at: &str, parent: &str) -> CreateNodeAggregateWithNode {
    CreateNodeAggregateWithNode::new(id(node), NodeTypeName::from(node_type), origin(at), id(parent))
}

/// A named `Acme:Text` below `parent`, authored in `at`.
pub fn create_text(node: &str, at: &str, parent: &str) -> ContentStreamCommand {
    ContentStreamCommand::CreateNodeAggregateWithNode(
        create_node(node, "Acme:Text", at, parent).with_node_name(NodeName::from(node)),
    )
}

pub fn create_document(node: &str, at: &str, parent: &str) -> ContentStreamCommand {
    ContentStreamCommand::CreateNodeAggregateWithNode(create_node(node, "Acme:Document", at, parent))
}

pub fn set_property(node: &str, at: &str, name: &str, value: Value) -> ContentStreamCommand {
    ContentStreamCommand::SetNodeProperties(SetNodeProperties {
        node_aggregate_id: id(node),
        origin_dimension_space_point: origin(at),
        property_values: PropertyValuesToWrite::new().with(name, value),
    })
}

/// An in-memory repository with a `live` root workspace holding root node `root`.
pub async fn live_repository() -> (ContentRepository, ContentStreamId) {
    let repository = ContentRepository::in_memory(services());
    let live_stream = ContentStreamId::from("cs-live");
    let context = CommandContext::system();
    repository
        .create_root_workspace(&WorkspaceName::live(), "Live", &live_stream, &context)
        .await
        .unwrap();
    repository.handle(&live_stream, create_root("root"), &context).await.unwrap();
    (repository, live_stream)
}

/// Handles `command` and folds the resulting events into `aggregate`.
pub async fn execute(
    aggregate: &mut ContentStreamAggregate,
    services: &ContentRepositoryServices,
    command: ContentStreamCommand,
) -> Result<Vec<ContentStreamEvent>, ContentRepositoryError> {
    let events = aggregate.handle(command, services).await?;
    for event in events.clone() {
        aggregate.apply(event);
    }
    Ok(events)
}

/// An open content stream `cs` holding root node `root`.
pub async fn stream_with_root(services: &ContentRepositoryServices) -> ContentStreamAggregate {
    let mut aggregate = ContentStreamAggregate::default();
    let create = ContentStreamCommand::CreateContentStream {
        content_stream_id: ContentStreamId::from("cs"),
    };
    execute(&mut aggregate, services, create).await.unwrap();
    execute(&mut aggregate, services, create_root("root")).await.unwrap();
    aggregate
}

pub fn create_variant(node: &str, source: &str, target: &str) -> ContentStreamCommand {
    ContentStreamCommand::CreateNodeVariant(CreateNodeVariant {
        node_aggregate_id: id(node),
        source_origin: origin(source),
        target_origin: origin(target),
    })
}
