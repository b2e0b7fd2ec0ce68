use super::*;
use crate::domain::ContentRepositoryError;
use crate::testing::{create_document, create_text, id, live_repository, origin, services, stream_with_root, execute};
use serde_json::json;

fn step(yaml: &str) -> Result<MigrationStep, ContentRepositoryError> {
    let config: MigrationStepConfiguration = serde_yaml::from_str(yaml).unwrap();
    MigrationStep::from_configuration(&config)
}

const RETITLE: &str = r#"
comments: Retitles documents
migration:
  - filters:
      - type: NodeType
        settings:
          nodeType: 'Acme:Document'
    transformations:
      - type: ChangePropertyValue
        settings:
          property: title
          newSerializedValue: '{current} (migrated)'
"#;

// ===== Step validation =====

#[test]
fn test_step_needs_a_transformation() {
    let result = step("transformations: []");

    assert!(matches!(result, Err(ContentRepositoryError::InvalidConfiguration { .. })));
}

#[test]
fn test_step_rejects_mixed_shapes() {
    let result = step(
        "transformations:\n  - type: UpdateRootNodeAggregateDimensions\n  - type: RemoveProperty\n    settings:\n      property: title\n",
    );

    assert!(matches!(
        result,
        Err(ContentRepositoryError::InvalidConfiguration { message }) if message.contains("cannot be mixed")
    ));
}

#[test]
fn test_aggregate_steps_only_take_aggregate_filters() {
    let result = step(
        "filters:\n  - type: PropertyNotEmpty\n    settings:\n      propertyName: title\ntransformations:\n  - type: UpdateRootNodeAggregateDimensions\n",
    );

    assert!(matches!(result, Err(ContentRepositoryError::InvalidConfiguration { .. })));
}

#[test]
fn test_migration_errors_name_the_step() {
    let config = MigrationConfiguration::from_yaml("migration:\n  - transformations: []\n").unwrap();

    let result = Migration::from_configuration("Version1", &config);

    assert!(matches!(
        result,
        Err(ContentRepositoryError::InvalidConfiguration { message }) if message.starts_with("migration Version1 step 1")
    ));
}

// ===== Command derivation =====

#[tokio::test]
async fn test_filters_select_the_transformed_content() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    execute(&mut stream, &services, create_text("text", "mul", "root")).await.unwrap();
    let migration = Migration::from_configuration("Retitle", &MigrationConfiguration::from_yaml(RETITLE).unwrap()).unwrap();

    let commands = migration.steps[0].commands(stream.graph().unwrap(), &services);

    assert_eq!(commands.len(), 1);
    assert!(commands[0].matches_node(&id("doc"), None));
}

#[tokio::test]
async fn test_variant_filters_restrict_node_based_steps() {
    let services = services();
    let mut stream = stream_with_root(&services).await;
    execute(&mut stream, &services, create_document("doc", "mul", "root")).await.unwrap();
    let only_de = step(
        "filters:\n  - type: DimensionSpacePoints\n    settings:\n      points: [{language: de}]\ntransformations:\n  - type: RemoveProperty\n    settings:\n      property: title\n",
    )
    .unwrap();

    let commands = only_de.commands(stream.graph().unwrap(), &services);

    assert!(commands.is_empty());
}

// ===== Execution =====

#[tokio::test]
async fn test_migration_writes_into_the_target_workspace() {
    let (repository, live_stream) = live_repository().await;
    let context = CommandContext::system();
    repository
        .handle(&live_stream, create_document("doc", "mul", "root"), &context)
        .await
        .unwrap();
    let migration = Migration::from_configuration("Retitle", &MigrationConfiguration::from_yaml(RETITLE).unwrap()).unwrap();
    let target = WorkspaceName::from("migrated");

    let result = repository
        .execute_migration(&migration, &WorkspaceName::live(), &target, &ContentStreamId::from("cs-migrated"), &context)
        .await
        .unwrap();

    assert!(!result.is_empty());
    let target_data = repository.require_workspace(&target).await.unwrap();
    assert_eq!(target_data.base_workspace_name(), Some(&WorkspaceName::live()));
    let migrated = repository.content_graph(target_data.current_content_stream_id()).await.unwrap();
    let live = repository.content_graph(&live_stream).await.unwrap();
    let title = |graph: &ContentGraph| {
        graph
            .node_aggregate(&id("doc"))
            .and_then(|doc| doc.variant(&origin("mul")))
            .and_then(|variant| variant.properties.value("title").cloned())
    };
    assert_eq!(title(&migrated), Some(json!("untitled (migrated)")));
    assert_eq!(title(&live), Some(json!("untitled")));
}

#[tokio::test]
async fn test_migration_needs_an_existing_source() {
    let (repository, _) = live_repository().await;
    let migration = Migration::from_configuration("Retitle", &MigrationConfiguration::from_yaml(RETITLE).unwrap()).unwrap();

    let result = repository
        .execute_migration(
            &migration,
            &WorkspaceName::from("nowhere"),
            &WorkspaceName::from("migrated"),
            &ContentStreamId::from("cs-migrated"),
            &CommandContext::system(),
        )
        .await;

    assert!(matches!(result, Err(ContentRepositoryError::WorkspaceDoesNotExist { .. })));
}
