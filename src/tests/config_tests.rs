use super::*;
use crate::domain::types::NodeTypeName;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

const CONFIG: &str = r#"
storage:
  path: /var/lib/contentgraph
dimensions:
  - id: language
    values:
      - value: mul
        specializations:
          - value: de
nodeTypes:
  'Acme:Root':
    root: true
  'Acme:Page':
    childNodes:
      main:
        type: 'Acme:Collection'
  'Acme:Collection': {}
"#;

// ===== Parsing =====

#[test]
fn test_full_config_parses() {
    let config = RepositoryConfig::from_yaml(CONFIG).unwrap();

    assert_eq!(config.storage_path().unwrap(), PathBuf::from("/var/lib/contentgraph"));
    assert_eq!(config.dimension_source().unwrap().dimensions().len(), 1);
    let services = config.services().unwrap();
    assert!(services.node_types.get(&NodeTypeName::from("Acme:Page")).is_some());
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = RepositoryConfig::from_yaml("{}").unwrap();

    assert!(config.dimensions.is_empty());
    assert!(config.node_types.is_empty());
    assert!(config.storage.path.is_none());
}

#[test]
fn test_unknown_fields_are_rejected() {
    assert!(RepositoryConfig::from_yaml("storage:\n  directory: /tmp\n").is_err());
    assert!(RepositoryConfig::from_yaml("workspaces: []\n").is_err());
}

#[test]
fn test_invalid_domain_configuration_is_rejected() {
    let duplicate_dimension = r#"
dimensions:
  - id: language
    values: [{value: en}]
  - id: language
    values: [{value: de}]
"#;
    let unknown_tethered_type = r#"
nodeTypes:
  'Acme:Page':
    childNodes:
      main:
        type: 'Acme:Missing'
"#;

    let dimension_error = RepositoryConfig::from_yaml(duplicate_dimension).unwrap_err();
    let node_type_error = RepositoryConfig::from_yaml(unknown_tethered_type).unwrap_err();

    assert!(format!("{:#}", dimension_error).contains("declared more than once"));
    assert!(format!("{:#}", node_type_error).contains("Acme:Missing"));
}

// ===== Loading =====

#[test]
fn test_load_names_the_file_on_failure() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("contentgraph.yaml");

    let missing = RepositoryConfig::load(&path).unwrap_err();
    fs::write(&path, "storage: [").unwrap();
    let broken = RepositoryConfig::load(&path).unwrap_err();

    assert!(missing.to_string().contains("Failed to read config file"));
    assert!(broken.to_string().contains("Failed to parse config file"));
}

#[test]
#[serial]
fn test_resolve_prefers_the_explicit_path() {
    let dir = tempdir().expect("temp dir");
    let explicit = dir.path().join("explicit.yaml");
    fs::write(&explicit, CONFIG).unwrap();
    std::env::set_var(CONFIG_ENV, dir.path().join("absent.yaml"));

    let config = RepositoryConfig::resolve(Some(&explicit));
    std::env::remove_var(CONFIG_ENV);

    assert_eq!(config.unwrap().dimensions.len(), 1);
}

#[test]
#[serial]
fn test_resolve_reads_the_environment() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("env.yaml");
    fs::write(&path, CONFIG).unwrap();
    std::env::set_var(CONFIG_ENV, &path);

    let config = RepositoryConfig::resolve(None);
    std::env::remove_var(CONFIG_ENV);

    assert_eq!(config.unwrap().node_types.len(), 3);
}

#[test]
#[serial]
fn test_resolve_falls_back_to_defaults() {
    std::env::remove_var(CONFIG_ENV);

    let config = RepositoryConfig::resolve(None).unwrap();

    assert!(config.dimensions.is_empty());
    assert!(config.storage_path().unwrap().ends_with("contentgraph"));
}
