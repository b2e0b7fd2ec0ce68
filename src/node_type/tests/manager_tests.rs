use super::*;
use crate::node_type::NodeType;
use serde_json::json;

const NODE_TYPES: &str = r#"
'Acme:Root':
  root: true
'Acme:Base':
  abstract: true
  properties:
    title:
      type: string
      defaultValue: untitled
'Acme:Document':
  superTypes:
    'Acme:Base': true
  properties:
    hidden:
      type: boolean
  references:
    related:
      constraints:
        nodeTypes:
          'Acme:Document': true
          '*': false
  childNodes:
    main:
      type: 'Acme:Collection'
      constraints:
        nodeTypes:
          'Acme:Text': true
          '*': false
  constraints:
    nodeTypes:
      'Acme:Document': true
      'Acme:Special': false
      '*': false
'Acme:Page':
  superTypes:
    'Acme:Document': true
'Acme:Special':
  superTypes:
    'Acme:Page': true
'Acme:Collection': {}
'Acme:Text':
  properties:
    text: {}
    published:
      type: DateTime
"#;

fn manager() -> NodeTypeManager {
    NodeTypeManager::from_yaml(NODE_TYPES).unwrap()
}

fn node_type<'a>(manager: &'a NodeTypeManager, name: &str) -> &'a NodeType {
    manager.get(&NodeTypeName::from(name)).unwrap()
}

#[test]
fn test_inheritance_merges_properties_and_children() {
    let manager = manager();
    let page = node_type(&manager, "Acme:Page");

    assert!(page.property(&PropertyName::from("title")).is_some());
    assert!(page.property(&PropertyName::from("hidden")).is_some());
    assert!(page.has_tethered_node(&NodeName::from("main")));
    assert!(!page.is_abstract());
    assert!(page.is_of_type(&NodeTypeName::from("Acme:Base")));
    assert_eq!(
        page.default_values().get(&PropertyName::from("title")),
        Some(&(json!("untitled"), "string"))
    );
}

#[test]
fn test_closest_supertype_constraint_wins() {
    let manager = manager();
    let document = node_type(&manager, "Acme:Document");

    assert!(document.allows_child_node_type(node_type(&manager, "Acme:Page")));
    assert!(!document.allows_child_node_type(node_type(&manager, "Acme:Special")));
    assert!(!document.allows_child_node_type(node_type(&manager, "Acme:Text")));
}

#[test]
fn test_empty_constraints_allow_everything() {
    let manager = manager();
    let collection = node_type(&manager, "Acme:Collection");
    assert!(collection.allows_child_node_type(node_type(&manager, "Acme:Page")));
}

#[test]
fn test_grandchild_constraints_come_from_tethered_declaration() {
    let manager = manager();
    let page = node_type(&manager, "Acme:Page");
    let main = NodeName::from("main");

    assert!(page.allows_grandchild_node_type(&main, node_type(&manager, "Acme:Text")));
    assert!(!page.allows_grandchild_node_type(&main, node_type(&manager, "Acme:Page")));
}

#[test]
fn test_reference_constraints() {
    let manager = manager();
    let page = node_type(&manager, "Acme:Page");
    let related = ReferenceName::from("related");

    assert!(page.allows_reference_target(&related, node_type(&manager, "Acme:Special")));
    assert!(!page.allows_reference_target(&related, node_type(&manager, "Acme:Text")));
    assert!(!page.allows_reference_target(&ReferenceName::from("other"), page));
}

#[test]
fn test_property_type_checks() {
    let manager = manager();
    let text = node_type(&manager, "Acme:Text");
    let published = text.property(&PropertyName::from("published")).unwrap();
    let plain = text.property(&PropertyName::from("text")).unwrap();

    assert!(published.accepts(&json!("2024-01-01T10:00:00+00:00")));
    assert!(!published.accepts(&json!("yesterday")));
    assert!(plain.accepts(&json!("hello")));
    assert!(!plain.accepts(&json!(3)));
}

#[test]
fn test_sub_types() {
    let manager = manager();
    let names: Vec<&str> = manager
        .sub_types(&NodeTypeName::from("Acme:Document"), false)
        .iter()
        .map(|t| t.name().as_str())
        .collect();
    assert_eq!(names, vec!["Acme:Page", "Acme:Special"]);
}

#[test]
fn test_root_flag() {
    let manager = manager();
    assert!(node_type(&manager, "Acme:Root").is_root());
    assert!(!node_type(&manager, "Acme:Page").is_root());
}

#[test]
fn test_invalid_declarations_are_rejected() {
    let unknown_super = "'A':\n  superTypes:\n    'B': true\n";
    assert!(NodeTypeManager::from_yaml(unknown_super).is_err());

    let cycle = "'A':\n  superTypes:\n    'B': true\n'B':\n  superTypes:\n    'A': true\n";
    assert!(NodeTypeManager::from_yaml(cycle).is_err());

    let unknown_child = "'A':\n  childNodes:\n    main:\n      type: 'C'\n";
    assert!(NodeTypeManager::from_yaml(unknown_child).is_err());
}
