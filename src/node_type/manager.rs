//! Resolves node type declarations into an immutable registry.

use super::definition::{NodeType, NodeTypeDeclaration};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::types::{NodeName, NodeTypeName, PropertyName, ReferenceName};
use std::collections::BTreeMap;

/// All node types known to a repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTypeManager {
    node_types: BTreeMap<NodeTypeName, NodeType>,
}

impl NodeTypeManager {
    /// Builds the registry. Supertypes are merged in name order, then the
    /// type's own declarations override them. Unknown supertypes, cycles and
    /// tethered children of unknown type are configuration errors.
    pub fn from_declarations(
        declarations: &BTreeMap<String, NodeTypeDeclaration>,
    ) -> Result<Self, ContentRepositoryError> {
        let mut node_types = BTreeMap::new();
        for name in declarations.keys() {
            let resolved = resolve(name, declarations, &mut Vec::new())?;
            node_types.insert(NodeTypeName::from(name.as_str()), resolved);
        }

        for node_type in node_types.values() {
            for (child_name, child) in node_type.tethered_nodes() {
                if !node_types.contains_key(&NodeTypeName::from(child.node_type.as_str())) {
                    return Err(ContentRepositoryError::InvalidConfiguration {
                        message: format!(
                            "tethered child '{}' of '{}' has unknown type '{}'",
                            child_name,
                            node_type.name(),
                            child.node_type
                        ),
                    });
                }
            }
        }

        tracing::debug!("Resolved {} node types", node_types.len());
        Ok(Self { node_types })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ContentRepositoryError> {
        let declarations: BTreeMap<String, NodeTypeDeclaration> = serde_yaml::from_str(yaml)
            .map_err(|e| ContentRepositoryError::InvalidConfiguration {
                message: format!("node types: {}", e),
            })?;
        Self::from_declarations(&declarations)
    }

    pub fn get(&self, name: &NodeTypeName) -> Option<&NodeType> {
        self.node_types.get(name)
    }

    pub fn has(&self, name: &NodeTypeName) -> bool {
        self.node_types.contains_key(name)
    }

    pub fn require(&self, name: &NodeTypeName) -> Result<&NodeType, ContentRepositoryError> {
        self.get(name)
            .ok_or_else(|| ContentRepositoryError::NodeTypeNotFound {
                node_type_name: name.clone(),
            })
    }

    pub fn all(&self) -> impl Iterator<Item = &NodeType> {
        self.node_types.values()
    }

    /// Types that inherit from `name`, excluding `name` itself.
    pub fn sub_types(&self, name: &NodeTypeName, include_abstract: bool) -> Vec<&NodeType> {
        self.node_types
            .values()
            .filter(|t| t.name() != name && t.is_of_type(name))
            .filter(|t| include_abstract || !t.is_abstract())
            .collect()
    }
}

fn resolve(
    name: &str,
    declarations: &BTreeMap<String, NodeTypeDeclaration>,
    stack: &mut Vec<String>,
) -> Result<NodeType, ContentRepositoryError> {
    if stack.iter().any(|s| s == name) {
        return Err(ContentRepositoryError::InvalidConfiguration {
            message: format!("node type '{}' inherits from itself", name),
        });
    }
    let declaration =
        declarations
            .get(name)
            .ok_or_else(|| ContentRepositoryError::InvalidConfiguration {
                message: format!("unknown node type '{}'", name),
            })?;
    stack.push(name.to_string());

    let mut node_type = NodeType {
        name: NodeTypeName::from(name),
        ancestors: Vec::new(),
        is_abstract: declaration.is_abstract,
        is_root: declaration.root,
        properties: BTreeMap::new(),
        references: BTreeMap::new(),
        tethered_nodes: BTreeMap::new(),
        child_constraints: BTreeMap::new(),
    };

    for (super_name, enabled) in &declaration.super_types {
        if !enabled {
            continue;
        }
        let parent = resolve(super_name, declarations, stack)?;
        push_ancestor(&mut node_type.ancestors, NodeTypeName::from(super_name.as_str()), 1);
        for (ancestor, distance) in &parent.ancestors {
            push_ancestor(&mut node_type.ancestors, ancestor.clone(), distance + 1);
        }
        node_type.is_root |= parent.is_root;
        node_type.properties.extend(parent.properties);
        node_type.references.extend(parent.references);
        node_type.tethered_nodes.extend(parent.tethered_nodes);
        node_type.child_constraints.extend(parent.child_constraints);
    }

    node_type.properties.extend(
        declaration
            .properties
            .iter()
            .map(|(k, v)| (PropertyName::from(k.as_str()), v.clone())),
    );
    node_type.references.extend(
        declaration
            .references
            .iter()
            .map(|(k, v)| (ReferenceName::from(k.as_str()), v.clone())),
    );
    node_type.tethered_nodes.extend(
        declaration
            .child_nodes
            .iter()
            .map(|(k, v)| (NodeName::from(k.as_str()), v.clone())),
    );
    node_type.child_constraints.extend(
        declaration
            .constraints
            .node_types
            .iter()
            .map(|(k, v)| (k.clone(), *v)),
    );

    stack.pop();
    Ok(node_type)
}

fn push_ancestor(ancestors: &mut Vec<(NodeTypeName, usize)>, name: NodeTypeName, distance: usize) {
    match ancestors.iter_mut().find(|(a, _)| a == &name) {
        Some((_, existing)) => *existing = (*existing).min(distance),
        None => ancestors.push((name, distance)),
    }
}

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod tests;
