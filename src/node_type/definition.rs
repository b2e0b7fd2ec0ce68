//! Node type declarations and their resolved form.

use crate::domain::types::{NodeName, NodeTypeName, PropertyName, ReferenceName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A node type as declared in configuration, before inheritance is resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDeclaration {
    #[serde(default)]
    pub super_types: BTreeMap<String, bool>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDeclaration>,
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceDeclaration>,
    #[serde(default)]
    pub child_nodes: BTreeMap<String, ChildNodeDeclaration>,
    #[serde(default)]
    pub constraints: ConstraintsDeclaration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDeclaration {
    #[serde(rename = "type", default = "default_property_type")]
    pub type_name: String,
    #[serde(default)]
    pub default_value: Option<Value>,
}

fn default_property_type() -> String {
    "string".to_string()
}

impl PropertyDeclaration {
    /// Whether `value` matches the declared type. Unknown types accept anything.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.type_name.as_str() {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "float" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "DateTime" => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDeclaration {
    #[serde(default)]
    pub constraints: ReferenceConstraints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceConstraints {
    #[serde(default)]
    pub node_types: BTreeMap<String, bool>,
    #[serde(default)]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildNodeDeclaration {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub constraints: ConstraintsDeclaration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsDeclaration {
    #[serde(default)]
    pub node_types: BTreeMap<String, bool>,
}

/// A node type with inheritance resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
    pub(super) name: NodeTypeName,
    /// Every supertype with its distance (1 = direct).
    pub(super) ancestors: Vec<(NodeTypeName, usize)>,
    pub(super) is_abstract: bool,
    pub(super) is_root: bool,
    pub(super) properties: BTreeMap<PropertyName, PropertyDeclaration>,
    pub(super) references: BTreeMap<ReferenceName, ReferenceDeclaration>,
    pub(super) tethered_nodes: BTreeMap<NodeName, ChildNodeDeclaration>,
    pub(super) child_constraints: BTreeMap<String, bool>,
}

impl NodeType {
    pub fn name(&self) -> &NodeTypeName {
        &self.name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// True for the type itself and all its supertypes.
    pub fn is_of_type(&self, name: &NodeTypeName) -> bool {
        &self.name == name || self.ancestors.iter().any(|(a, _)| a == name)
    }

    pub fn ancestors(&self) -> &[(NodeTypeName, usize)] {
        &self.ancestors
    }

    pub fn properties(&self) -> &BTreeMap<PropertyName, PropertyDeclaration> {
        &self.properties
    }

    pub fn property(&self, name: &PropertyName) -> Option<&PropertyDeclaration> {
        self.properties.get(name)
    }

    pub fn reference(&self, name: &ReferenceName) -> Option<&ReferenceDeclaration> {
        self.references.get(name)
    }

    /// Default values of all properties that declare one.
    pub fn default_values(&self) -> BTreeMap<PropertyName, (Value, &str)> {
        self.properties
            .iter()
            .filter_map(|(name, declaration)| {
                declaration
                    .default_value
                    .clone()
                    .map(|v| (name.clone(), (v, declaration.type_name.as_str())))
            })
            .collect()
    }

    pub fn tethered_nodes(&self) -> &BTreeMap<NodeName, ChildNodeDeclaration> {
        &self.tethered_nodes
    }

    pub fn has_tethered_node(&self, name: &NodeName) -> bool {
        self.tethered_nodes.contains_key(name)
    }

    pub fn type_of_tethered_node(&self, name: &NodeName) -> Option<NodeTypeName> {
        self.tethered_nodes
            .get(name)
            .map(|c| NodeTypeName::from(c.node_type.as_str()))
    }

    pub fn allows_child_node_type(&self, candidate: &NodeType) -> bool {
        constraint_allows(&self.child_constraints, candidate)
    }

    /// Whether `candidate` may be placed below this type's tethered child `parent_name`.
    pub fn allows_grandchild_node_type(&self, parent_name: &NodeName, candidate: &NodeType) -> bool {
        match self.tethered_nodes.get(parent_name) {
            Some(child) => constraint_allows(&child.constraints.node_types, candidate),
            None => true,
        }
    }

    pub fn allows_reference_target(&self, reference: &ReferenceName, candidate: &NodeType) -> bool {
        match self.references.get(reference) {
            Some(declaration) => constraint_allows(&declaration.constraints.node_types, candidate),
            None => false,
        }
    }
}

/// Resolves a constraint map for `candidate`: the direct entry wins, then the
/// entry of the closest listed supertype, then `*`, otherwise denied.
/// An empty map allows everything.
pub(crate) fn constraint_allows(constraints: &BTreeMap<String, bool>, candidate: &NodeType) -> bool {
    if constraints.is_empty() {
        return true;
    }
    if let Some(allowed) = constraints.get(candidate.name.as_str()) {
        return *allowed;
    }
    let mut closest: Option<(usize, bool)> = None;
    for (ancestor, distance) in &candidate.ancestors {
        if let Some(allowed) = constraints.get(ancestor.as_str()) {
            closest = match closest {
                Some((d, a)) if d < *distance => Some((d, a)),
                Some((d, a)) if d == *distance => Some((d, a && *allowed)),
                _ => Some((*distance, *allowed)),
            };
        }
    }
    if let Some((_, allowed)) = closest {
        return allowed;
    }
    constraints.get("*").copied().unwrap_or(false)
}
