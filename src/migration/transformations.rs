//! Transformations turn matched content into commands.
//!
//! A transformation never writes by itself; it derives the commands for one
//! content stream pair, one node aggregate or one node variant, and the
//! runner dispatches them onto the target stream.

use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::cqrs::commands::{
    ChangeNodeAggregateName, ChangeNodeAggregateType, ContentStreamCommand, DimensionAdjustment,
    RemoveNodeAggregate, SetSerializedNodeProperties, UpdateRootNodeAggregateDimensions,
};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::node_aggregate::{NodeAggregate, NodeVariant};
use crate::domain::properties::{SerializedPropertyValue, SerializedPropertyValues};
use crate::domain::strategies::{NodeAggregateTypeChangeConflictResolutionStrategy, NodeVariantSelectionStrategy};
use crate::domain::types::{NodeAggregateIdsByNodePaths, NodeName, NodeTypeName, PropertyName};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

// ===== Settings =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DimensionSpacePointAdjustmentSettings {
    pub from: DimensionSpacePoint,
    pub to: DimensionSpacePoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangeNodeTypeSettings {
    pub new_type: NodeTypeName,
    /// Delete children the new type does not allow instead of failing.
    #[serde(default)]
    pub force_delete_non_matching_child_nodes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenameNodeAggregateSettings {
    pub new_node_name: NodeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddNewPropertySettings {
    pub new_property_name: PropertyName,
    pub serialized_value: Value,
    #[serde(rename = "type", default = "default_property_type")]
    pub type_name: String,
}

fn default_property_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePropertyValueSettings {
    pub property: PropertyName,
    /// New value; `current_value_placeholder` is replaced by the current value.
    #[serde(default = "default_placeholder")]
    pub new_serialized_value: String,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub replace: String,
    #[serde(default = "default_placeholder")]
    pub current_value_placeholder: String,
}

fn default_placeholder() -> String {
    "{current}".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertySettings {
    pub property: PropertyName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenamePropertySettings {
    pub from: PropertyName,
    pub to: PropertyName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RemoveNodeSettings {
    #[serde(default = "default_removal_strategy")]
    pub strategy: NodeVariantSelectionStrategy,
    /// Remove at this point instead of the variant's origin.
    #[serde(default)]
    pub overridden_dimension_space_point: Option<DimensionSpacePoint>,
}

fn default_removal_strategy() -> NodeVariantSelectionStrategy {
    NodeVariantSelectionStrategy::VirtualSpecializations
}

// ===== Transformations =====

#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    Global(GlobalTransformation),
    NodeAggregateBased(NodeAggregateTransformation),
    NodeBased(NodeTransformation),
}

/// Runs once per step on the whole stream.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalTransformation {
    MoveDimensionSpacePoint(DimensionSpacePointAdjustmentSettings),
    AddDimensionShineThrough(DimensionSpacePointAdjustmentSettings),
}

/// Runs once per matched node aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAggregateTransformation {
    ChangeNodeType(ChangeNodeTypeSettings),
    RenameNodeAggregate(RenameNodeAggregateSettings),
    UpdateRootNodeAggregateDimensions,
}

/// Runs once per matched node variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTransformation {
    AddNewProperty(AddNewPropertySettings),
    ChangePropertyValue(ChangePropertyValueSettings),
    RemoveProperty(PropertySettings),
    RenameProperty(RenamePropertySettings),
    StripTagsOnProperty(PropertySettings),
    RemoveNode(RemoveNodeSettings),
}

/// The variant a node transformation is applied to.
pub struct NodeVariantContext<'a> {
    pub node_aggregate: &'a NodeAggregate,
    pub origin: &'a OriginDimensionSpacePoint,
    pub variant: &'a NodeVariant,
    /// Points the step may touch for this variant.
    pub covered_points: &'a DimensionSpacePointSet,
}

impl GlobalTransformation {
    pub fn commands(&self) -> Vec<ContentStreamCommand> {
        match self {
            Self::MoveDimensionSpacePoint(s) => vec![ContentStreamCommand::MoveDimensionSpacePoint(DimensionAdjustment {
                source: s.from.clone(),
                target: s.to.clone(),
            })],
            Self::AddDimensionShineThrough(s) => {
                vec![ContentStreamCommand::AddDimensionShineThrough(DimensionAdjustment {
                    source: s.from.clone(),
                    target: s.to.clone(),
                })]
            }
        }
    }
}

impl NodeAggregateTransformation {
    pub fn commands(&self, node_aggregate: &NodeAggregate) -> Vec<ContentStreamCommand> {
        let node_aggregate_id = node_aggregate.id().clone();
        match self {
            Self::ChangeNodeType(s) => {
                if node_aggregate.node_type_name() == &s.new_type {
                    return Vec::new();
                }
                let strategy = if s.force_delete_non_matching_child_nodes {
                    NodeAggregateTypeChangeConflictResolutionStrategy::Delete
                } else {
                    NodeAggregateTypeChangeConflictResolutionStrategy::HappyPath
                };
                vec![ContentStreamCommand::ChangeNodeAggregateType(ChangeNodeAggregateType {
                    node_aggregate_id,
                    new_node_type_name: s.new_type.clone(),
                    strategy,
                    tethered_descendant_node_aggregate_ids: NodeAggregateIdsByNodePaths::new(),
                })]
            }
            Self::RenameNodeAggregate(s) => {
                if node_aggregate.node_name() == Some(&s.new_node_name) {
                    return Vec::new();
                }
                vec![ContentStreamCommand::ChangeNodeAggregateName(ChangeNodeAggregateName {
                    node_aggregate_id,
                    new_node_name: s.new_node_name.clone(),
                })]
            }
            Self::UpdateRootNodeAggregateDimensions if node_aggregate.is_root() => {
                vec![ContentStreamCommand::UpdateRootNodeAggregateDimensions(
                    UpdateRootNodeAggregateDimensions { node_aggregate_id },
                )]
            }
            Self::UpdateRootNodeAggregateDimensions => Vec::new(),
        }
    }
}

impl NodeTransformation {
    /// Commands for one variant. Empty when the precondition does not hold.
    pub fn commands(&self, node: &NodeVariantContext<'_>) -> Vec<ContentStreamCommand> {
        let properties = &node.variant.properties;
        match self {
            Self::AddNewProperty(s) => {
                if properties.contains(&s.new_property_name) {
                    return Vec::new();
                }
                let values = SerializedPropertyValues::new().with(
                    s.new_property_name.as_str(),
                    SerializedPropertyValue::new(s.serialized_value.clone(), &s.type_name),
                );
                vec![set_properties(node, values, Vec::new())]
            }
            Self::ChangePropertyValue(s) => {
                let Some(current) = properties.get(&s.property) else {
                    return Vec::new();
                };
                let Value::String(current_value) = &current.value else {
                    return Vec::new();
                };
                let mut new_value = s.new_serialized_value.replace(&s.current_value_placeholder, current_value);
                if !s.search.is_empty() {
                    new_value = new_value.replace(&s.search, &s.replace);
                }
                if &new_value == current_value {
                    return Vec::new();
                }
                let values = SerializedPropertyValues::new().with(
                    s.property.as_str(),
                    SerializedPropertyValue::new(Value::String(new_value), &current.type_name),
                );
                vec![set_properties(node, values, Vec::new())]
            }
            Self::RemoveProperty(s) => {
                if !properties.contains(&s.property) {
                    return Vec::new();
                }
                vec![set_properties(node, SerializedPropertyValues::new(), vec![s.property.clone()])]
            }
            Self::RenameProperty(s) => {
                let Some(current) = properties.get(&s.from) else {
                    return Vec::new();
                };
                let values = SerializedPropertyValues::new().with(s.to.as_str(), current.clone());
                vec![set_properties(node, values, vec![s.from.clone()])]
            }
            Self::StripTagsOnProperty(s) => {
                let Some(current) = properties.get(&s.property) else {
                    return Vec::new();
                };
                let Value::String(current_value) = &current.value else {
                    return Vec::new();
                };
                let stripped = strip_tags(current_value);
                if &stripped == current_value {
                    return Vec::new();
                }
                let values = SerializedPropertyValues::new().with(
                    s.property.as_str(),
                    SerializedPropertyValue::new(Value::String(stripped), &current.type_name),
                );
                vec![set_properties(node, values, Vec::new())]
            }
            Self::RemoveNode(s) => {
                let point = s
                    .overridden_dimension_space_point
                    .clone()
                    .unwrap_or_else(|| node.origin.to_dimension_space_point());
                if !node.covered_points.contains(&point) {
                    return Vec::new();
                }
                vec![ContentStreamCommand::RemoveNodeAggregate(RemoveNodeAggregate {
                    node_aggregate_id: node.node_aggregate.id().clone(),
                    covered_dimension_space_point: point,
                    node_variant_selection_strategy: s.strategy,
                    removal_attachment_point: None,
                })]
            }
        }
    }
}

fn set_properties(
    node: &NodeVariantContext<'_>,
    property_values: SerializedPropertyValues,
    properties_to_unset: Vec<PropertyName>,
) -> ContentStreamCommand {
    ContentStreamCommand::SetSerializedNodeProperties(SetSerializedNodeProperties {
        node_aggregate_id: node.node_aggregate.id().clone(),
        origin_dimension_space_point: node.origin.clone(),
        property_values,
        properties_to_unset,
    })
}

fn strip_tags(value: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    match TAGS.get_or_init(|| Regex::new(r"<[^>]*>").ok()) {
        Some(tags) => tags.replace_all(value, "").into_owned(),
        None => value.to_string(),
    }
}

impl RemoveNodeSettings {
    /// Rejects the all-variants strategy.
    pub fn validate(&self) -> Result<(), ContentRepositoryError> {
        if self.strategy == NodeVariantSelectionStrategy::AllVariants {
            return Err(ContentRepositoryError::UnsupportedStrategy {
                message: "RemoveNode does not support the all-variants strategy".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transformations_tests.rs"]
mod tests;
