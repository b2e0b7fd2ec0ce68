//! Filters decide which node aggregates and node variants a migration step touches.
//!
//! `NodeType` and `NodeName` judge whole aggregates. The remaining filters
//! judge single variants (one origin point of an aggregate).

use crate::dimension::{DimensionSpacePoint, OriginDimensionSpacePoint};
use crate::domain::node_aggregate::{NodeAggregate, NodeVariant};
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::{NodeName, NodeTypeName, PropertyName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeTypeFilterSettings {
    pub node_type: NodeTypeName,
    #[serde(default)]
    pub with_sub_types: bool,
    /// Invert the match.
    #[serde(default)]
    pub exclude: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeNameFilterSettings {
    pub node_name: NodeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyNotEmptySettings {
    pub property_name: PropertyName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyValueSettings {
    pub property_name: PropertyName,
    pub serialized_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DimensionSpacePointsSettings {
    pub points: Vec<DimensionSpacePoint>,
    #[serde(default)]
    pub include_specializations: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    NodeType(NodeTypeFilterSettings),
    NodeName(NodeNameFilterSettings),
    PropertyNotEmpty(PropertyNotEmptySettings),
    PropertyValue(PropertyValueSettings),
    DimensionSpacePoints(DimensionSpacePointsSettings),
}

impl Filter {
    pub fn is_node_aggregate_filter(&self) -> bool {
        matches!(self, Self::NodeType(_) | Self::NodeName(_))
    }

    /// Aggregate-level check. Variant filters accept every aggregate here.
    pub fn matches_node_aggregate(&self, node_aggregate: &NodeAggregate, services: &ContentRepositoryServices) -> bool {
        match self {
            Self::NodeType(settings) => {
                let type_name = node_aggregate.node_type_name();
                let matches = type_name == &settings.node_type
                    || (settings.with_sub_types
                        && services
                            .node_types
                            .get(type_name)
                            .is_some_and(|t| t.is_of_type(&settings.node_type)));
                matches != settings.exclude
            }
            Self::NodeName(settings) => node_aggregate.node_name() == Some(&settings.node_name),
            _ => true,
        }
    }

    /// Variant-level check. Aggregate filters accept every variant here.
    pub fn matches_node(
        &self,
        origin: &OriginDimensionSpacePoint,
        variant: &NodeVariant,
        services: &ContentRepositoryServices,
    ) -> bool {
        match self {
            Self::PropertyNotEmpty(settings) => variant
                .properties
                .get(&settings.property_name)
                .is_some_and(|p| !is_empty_value(&p.value)),
            Self::PropertyValue(settings) => variant
                .properties
                .get(&settings.property_name)
                .is_some_and(|p| p.value == settings.serialized_value),
            Self::DimensionSpacePoints(settings) => {
                let point = origin.as_dimension_space_point();
                settings.points.iter().any(|candidate| {
                    candidate == point
                        || (settings.include_specializations
                            && services.variation_graph.is_specialization_of(point, candidate))
                })
            }
            _ => true,
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
