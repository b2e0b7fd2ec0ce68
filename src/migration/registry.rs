//! Maps configured type names to filters and transformations.

use super::config::ComponentConfiguration;
use super::filters::Filter;
use super::transformations::{
    GlobalTransformation, NodeAggregateTransformation, NodeTransformation, Transformation,
};
use crate::domain::errors::ContentRepositoryError;
use serde::de::DeserializeOwned;

type FilterFactory = fn(&serde_yaml::Value) -> Result<Filter, ContentRepositoryError>;
type TransformationFactory = fn(&serde_yaml::Value) -> Result<Transformation, ContentRepositoryError>;

const FILTERS: &[(&str, FilterFactory)] = &[
    ("NodeType", |s| Ok(Filter::NodeType(settings("NodeType", s)?))),
    ("NodeName", |s| Ok(Filter::NodeName(settings("NodeName", s)?))),
    ("PropertyNotEmpty", |s| {
        Ok(Filter::PropertyNotEmpty(settings("PropertyNotEmpty", s)?))
    }),
    ("PropertyValue", |s| Ok(Filter::PropertyValue(settings("PropertyValue", s)?))),
    ("DimensionSpacePoints", |s| {
        Ok(Filter::DimensionSpacePoints(settings("DimensionSpacePoints", s)?))
    }),
];

const TRANSFORMATIONS: &[(&str, TransformationFactory)] = &[
    ("MoveDimensionSpacePoint", |s| {
        Ok(Transformation::Global(GlobalTransformation::MoveDimensionSpacePoint(
            settings("MoveDimensionSpacePoint", s)?,
        )))
    }),
    ("AddDimensionShineThrough", |s| {
        Ok(Transformation::Global(GlobalTransformation::AddDimensionShineThrough(
            settings("AddDimensionShineThrough", s)?,
        )))
    }),
    ("ChangeNodeType", |s| {
        Ok(Transformation::NodeAggregateBased(NodeAggregateTransformation::ChangeNodeType(
            settings("ChangeNodeType", s)?,
        )))
    }),
    ("RenameNodeAggregate", |s| {
        Ok(Transformation::NodeAggregateBased(
            NodeAggregateTransformation::RenameNodeAggregate(settings("RenameNodeAggregate", s)?),
        ))
    }),
    ("UpdateRootNodeAggregateDimensions", |_| {
        Ok(Transformation::NodeAggregateBased(
            NodeAggregateTransformation::UpdateRootNodeAggregateDimensions,
        ))
    }),
    ("AddNewProperty", |s| {
        Ok(Transformation::NodeBased(NodeTransformation::AddNewProperty(settings(
            "AddNewProperty",
            s,
        )?)))
    }),
    ("ChangePropertyValue", |s| {
        Ok(Transformation::NodeBased(NodeTransformation::ChangePropertyValue(
            settings("ChangePropertyValue", s)?,
        )))
    }),
    ("RemoveProperty", |s| {
        Ok(Transformation::NodeBased(NodeTransformation::RemoveProperty(settings(
            "RemoveProperty",
            s,
        )?)))
    }),
    ("RenameProperty", |s| {
        Ok(Transformation::NodeBased(NodeTransformation::RenameProperty(settings(
            "RenameProperty",
            s,
        )?)))
    }),
    ("StripTagsOnProperty", |s| {
        Ok(Transformation::NodeBased(NodeTransformation::StripTagsOnProperty(
            settings("StripTagsOnProperty", s)?,
        )))
    }),
    ("RemoveNode", |s| {
        let remove_node: super::transformations::RemoveNodeSettings = settings("RemoveNode", s)?;
        remove_node.validate()?;
        Ok(Transformation::NodeBased(NodeTransformation::RemoveNode(remove_node)))
    }),
];

pub fn build_filter(config: &ComponentConfiguration) -> Result<Filter, ContentRepositoryError> {
    let factory = FILTERS
        .iter()
        .find(|(name, _)| *name == config.type_name)
        .map(|(_, factory)| factory)
        .ok_or_else(|| ContentRepositoryError::InvalidConfiguration {
            message: format!("unknown filter type '{}'", config.type_name),
        })?;
    factory(&config.settings)
}

pub fn build_transformation(config: &ComponentConfiguration) -> Result<Transformation, ContentRepositoryError> {
    let factory = TRANSFORMATIONS
        .iter()
        .find(|(name, _)| *name == config.type_name)
        .map(|(_, factory)| factory)
        .ok_or_else(|| ContentRepositoryError::InvalidConfiguration {
            message: format!("unknown transformation type '{}'", config.type_name),
        })?;
    factory(&config.settings)
}

/// Names of every registered transformation, in registration order.
pub fn transformation_types() -> impl Iterator<Item = &'static str> {
    TRANSFORMATIONS.iter().map(|(name, _)| *name)
}

fn settings<T: DeserializeOwned>(type_name: &str, value: &serde_yaml::Value) -> Result<T, ContentRepositoryError> {
    serde_yaml::from_value(value.clone()).map_err(|e| ContentRepositoryError::InvalidConfiguration {
        message: format!("invalid settings for '{}': {}", type_name, e),
    })
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
