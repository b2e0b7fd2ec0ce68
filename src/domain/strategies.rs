//! Strategy enums consumed at the command boundary.
//!
//! The serialized identifiers are stable and appear in commands, events and
//! migration configuration.

use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, InterDimensionalVariationGraph};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::node_aggregate::NodeAggregate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which covered points of a node aggregate an operation affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeVariantSelectionStrategy {
    /// Only the given covered point.
    OnlyGivenVariant,
    /// The given point and every covered specialization that shares its origin.
    VirtualSpecializations,
    /// Every covered point.
    AllVariants,
}

impl NodeVariantSelectionStrategy {
    /// Resolves the covered points affected when targeting `point`.
    pub fn resolve_affected_points(
        &self,
        point: &DimensionSpacePoint,
        node_aggregate: &NodeAggregate,
        variation_graph: &InterDimensionalVariationGraph,
    ) -> DimensionSpacePointSet {
        match self {
            Self::OnlyGivenVariant => DimensionSpacePointSet::single(point.clone()),
            Self::VirtualSpecializations => {
                shared_origin_specializations(point, node_aggregate, variation_graph)
            }
            Self::AllVariants => node_aggregate.covered_points(),
        }
    }
}

impl FromStr for NodeVariantSelectionStrategy {
    type Err = ContentRepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "only-given-variant" => Ok(Self::OnlyGivenVariant),
            "virtual-specializations" => Ok(Self::VirtualSpecializations),
            "all-variants" => Ok(Self::AllVariants),
            other => Err(ContentRepositoryError::UnsupportedStrategy {
                message: format!("unknown node variant selection strategy '{}'", other),
            }),
        }
    }
}

/// How a move distributes over the covered points of the moved aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationDistributionStrategy {
    /// Only the given point.
    Scatter,
    /// The given point and every covered specialization sharing its origin.
    GatherSpecializations,
    /// Every covered point.
    GatherAll,
}

impl RelationDistributionStrategy {
    pub fn resolve_affected_points(
        &self,
        point: &DimensionSpacePoint,
        node_aggregate: &NodeAggregate,
        variation_graph: &InterDimensionalVariationGraph,
    ) -> DimensionSpacePointSet {
        match self {
            Self::Scatter => DimensionSpacePointSet::single(point.clone()),
            Self::GatherSpecializations => {
                shared_origin_specializations(point, node_aggregate, variation_graph)
            }
            Self::GatherAll => node_aggregate.covered_points(),
        }
    }
}

impl FromStr for RelationDistributionStrategy {
    type Err = ContentRepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scatter" => Ok(Self::Scatter),
            "gather-specializations" => Ok(Self::GatherSpecializations),
            "gather-all" => Ok(Self::GatherAll),
            other => Err(ContentRepositoryError::UnsupportedStrategy {
                message: format!("unknown relation distribution strategy '{}'", other),
            }),
        }
    }
}

/// What to do with children that violate a node aggregate's new type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeAggregateTypeChangeConflictResolutionStrategy {
    HappyPath,
    Delete,
}

impl FromStr for NodeAggregateTypeChangeConflictResolutionStrategy {
    type Err = ContentRepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy-path" => Ok(Self::HappyPath),
            "delete" => Ok(Self::Delete),
            other => Err(ContentRepositoryError::UnsupportedStrategy {
                message: format!("unknown conflict resolution strategy '{}'", other),
            }),
        }
    }
}

/// `point` plus its covered specializations that inherit from the same origin.
fn shared_origin_specializations(
    point: &DimensionSpacePoint,
    node_aggregate: &NodeAggregate,
    variation_graph: &InterDimensionalVariationGraph,
) -> DimensionSpacePointSet {
    let origin = node_aggregate.origin_covering(point);
    let mut affected = DimensionSpacePointSet::single(point.clone());
    for specialization in variation_graph.specializations(point) {
        if origin.is_some() && node_aggregate.origin_covering(specialization) == origin {
            affected.insert(specialization.clone());
        }
    }
    affected
}

#[cfg(test)]
#[path = "tests/strategies_tests.rs"]
mod tests;
