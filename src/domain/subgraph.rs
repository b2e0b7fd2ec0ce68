//! Read-only view of a content graph at one dimension space point.

use crate::dimension::{DimensionSpacePoint, OriginDimensionSpacePoint};
use crate::domain::graph::ContentGraph;
use crate::domain::node_aggregate::NodeAggregate;
use crate::domain::properties::{NodeReference, SerializedPropertyValues};
use crate::domain::types::{NodeAggregateClassification, NodeAggregateId, NodeName, NodeTypeName, ReferenceName};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whether disabled nodes (and everything below them) are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityConstraints {
    pub include_disabled: bool,
}

impl VisibilityConstraints {
    pub fn frontend() -> Self {
        Self { include_disabled: false }
    }

    pub fn without_restrictions() -> Self {
        Self { include_disabled: true }
    }
}

/// A node: one aggregate as it appears at one dimension space point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub node_aggregate_id: NodeAggregateId,
    pub node_type_name: NodeTypeName,
    pub node_name: Option<NodeName>,
    pub classification: NodeAggregateClassification,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub dimension_space_point: DimensionSpacePoint,
    pub properties: SerializedPropertyValues,
    pub references: BTreeMap<ReferenceName, Vec<NodeReference>>,
    pub disabled: bool,
}

pub struct ContentSubgraph<'a> {
    graph: &'a ContentGraph,
    point: DimensionSpacePoint,
    visibility: VisibilityConstraints,
}

impl<'a> ContentSubgraph<'a> {
    pub fn new(graph: &'a ContentGraph, point: DimensionSpacePoint, visibility: VisibilityConstraints) -> Self {
        Self {
            graph,
            point,
            visibility,
        }
    }

    pub fn dimension_space_point(&self) -> &DimensionSpacePoint {
        &self.point
    }

    pub fn find_node_by_id(&self, id: &NodeAggregateId) -> Option<Node> {
        self.visible_aggregate(id).and_then(|a| self.node_of(a))
    }

    pub fn find_root_nodes(&self) -> Vec<Node> {
        self.graph
            .root_node_aggregates()
            .filter(|a| self.is_visible(a.id()))
            .filter_map(|a| self.node_of(a))
            .collect()
    }

    pub fn find_child_nodes(&self, parent: &NodeAggregateId) -> Vec<Node> {
        if self.visible_aggregate(parent).is_none() {
            return Vec::new();
        }
        self.graph
            .children_in(parent, &self.point)
            .into_iter()
            .filter(|c| self.visibility.include_disabled || !c.is_disabled_in(&self.point))
            .filter_map(|c| self.node_of(c))
            .collect()
    }

    pub fn find_child_node_by_name(&self, parent: &NodeAggregateId, name: &NodeName) -> Option<Node> {
        self.find_child_nodes(parent)
            .into_iter()
            .find(|n| n.node_name.as_ref() == Some(name))
    }

    pub fn find_parent_node(&self, child: &NodeAggregateId) -> Option<Node> {
        let parent = self.visible_aggregate(child)?.parent_in(&self.point)?;
        self.find_node_by_id(parent)
    }

    pub fn find_preceding_siblings(&self, id: &NodeAggregateId) -> Vec<Node> {
        let mut siblings = self.siblings(id, true);
        siblings.reverse();
        siblings
    }

    pub fn find_succeeding_siblings(&self, id: &NodeAggregateId) -> Vec<Node> {
        self.siblings(id, false)
    }

    /// All visible descendants, depth-first in sibling order.
    pub fn find_descendant_nodes(&self, ancestor: &NodeAggregateId) -> Vec<Node> {
        let mut descendants = Vec::new();
        let mut stack: Vec<Node> = self.find_child_nodes(ancestor).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(self.find_child_nodes(&node.node_aggregate_id).into_iter().rev());
            descendants.push(node);
        }
        descendants
    }

    /// Visible siblings before or after `id`, in sibling order.
    fn siblings(&self, id: &NodeAggregateId, preceding: bool) -> Vec<Node> {
        let Some(parent) = self.visible_aggregate(id).and_then(|a| a.parent_in(&self.point)) else {
            return Vec::new();
        };
        let children = self.find_child_nodes(parent);
        let Some(position) = children.iter().position(|n| &n.node_aggregate_id == id) else {
            return Vec::new();
        };
        if preceding {
            children.into_iter().take(position).collect()
        } else {
            children.into_iter().skip(position + 1).collect()
        }
    }

    fn visible_aggregate(&self, id: &NodeAggregateId) -> Option<&'a NodeAggregate> {
        let aggregate = self.graph.node_aggregate(id)?;
        self.is_visible(id).then_some(aggregate)
    }

    /// Covered here, and neither the aggregate nor an ancestor is disabled.
    fn is_visible(&self, id: &NodeAggregateId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(aggregate) = self.graph.node_aggregate(id) else {
                return false;
            };
            if !aggregate.covers(&self.point) {
                return false;
            }
            if !self.visibility.include_disabled && aggregate.is_disabled_in(&self.point) {
                return false;
            }
            current = aggregate.parent_in(&self.point);
        }
        true
    }

    fn node_of(&self, aggregate: &NodeAggregate) -> Option<Node> {
        let origin = aggregate.origin_covering(&self.point)?;
        let variant = aggregate.variant(origin)?;
        Some(Node {
            node_aggregate_id: aggregate.id().clone(),
            node_type_name: aggregate.node_type_name().clone(),
            node_name: aggregate.node_name().cloned(),
            classification: aggregate.classification(),
            origin_dimension_space_point: origin.clone(),
            dimension_space_point: self.point.clone(),
            properties: variant.properties.clone(),
            references: variant.references.clone(),
            disabled: aggregate.is_disabled_in(&self.point),
        })
    }
}

#[cfg(test)]
#[path = "tests/subgraph_tests.rs"]
mod tests;
