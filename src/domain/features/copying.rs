//! Copying a subtree, possibly from another content stream or dimension,
//! below a new parent.

use super::constraints::{require_node_aggregate_to_cover, require_node_type, require_node_type_to_not_be_abstract};
use super::creation::resolve_succeeding_sibling;
use super::HandlerResult;
use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::cqrs::commands::CopyNodesRecursively;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::properties::{NodeReference, SerializedPropertyValues};
use crate::domain::services::ContentRepositoryServices;
use crate::domain::subgraph::ContentSubgraph;
use crate::domain::types::{NodeAggregateClassification, NodeAggregateId, NodeName, NodeTypeName, ReferenceName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node and everything below it as seen in one subgraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSubtreeSnapshot {
    pub node_aggregate_id: NodeAggregateId,
    pub node_type_name: NodeTypeName,
    pub node_name: Option<NodeName>,
    pub classification: NodeAggregateClassification,
    pub properties: SerializedPropertyValues,
    #[serde(default)]
    pub references: BTreeMap<ReferenceName, Vec<NodeReference>>,
    #[serde(default)]
    pub child_nodes: Vec<NodeSubtreeSnapshot>,
}

impl NodeSubtreeSnapshot {
    /// Captures `id` and its visible descendants, or `None` if `id` is not
    /// visible in `subgraph`.
    pub fn from_subgraph(subgraph: &ContentSubgraph<'_>, id: &NodeAggregateId) -> Option<Self> {
        let node = subgraph.find_node_by_id(id)?;
        let child_nodes = subgraph
            .find_child_nodes(id)
            .iter()
            .filter_map(|child| Self::from_subgraph(subgraph, &child.node_aggregate_id))
            .collect();
        Some(Self {
            node_aggregate_id: node.node_aggregate_id,
            node_type_name: node.node_type_name,
            node_name: node.node_name,
            classification: node.classification,
            properties: node.properties,
            references: node.references,
            child_nodes,
        })
    }

    /// This node followed by its descendants, depth-first.
    pub fn walk(&self) -> Vec<&NodeSubtreeSnapshot> {
        let mut nodes = vec![self];
        for child in &self.child_nodes {
            nodes.extend(child.walk());
        }
        nodes
    }
}

/// Old id to new id for every node of a copied subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAggregateIdMapping(BTreeMap<NodeAggregateId, NodeAggregateId>);

impl NodeAggregateIdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh random id for every node of `snapshot`.
    pub fn generate_for(snapshot: &NodeSubtreeSnapshot) -> Self {
        Self(
            snapshot
                .walk()
                .into_iter()
                .map(|n| (n.node_aggregate_id.clone(), NodeAggregateId::create()))
                .collect(),
        )
    }

    pub fn with(mut self, old: NodeAggregateId, new: NodeAggregateId) -> Self {
        self.0.insert(old, new);
        self
    }

    pub fn get(&self, old: &NodeAggregateId) -> Option<&NodeAggregateId> {
        self.0.get(old)
    }
}

impl ContentStreamData {
    pub(crate) fn handle_copy_nodes_recursively(
        &self,
        command: CopyNodesRecursively,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let origin = &command.target_dimension_space_point;
        let target_point = origin.as_dimension_space_point();
        services.variation_graph.require_allowed(target_point)?;
        let tree = &command.node_tree_to_insert;
        let node_type = require_node_type(services, &tree.node_type_name)?;
        require_node_type_to_not_be_abstract(node_type)?;
        let node_name = command.target_node_name.clone().or_else(|| tree.node_name.clone());
        self.require_constraints_imposed_by_ancestors(
            services,
            node_type,
            node_name.as_ref(),
            &command.target_parent_node_aggregate_id,
        )?;
        let parent = self.require_node_aggregate(&command.target_parent_node_aggregate_id)?;
        require_node_aggregate_to_cover(parent, target_point)?;
        if let Some(sibling) = &command.target_succeeding_sibling_node_aggregate_id {
            self.require_node_aggregate(sibling)?;
        }

        let covered = services
            .variation_graph
            .specialization_set(target_point, true, &DimensionSpacePointSet::empty())
            .intersect(&parent.covered_points());
        if let Some(node_name) = &node_name {
            self.require_node_name_to_be_uncovered(node_name, parent.id(), &covered, None)?;
        }

        let new_id = |old: &NodeAggregateId| {
            command
                .node_aggregate_id_mapping
                .get(old)
                .cloned()
                .unwrap_or_else(|| NodeAggregateId::derived(&command.target_parent_node_aggregate_id, old.as_str()))
        };
        for node in tree.walk() {
            self.require_node_aggregate_to_not_exist(&new_id(&node.node_aggregate_id))?;
        }

        let mut events = Vec::new();
        for point in &covered {
            let succeeding = command
                .target_succeeding_sibling_node_aggregate_id
                .as_ref()
                .and_then(|requested| resolve_succeeding_sibling(self.graph(), parent.id(), requested, target_point, point));
            events.push(copy_event(
                tree,
                new_id(&tree.node_aggregate_id),
                origin,
                point,
                parent.id(),
                succeeding,
                node_name.clone(),
                NodeAggregateClassification::Regular,
            ));
        }
        copy_descendant_events(tree, &new_id, origin, &covered, &mut events);

        for node in tree.walk() {
            for (reference_name, references) in &node.references {
                let references = references
                    .iter()
                    .map(|r| NodeReference {
                        target_node_aggregate_id: command
                            .node_aggregate_id_mapping
                            .get(&r.target_node_aggregate_id)
                            .cloned()
                            .unwrap_or_else(|| r.target_node_aggregate_id.clone()),
                        properties: r.properties.clone(),
                    })
                    .collect();
                events.push(ContentStreamEvent::NodeReferencesWereSet {
                    source_node_aggregate_id: new_id(&node.node_aggregate_id),
                    affected_source_origin_dimension_space_points: vec![origin.clone()],
                    reference_name: reference_name.clone(),
                    references,
                });
            }
        }
        Ok(events)
    }
}

fn copy_descendant_events(
    node: &NodeSubtreeSnapshot,
    new_id: &dyn Fn(&NodeAggregateId) -> NodeAggregateId,
    origin: &OriginDimensionSpacePoint,
    covered: &DimensionSpacePointSet,
    events: &mut Vec<ContentStreamEvent>,
) {
    let parent_id = new_id(&node.node_aggregate_id);
    for child in &node.child_nodes {
        for point in covered {
            events.push(copy_event(
                child,
                new_id(&child.node_aggregate_id),
                origin,
                point,
                &parent_id,
                None,
                child.node_name.clone(),
                child.classification,
            ));
        }
        copy_descendant_events(child, new_id, origin, covered, events);
    }
}

#[allow(clippy::too_many_arguments)]
fn copy_event(
    node: &NodeSubtreeSnapshot,
    node_aggregate_id: NodeAggregateId,
    origin: &OriginDimensionSpacePoint,
    point: &DimensionSpacePoint,
    parent_id: &NodeAggregateId,
    succeeding_sibling: Option<NodeAggregateId>,
    node_name: Option<NodeName>,
    classification: NodeAggregateClassification,
) -> ContentStreamEvent {
    ContentStreamEvent::NodeAggregateWithNodeWasCreated {
        node_aggregate_id,
        node_type_name: node.node_type_name.clone(),
        origin_dimension_space_point: origin.clone(),
        covered_dimension_space_point: point.clone(),
        parent_node_aggregate_id: parent_id.clone(),
        succeeding_sibling_node_aggregate_id: succeeding_sibling,
        node_name,
        initial_property_values: node.properties.clone(),
        node_aggregate_classification: classification,
    }
}

#[cfg(test)]
#[path = "tests/copying_tests.rs"]
mod tests;
