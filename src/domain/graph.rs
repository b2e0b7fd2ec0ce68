//! The content graph of one content stream: all node aggregates and the
//! hierarchy between them, per covered dimension space point.
//!
//! This is the state command handlers validate against. It is rebuilt by
//! folding the stream's events over `apply`.

use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::cqrs::events::{ContentStreamEvent, InterdimensionalSibling};
use crate::domain::node_aggregate::{NodeAggregate, NodeCoverage, NodeVariant};
use crate::domain::subgraph::{ContentSubgraph, VisibilityConstraints};
use crate::domain::types::{NodeAggregateClassification, NodeAggregateId, NodeName, NodeTypeName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentGraph {
    node_aggregates: BTreeMap<NodeAggregateId, NodeAggregate>,
}

impl ContentGraph {
    // ===== Queries =====

    pub fn node_aggregate(&self, id: &NodeAggregateId) -> Option<&NodeAggregate> {
        self.node_aggregates.get(id)
    }

    pub fn node_aggregates(&self) -> impl Iterator<Item = &NodeAggregate> {
        self.node_aggregates.values()
    }

    pub fn node_aggregates_of_type<'a>(
        &'a self,
        node_type_name: &'a NodeTypeName,
    ) -> impl Iterator<Item = &'a NodeAggregate> {
        self.node_aggregates
            .values()
            .filter(move |a| a.node_type_name() == node_type_name)
    }

    pub fn root_node_aggregates(&self) -> impl Iterator<Item = &NodeAggregate> {
        self.node_aggregates.values().filter(|a| a.is_root())
    }

    pub fn len(&self) -> usize {
        self.node_aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_aggregates.is_empty()
    }

    /// Child aggregates of `parent` in `point`, in sibling order.
    pub fn children_in(&self, parent: &NodeAggregateId, point: &DimensionSpacePoint) -> Vec<&NodeAggregate> {
        self.node_aggregates
            .get(parent)
            .map(|p| {
                p.children_in(point)
                    .iter()
                    .filter_map(|c| self.node_aggregates.get(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct child aggregates of `parent` across all points it covers.
    pub fn child_aggregates(&self, parent: &NodeAggregateId) -> Vec<&NodeAggregate> {
        let Some(parent) = self.node_aggregates.get(parent) else {
            return Vec::new();
        };
        let mut ids: Vec<&NodeAggregateId> = parent
            .covered_points()
            .iter()
            .flat_map(|p| parent.children_in(p).iter())
            .collect();
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| self.node_aggregates.get(id))
            .collect()
    }

    /// Child aggregates named `name` below `parent`, in any covered point.
    pub fn child_aggregates_by_name(&self, parent: &NodeAggregateId, name: &NodeName) -> Vec<&NodeAggregate> {
        self.child_aggregates(parent)
            .into_iter()
            .filter(|c| c.node_name() == Some(name))
            .collect()
    }

    /// Tethered child named `name` below `parent`.
    pub fn tethered_child(&self, parent: &NodeAggregateId, name: &NodeName) -> Option<&NodeAggregate> {
        self.child_aggregates_by_name(parent, name)
            .into_iter()
            .find(|c| c.is_tethered())
    }

    /// Parent aggregates of `child` across all points it covers.
    pub fn parent_aggregates(&self, child: &NodeAggregateId) -> Vec<&NodeAggregate> {
        self.node_aggregates
            .get(child)
            .map(|c| {
                c.parents()
                    .into_iter()
                    .filter_map(|p| self.node_aggregates.get(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `candidate` is `ancestor` or lies below it in `point`.
    pub fn is_descendant_or_self(
        &self,
        candidate: &NodeAggregateId,
        ancestor: &NodeAggregateId,
        point: &DimensionSpacePoint,
    ) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node_aggregates.get(id).and_then(|a| a.parent_in(point));
        }
        false
    }

    /// `root` and everything below it in `point`, depth-first.
    pub fn subtree_in(&self, root: &NodeAggregateId, point: &DimensionSpacePoint) -> Vec<NodeAggregateId> {
        let mut collected = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            if let Some(aggregate) = self.node_aggregates.get(&id) {
                if !aggregate.covers(point) {
                    continue;
                }
                stack.extend(aggregate.children_in(point).iter().rev().cloned());
                collected.push(id);
            }
        }
        collected
    }

    /// First of `candidates` that hangs below `parent` in `point`.
    pub fn first_child_among<'c>(
        &self,
        parent: &NodeAggregateId,
        point: &DimensionSpacePoint,
        candidates: impl IntoIterator<Item = &'c NodeAggregateId>,
    ) -> Option<NodeAggregateId> {
        let children = self.node_aggregates.get(parent)?.children_in(point);
        candidates.into_iter().find(|c| children.contains(c)).cloned()
    }

    /// Children of `parent` in `point` that come after `child`.
    pub fn succeeding_siblings_in(
        &self,
        parent: &NodeAggregateId,
        child: &NodeAggregateId,
        point: &DimensionSpacePoint,
    ) -> Vec<NodeAggregateId> {
        self.node_aggregates
            .get(parent)
            .map(|p| {
                p.children_in(point)
                    .iter()
                    .skip_while(|c| *c != child)
                    .skip(1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A read-only view of the graph at one dimension space point.
    pub fn subgraph(&self, point: DimensionSpacePoint, visibility: VisibilityConstraints) -> ContentSubgraph<'_> {
        ContentSubgraph::new(self, point, visibility)
    }

    // ===== Event application =====

    /// Applies one content event. Lifecycle events are ignored.
    pub fn apply(&mut self, event: &ContentStreamEvent) {
        match event {
            ContentStreamEvent::RootNodeAggregateWithNodeWasCreated {
                node_aggregate_id,
                node_type_name,
                covered_dimension_space_points,
            } => {
                let mut aggregate = NodeAggregate::new(
                    node_aggregate_id.clone(),
                    node_type_name.clone(),
                    None,
                    NodeAggregateClassification::Root,
                );
                aggregate.ensure_variant(OriginDimensionSpacePoint::empty(), NodeVariant::default());
                for point in covered_dimension_space_points {
                    aggregate.set_coverage(point.clone(), root_coverage());
                }
                self.node_aggregates.insert(node_aggregate_id.clone(), aggregate);
            }

            ContentStreamEvent::RootNodeAggregateDimensionsWereUpdated {
                node_aggregate_id,
                covered_dimension_space_points,
            } => {
                if let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) {
                    for point in aggregate.covered_points().difference(covered_dimension_space_points) {
                        aggregate.remove_coverage(&point);
                    }
                    for point in covered_dimension_space_points {
                        if !aggregate.covers(point) {
                            aggregate.set_coverage(point.clone(), root_coverage());
                        }
                    }
                }
            }

            ContentStreamEvent::NodeAggregateWithNodeWasCreated {
                node_aggregate_id,
                node_type_name,
                origin_dimension_space_point,
                covered_dimension_space_point,
                parent_node_aggregate_id,
                succeeding_sibling_node_aggregate_id,
                node_name,
                initial_property_values,
                node_aggregate_classification,
            } => {
                let aggregate = self
                    .node_aggregates
                    .entry(node_aggregate_id.clone())
                    .or_insert_with(|| {
                        NodeAggregate::new(
                            node_aggregate_id.clone(),
                            node_type_name.clone(),
                            node_name.clone(),
                            *node_aggregate_classification,
                        )
                    });
                aggregate.ensure_variant(
                    origin_dimension_space_point.clone(),
                    NodeVariant {
                        properties: initial_property_values.clone(),
                        references: BTreeMap::new(),
                    },
                );
                aggregate.set_coverage(
                    covered_dimension_space_point.clone(),
                    NodeCoverage {
                        origin: origin_dimension_space_point.clone(),
                        parent: Some(parent_node_aggregate_id.clone()),
                    },
                );
                if let Some(parent) = self.node_aggregates.get_mut(parent_node_aggregate_id) {
                    parent.insert_child(
                        covered_dimension_space_point,
                        node_aggregate_id.clone(),
                        succeeding_sibling_node_aggregate_id.as_ref(),
                    );
                }
            }

            ContentStreamEvent::NodePropertiesWereSet {
                node_aggregate_id,
                origin_dimension_space_point,
                property_values,
                properties_to_unset,
            } => {
                if let Some(variant) = self
                    .node_aggregates
                    .get_mut(node_aggregate_id)
                    .and_then(|a| a.variant_mut(origin_dimension_space_point))
                {
                    variant.properties = variant.properties.merge(property_values);
                    for name in properties_to_unset {
                        variant.properties.remove(name);
                    }
                }
            }

            ContentStreamEvent::NodeReferencesWereSet {
                source_node_aggregate_id,
                affected_source_origin_dimension_space_points,
                reference_name,
                references,
            } => {
                if let Some(aggregate) = self.node_aggregates.get_mut(source_node_aggregate_id) {
                    for origin in affected_source_origin_dimension_space_points {
                        if let Some(variant) = aggregate.variant_mut(origin) {
                            if references.is_empty() {
                                variant.references.remove(reference_name);
                            } else {
                                variant.references.insert(reference_name.clone(), references.clone());
                            }
                        }
                    }
                }
            }

            ContentStreamEvent::NodeAggregateWasMoved {
                node_aggregate_id,
                new_parent_node_aggregate_id,
                succeeding_siblings,
            } => self.apply_move(node_aggregate_id, new_parent_node_aggregate_id.as_ref(), succeeding_siblings),

            ContentStreamEvent::NodeAggregateWasDisabled {
                node_aggregate_id,
                affected_dimension_space_points,
            } => self.set_disabled(node_aggregate_id, affected_dimension_space_points, true),

            ContentStreamEvent::NodeAggregateWasEnabled {
                node_aggregate_id,
                affected_dimension_space_points,
            } => self.set_disabled(node_aggregate_id, affected_dimension_space_points, false),

            ContentStreamEvent::NodeAggregateWasRemoved {
                node_aggregate_id,
                affected_covered_dimension_space_points,
                ..
            } => self.apply_removal(node_aggregate_id, affected_covered_dimension_space_points),

            ContentStreamEvent::NodeAggregateCoverageWasRestored {
                node_aggregate_id,
                source_dimension_space_point,
                affected_covered_dimension_space_points,
                recursive,
            } => {
                for target in affected_covered_dimension_space_points {
                    self.restore_coverage(node_aggregate_id, source_dimension_space_point, target, *recursive);
                }
            }

            ContentStreamEvent::NodeAggregateTypeWasChanged {
                node_aggregate_id,
                new_node_type_name,
            } => {
                if let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) {
                    aggregate.set_node_type_name(new_node_type_name.clone());
                }
            }

            ContentStreamEvent::NodeAggregateNameWasChanged {
                node_aggregate_id,
                new_node_name,
            } => {
                if let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) {
                    aggregate.set_node_name(Some(new_node_name.clone()));
                }
            }

            ContentStreamEvent::NodeSpecializationVariantWasCreated {
                node_aggregate_id,
                source_origin,
                specialization_origin: target_origin,
                specialization_siblings: siblings,
            }
            | ContentStreamEvent::NodeGeneralizationVariantWasCreated {
                node_aggregate_id,
                source_origin,
                generalization_origin: target_origin,
                variant_siblings: siblings,
            }
            | ContentStreamEvent::NodePeerVariantWasCreated {
                node_aggregate_id,
                source_origin,
                peer_origin: target_origin,
                peer_siblings: siblings,
            } => self.apply_variant(node_aggregate_id, source_origin, target_origin, siblings),

            ContentStreamEvent::DimensionSpacePointWasMoved { source, target } => {
                for aggregate in self.node_aggregates.values_mut() {
                    aggregate.move_point(source, target);
                }
            }

            ContentStreamEvent::DimensionShineThroughWasAdded { source, target } => {
                for aggregate in self.node_aggregates.values_mut() {
                    aggregate.add_shine_through(source, target);
                }
            }

            ContentStreamEvent::ContentStreamWasCreated { .. }
            | ContentStreamEvent::ContentStreamWasForked { .. }
            | ContentStreamEvent::ContentStreamWasClosed { .. }
            | ContentStreamEvent::ContentStreamWasReopened { .. }
            | ContentStreamEvent::ContentStreamWasRemoved { .. } => {}
        }
    }

    fn apply_move(
        &mut self,
        node_aggregate_id: &NodeAggregateId,
        new_parent: Option<&NodeAggregateId>,
        succeeding_siblings: &[InterdimensionalSibling],
    ) {
        for sibling in succeeding_siblings {
            let point = &sibling.dimension_space_point;
            let Some(old_parent) = self
                .node_aggregates
                .get(node_aggregate_id)
                .and_then(|a| a.parent_in(point))
                .cloned()
            else {
                continue;
            };
            let parent = new_parent.cloned().unwrap_or_else(|| old_parent.clone());
            if let Some(old) = self.node_aggregates.get_mut(&old_parent) {
                old.remove_child(point, node_aggregate_id);
            }
            if let Some(target) = self.node_aggregates.get_mut(&parent) {
                target.insert_child(point, node_aggregate_id.clone(), sibling.succeeding_sibling.as_ref());
            }
            if let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) {
                aggregate.set_parent(point, Some(parent));
            }
        }
    }

    fn set_disabled(&mut self, node_aggregate_id: &NodeAggregateId, points: &DimensionSpacePointSet, disabled: bool) {
        if let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) {
            for point in points {
                if aggregate.covers(point) {
                    aggregate.set_disabled(point.clone(), disabled);
                }
            }
        }
    }

    fn apply_removal(&mut self, node_aggregate_id: &NodeAggregateId, points: &DimensionSpacePointSet) {
        let mut touched: Vec<NodeAggregateId> = Vec::new();
        for point in points {
            let subtree = self.subtree_in(node_aggregate_id, point);
            if subtree.is_empty() {
                continue;
            }
            let parent = self
                .node_aggregates
                .get(node_aggregate_id)
                .and_then(|a| a.parent_in(point))
                .cloned();
            if let Some(parent) = parent.and_then(|p| self.node_aggregates.get_mut(&p)) {
                parent.remove_child(point, node_aggregate_id);
            }
            for id in subtree {
                if let Some(aggregate) = self.node_aggregates.get_mut(&id) {
                    aggregate.remove_coverage(point);
                }
                touched.push(id);
            }
        }
        for id in touched {
            let now_empty = match self.node_aggregates.get_mut(&id) {
                Some(aggregate) => {
                    aggregate.prune_variants();
                    aggregate.covered_points().is_empty()
                }
                None => false,
            };
            if now_empty {
                self.node_aggregates.remove(&id);
            }
        }
    }

    fn restore_coverage(
        &mut self,
        node_aggregate_id: &NodeAggregateId,
        source: &DimensionSpacePoint,
        target: &DimensionSpacePoint,
        recursive: bool,
    ) {
        let Some(aggregate) = self.node_aggregates.get(node_aggregate_id) else {
            return;
        };
        let Some(coverage) = aggregate.coverage_at(source).cloned() else {
            return;
        };
        let source_children: Vec<NodeAggregateId> = aggregate.children_in(source).to_vec();

        if !aggregate.covers(target) {
            let succeeding = coverage.parent.as_ref().and_then(|parent| {
                self.following_sibling_present_in(parent, node_aggregate_id, source, target)
            });
            if let Some(parent) = coverage.parent.as_ref().and_then(|p| self.node_aggregates.get_mut(p)) {
                parent.insert_child(target, node_aggregate_id.clone(), succeeding.as_ref());
            }
            if let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) {
                aggregate.set_coverage(target.clone(), coverage);
            }
        }

        if recursive {
            for child in source_children {
                self.restore_coverage(&child, source, target, true);
            }
        }
    }

    /// First sibling after `child` in `source` order that already hangs below `parent` in `target`.
    fn following_sibling_present_in(
        &self,
        parent: &NodeAggregateId,
        child: &NodeAggregateId,
        source: &DimensionSpacePoint,
        target: &DimensionSpacePoint,
    ) -> Option<NodeAggregateId> {
        let candidates = self.succeeding_siblings_in(parent, child, source);
        self.first_child_among(parent, target, &candidates)
    }

    fn apply_variant(
        &mut self,
        node_aggregate_id: &NodeAggregateId,
        source_origin: &OriginDimensionSpacePoint,
        target_origin: &OriginDimensionSpacePoint,
        siblings: &[InterdimensionalSibling],
    ) {
        let Some(aggregate) = self.node_aggregates.get_mut(node_aggregate_id) else {
            return;
        };
        let Some(source_variant) = aggregate.variant(source_origin).cloned() else {
            return;
        };
        let parent = aggregate.parent_of_variant(source_origin).cloned();
        aggregate.ensure_variant(target_origin.clone(), source_variant);

        let mut newly_covered = Vec::new();
        for sibling in siblings {
            let point = &sibling.dimension_space_point;
            if aggregate.covers(point) {
                aggregate.set_covering_origin(point, target_origin.clone());
            } else {
                aggregate.set_coverage(
                    point.clone(),
                    NodeCoverage {
                        origin: target_origin.clone(),
                        parent: parent.clone(),
                    },
                );
                newly_covered.push(sibling);
            }
        }
        aggregate.prune_variants();

        if let Some(parent) = parent.and_then(|p| self.node_aggregates.get_mut(&p)) {
            for sibling in newly_covered {
                parent.insert_child(
                    &sibling.dimension_space_point,
                    node_aggregate_id.clone(),
                    sibling.succeeding_sibling.as_ref(),
                );
            }
        }
    }
}

fn root_coverage() -> NodeCoverage {
    NodeCoverage {
        origin: OriginDimensionSpacePoint::empty(),
        parent: None,
    }
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod tests;
