//! The node aggregate: one logical node across all its dimension variants
//! within one content stream.
//!
//! A node aggregate occupies a set of origin points, each holding one variant
//! (properties and references). Every covered point is covered by exactly one
//! variant and records the parent aggregate in that point. The ordered child
//! list per covered point lives on the parent.

use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::properties::{NodeReference, SerializedPropertyValues};
use crate::domain::types::{
    NodeAggregateClassification, NodeAggregateId, NodeName, NodeTypeName, ReferenceName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content authored at one origin point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeVariant {
    pub properties: SerializedPropertyValues,
    #[serde(default)]
    pub references: BTreeMap<ReferenceName, Vec<NodeReference>>,
}

/// Which variant covers a point, and where it hangs in that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCoverage {
    pub origin: OriginDimensionSpacePoint,
    pub parent: Option<NodeAggregateId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregate {
    id: NodeAggregateId,
    node_type_name: NodeTypeName,
    node_name: Option<NodeName>,
    classification: NodeAggregateClassification,
    #[serde(with = "crate::domain::serde_pairs")]
    variants: BTreeMap<OriginDimensionSpacePoint, NodeVariant>,
    #[serde(with = "crate::domain::serde_pairs")]
    coverage: BTreeMap<DimensionSpacePoint, NodeCoverage>,
    #[serde(with = "crate::domain::serde_pairs")]
    children: BTreeMap<DimensionSpacePoint, Vec<NodeAggregateId>>,
    disabled: DimensionSpacePointSet,
}

impl NodeAggregate {
    pub(crate) fn new(
        id: NodeAggregateId,
        node_type_name: NodeTypeName,
        node_name: Option<NodeName>,
        classification: NodeAggregateClassification,
    ) -> Self {
        Self {
            id,
            node_type_name,
            node_name,
            classification,
            variants: BTreeMap::new(),
            coverage: BTreeMap::new(),
            children: BTreeMap::new(),
            disabled: DimensionSpacePointSet::empty(),
        }
    }

    // ===== Accessors =====

    pub fn id(&self) -> &NodeAggregateId {
        &self.id
    }

    pub fn node_type_name(&self) -> &NodeTypeName {
        &self.node_type_name
    }

    pub fn node_name(&self) -> Option<&NodeName> {
        self.node_name.as_ref()
    }

    pub fn classification(&self) -> NodeAggregateClassification {
        self.classification
    }

    pub fn is_root(&self) -> bool {
        self.classification == NodeAggregateClassification::Root
    }

    pub fn is_tethered(&self) -> bool {
        self.classification == NodeAggregateClassification::Tethered
    }

    pub fn occupied_origins(&self) -> impl Iterator<Item = &OriginDimensionSpacePoint> {
        self.variants.keys()
    }

    pub fn occupies(&self, origin: &OriginDimensionSpacePoint) -> bool {
        self.variants.contains_key(origin)
    }

    pub fn variant(&self, origin: &OriginDimensionSpacePoint) -> Option<&NodeVariant> {
        self.variants.get(origin)
    }

    pub fn variants(&self) -> impl Iterator<Item = (&OriginDimensionSpacePoint, &NodeVariant)> {
        self.variants.iter()
    }

    pub fn covers(&self, point: &DimensionSpacePoint) -> bool {
        self.coverage.contains_key(point)
    }

    pub fn covered_points(&self) -> DimensionSpacePointSet {
        self.coverage.keys().cloned().collect()
    }

    /// Points covered by the variant at `origin`.
    pub fn coverage_by_origin(&self, origin: &OriginDimensionSpacePoint) -> DimensionSpacePointSet {
        self.coverage
            .iter()
            .filter(|(_, c)| &c.origin == origin)
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn coverage_at(&self, point: &DimensionSpacePoint) -> Option<&NodeCoverage> {
        self.coverage.get(point)
    }

    pub fn origin_covering(&self, point: &DimensionSpacePoint) -> Option<&OriginDimensionSpacePoint> {
        self.coverage.get(point).map(|c| &c.origin)
    }

    pub fn variant_covering(&self, point: &DimensionSpacePoint) -> Option<&NodeVariant> {
        self.origin_covering(point).and_then(|o| self.variants.get(o))
    }

    pub fn parent_in(&self, point: &DimensionSpacePoint) -> Option<&NodeAggregateId> {
        self.coverage.get(point).and_then(|c| c.parent.as_ref())
    }

    /// Parent of the variant at `origin`: taken at the origin point itself if
    /// covered there, otherwise at the first point the variant covers.
    pub fn parent_of_variant(&self, origin: &OriginDimensionSpacePoint) -> Option<&NodeAggregateId> {
        if let Some(coverage) = self.coverage.get(origin.as_dimension_space_point()) {
            if &coverage.origin == origin {
                return coverage.parent.as_ref();
            }
        }
        self.coverage
            .values()
            .find(|c| &c.origin == origin)
            .and_then(|c| c.parent.as_ref())
    }

    /// Distinct parents across all covered points.
    pub fn parents(&self) -> Vec<&NodeAggregateId> {
        let mut parents: Vec<&NodeAggregateId> =
            self.coverage.values().filter_map(|c| c.parent.as_ref()).collect();
        parents.sort();
        parents.dedup();
        parents
    }

    pub fn children_in(&self, point: &DimensionSpacePoint) -> &[NodeAggregateId] {
        self.children.get(point).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_disabled_in(&self, point: &DimensionSpacePoint) -> bool {
        self.disabled.contains(point)
    }

    pub fn disabled_points(&self) -> &DimensionSpacePointSet {
        &self.disabled
    }

    // ===== Mutation (event application only) =====

    pub(crate) fn set_node_type_name(&mut self, node_type_name: NodeTypeName) {
        self.node_type_name = node_type_name;
    }

    pub(crate) fn set_node_name(&mut self, node_name: Option<NodeName>) {
        self.node_name = node_name;
    }

    pub(crate) fn variant_mut(&mut self, origin: &OriginDimensionSpacePoint) -> Option<&mut NodeVariant> {
        self.variants.get_mut(origin)
    }

    pub(crate) fn ensure_variant(&mut self, origin: OriginDimensionSpacePoint, variant: NodeVariant) {
        self.variants.entry(origin).or_insert(variant);
    }

    pub(crate) fn set_coverage(&mut self, point: DimensionSpacePoint, coverage: NodeCoverage) {
        self.coverage.insert(point, coverage);
    }

    pub(crate) fn set_parent(&mut self, point: &DimensionSpacePoint, parent: Option<NodeAggregateId>) {
        if let Some(coverage) = self.coverage.get_mut(point) {
            coverage.parent = parent;
        }
    }

    pub(crate) fn set_covering_origin(&mut self, point: &DimensionSpacePoint, origin: OriginDimensionSpacePoint) {
        if let Some(coverage) = self.coverage.get_mut(point) {
            coverage.origin = origin;
        }
    }

    /// Drops coverage, child order and disabled state at `point`.
    pub(crate) fn remove_coverage(&mut self, point: &DimensionSpacePoint) {
        self.coverage.remove(point);
        self.children.remove(point);
        self.disabled.remove(point);
    }

    /// Drops variants that no longer cover any point.
    pub(crate) fn prune_variants(&mut self) -> Vec<OriginDimensionSpacePoint> {
        let used: Vec<&OriginDimensionSpacePoint> = self.coverage.values().map(|c| &c.origin).collect();
        let orphaned: Vec<OriginDimensionSpacePoint> = self
            .variants
            .keys()
            .filter(|o| !used.contains(o))
            .cloned()
            .collect();
        for origin in &orphaned {
            self.variants.remove(origin);
        }
        orphaned
    }

    /// Inserts `child` before `succeeding_sibling` (or last when absent or not found).
    pub(crate) fn insert_child(
        &mut self,
        point: &DimensionSpacePoint,
        child: NodeAggregateId,
        succeeding_sibling: Option<&NodeAggregateId>,
    ) {
        let children = self.children.entry(point.clone()).or_default();
        children.retain(|c| c != &child);
        let position = succeeding_sibling
            .and_then(|s| children.iter().position(|c| c == s))
            .unwrap_or(children.len());
        children.insert(position, child);
    }

    pub(crate) fn remove_child(&mut self, point: &DimensionSpacePoint, child: &NodeAggregateId) {
        if let Some(children) = self.children.get_mut(point) {
            children.retain(|c| c != child);
            if children.is_empty() {
                self.children.remove(point);
            }
        }
    }

    pub(crate) fn set_disabled(&mut self, point: DimensionSpacePoint, disabled: bool) {
        if disabled {
            self.disabled.insert(point);
        } else {
            self.disabled.remove(&point);
        }
    }

    /// Renames `source` to `target` in variants, coverage, child order and disabled state.
    pub(crate) fn move_point(&mut self, source: &DimensionSpacePoint, target: &DimensionSpacePoint) {
        let source_origin = OriginDimensionSpacePoint::from(source);
        if let Some(variant) = self.variants.remove(&source_origin) {
            self.variants.insert(OriginDimensionSpacePoint::from(target), variant);
        }
        for coverage in self.coverage.values_mut() {
            if coverage.origin == source_origin {
                coverage.origin = OriginDimensionSpacePoint::from(target);
            }
        }
        if let Some(coverage) = self.coverage.remove(source) {
            self.coverage.insert(target.clone(), coverage);
        }
        if let Some(children) = self.children.remove(source) {
            self.children.insert(target.clone(), children);
        }
        if self.disabled.remove(source) {
            self.disabled.insert(target.clone());
        }
    }

    /// Makes everything visible at `source` visible at `target` as well.
    pub(crate) fn add_shine_through(&mut self, source: &DimensionSpacePoint, target: &DimensionSpacePoint) {
        if let Some(coverage) = self.coverage.get(source).cloned() {
            self.coverage.insert(target.clone(), coverage);
        }
        if let Some(children) = self.children.get(source).cloned() {
            self.children.insert(target.clone(), children);
        }
        if self.disabled.contains(source) {
            self.disabled.insert(target.clone());
        }
    }
}
