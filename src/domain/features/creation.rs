//! Root and regular node aggregate creation, including tethered descendants.

use super::constraints::{
    require_node_type, require_node_aggregate_to_cover, require_node_type_to_be_of_type_root,
    require_node_type_to_not_be_abstract, require_node_type_to_not_be_of_type_root,
};
use super::modification::serialize_property_values;
use super::HandlerResult;
use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::cqrs::commands::{
    CreateNodeAggregateWithNode, CreateRootNodeAggregateWithNode, UpdateRootNodeAggregateDimensions,
};
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::graph::ContentGraph;
use crate::domain::properties::{SerializedPropertyValue, SerializedPropertyValues};
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::{NodeAggregateClassification, NodeAggregateId, NodeAggregateIdsByNodePaths, NodeName};
use crate::node_type::{NodeType, NodeTypeManager};

impl ContentStreamData {
    pub(crate) fn handle_create_root_node_aggregate(
        &self,
        command: CreateRootNodeAggregateWithNode,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        self.require_node_aggregate_to_not_exist(&command.node_aggregate_id)?;
        let node_type = require_node_type(services, &command.node_type_name)?;
        require_node_type_to_be_of_type_root(node_type)?;
        if let Some(existing) = self.graph().node_aggregates_of_type(&command.node_type_name).next() {
            return Err(ContentRepositoryError::NodeAggregateCurrentlyExists {
                node_aggregate_id: existing.id().clone(),
            });
        }

        let mut events = vec![ContentStreamEvent::RootNodeAggregateWithNodeWasCreated {
            node_aggregate_id: command.node_aggregate_id.clone(),
            node_type_name: command.node_type_name,
            covered_dimension_space_points: services.variation_graph.allowed_subspace(),
        }];

        // Tethered children of a root hang below it once per root generalization.
        for root_point in services.variation_graph.root_generalizations() {
            let origin = OriginDimensionSpacePoint::from(root_point);
            let covered = services
                .variation_graph
                .specialization_set(root_point, true, &DimensionSpacePointSet::empty());
            tethered_children_events(
                &services.node_types,
                node_type,
                &TetheredScope {
                    origin: &origin,
                    covered: &covered,
                    ids: &NodeAggregateIdsByNodePaths::default(),
                },
                &command.node_aggregate_id,
                None,
                &mut events,
            )?;
        }
        Ok(events)
    }

    pub(crate) fn handle_update_root_node_aggregate_dimensions(
        &self,
        command: UpdateRootNodeAggregateDimensions,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        if !aggregate.is_root() {
            return Err(ContentRepositoryError::NodeConstraintViolation {
                message: format!("'{}' is not a root node aggregate", aggregate.id()),
            });
        }
        Ok(vec![ContentStreamEvent::RootNodeAggregateDimensionsWereUpdated {
            node_aggregate_id: command.node_aggregate_id,
            covered_dimension_space_points: services.variation_graph.allowed_subspace(),
        }])
    }

    /// Emits one creation event per covered point: the origin's specializations
    /// that the parent covers.
    pub(crate) fn handle_create_node_aggregate(
        &self,
        command: CreateNodeAggregateWithNode,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let origin_point = command.origin_dimension_space_point.as_dimension_space_point();
        services.variation_graph.require_allowed(origin_point)?;
        let node_type = require_node_type(services, &command.node_type_name)?;
        require_node_type_to_not_be_abstract(node_type)?;
        require_node_type_to_not_be_of_type_root(node_type)?;
        self.require_constraints_imposed_by_ancestors(
            services,
            node_type,
            command.node_name.as_ref(),
            &command.parent_node_aggregate_id,
        )?;
        self.require_node_aggregate_to_not_exist(&command.node_aggregate_id)?;
        let parent = self.require_node_aggregate(&command.parent_node_aggregate_id)?;
        if let Some(sibling) = &command.succeeding_sibling_node_aggregate_id {
            self.require_node_aggregate(sibling)?;
        }
        require_node_aggregate_to_cover(parent, origin_point)?;

        let covered = services
            .variation_graph
            .specialization_set(origin_point, true, &DimensionSpacePointSet::empty())
            .intersect(&parent.covered_points());

        if let Some(node_name) = &command.node_name {
            self.require_node_name_to_be_uncovered(node_name, parent.id(), &covered, None)?;
            if let Some(parent_type) = services.node_types.get(parent.node_type_name()) {
                if parent_type.has_tethered_node(node_name) {
                    return Err(ContentRepositoryError::NodeNameIsAlreadyCovered {
                        node_name: node_name.clone(),
                        parent_node_aggregate_id: parent.id().clone(),
                    });
                }
            }
        }

        let ids = complete_tethered_ids(
            &services.node_types,
            node_type,
            &command.node_aggregate_id,
            command.tethered_descendant_node_aggregate_ids,
            "",
        );
        for (_, id) in ids.iter() {
            self.require_node_aggregate_to_not_exist(id)?;
        }

        let initial_values = default_property_values(node_type)
            .merge(&serialize_property_values(node_type, &command.initial_property_values)?);

        let mut events = Vec::new();
        for point in &covered {
            let succeeding = command.succeeding_sibling_node_aggregate_id.as_ref().and_then(|requested| {
                resolve_succeeding_sibling(self.graph(), parent.id(), requested, origin_point, point)
            });
            events.push(ContentStreamEvent::NodeAggregateWithNodeWasCreated {
                node_aggregate_id: command.node_aggregate_id.clone(),
                node_type_name: command.node_type_name.clone(),
                origin_dimension_space_point: command.origin_dimension_space_point.clone(),
                covered_dimension_space_point: point.clone(),
                parent_node_aggregate_id: parent.id().clone(),
                succeeding_sibling_node_aggregate_id: succeeding,
                node_name: command.node_name.clone(),
                initial_property_values: initial_values.clone(),
                node_aggregate_classification: NodeAggregateClassification::Regular,
            });
        }

        tethered_children_events(
            &services.node_types,
            node_type,
            &TetheredScope {
                origin: &command.origin_dimension_space_point,
                covered: &covered,
                ids: &ids,
            },
            &command.node_aggregate_id,
            None,
            &mut events,
        )?;
        Ok(events)
    }
}

/// Where tethered descendants are created and which ids they get.
pub(crate) struct TetheredScope<'a> {
    pub origin: &'a OriginDimensionSpacePoint,
    pub covered: &'a DimensionSpacePointSet,
    pub ids: &'a NodeAggregateIdsByNodePaths,
}

/// Creation events for every tethered descendant of `node_type`, depth-first.
pub(crate) fn tethered_children_events(
    node_types: &NodeTypeManager,
    node_type: &NodeType,
    scope: &TetheredScope<'_>,
    parent_id: &NodeAggregateId,
    path: Option<&str>,
    events: &mut Vec<ContentStreamEvent>,
) -> Result<(), ContentRepositoryError> {
    for (child_name, declaration) in node_type.tethered_nodes() {
        let child_type = node_types.require(&declaration.node_type.as_str().into())?;
        let child_path = child_path(path, child_name);
        let child_id = scope
            .ids
            .get(&child_path)
            .cloned()
            .unwrap_or_else(|| NodeAggregateId::derived(parent_id, child_name.as_str()));
        events.extend(tethered_child_events(child_type, scope, parent_id, child_name, &child_id));
        tethered_children_events(node_types, child_type, scope, &child_id, Some(&child_path), events)?;
    }
    Ok(())
}

pub(crate) fn tethered_child_events(
    child_type: &NodeType,
    scope: &TetheredScope<'_>,
    parent_id: &NodeAggregateId,
    child_name: &NodeName,
    child_id: &NodeAggregateId,
) -> Vec<ContentStreamEvent> {
    let values = default_property_values(child_type);
    scope
        .covered
        .iter()
        .map(|point| ContentStreamEvent::NodeAggregateWithNodeWasCreated {
            node_aggregate_id: child_id.clone(),
            node_type_name: child_type.name().clone(),
            origin_dimension_space_point: scope.origin.clone(),
            covered_dimension_space_point: point.clone(),
            parent_node_aggregate_id: parent_id.clone(),
            succeeding_sibling_node_aggregate_id: None,
            node_name: Some(child_name.clone()),
            initial_property_values: values.clone(),
            node_aggregate_classification: NodeAggregateClassification::Tethered,
        })
        .collect()
}

/// Fills in a derived id for every tethered path the caller left out.
pub(crate) fn complete_tethered_ids(
    node_types: &NodeTypeManager,
    node_type: &NodeType,
    parent_id: &NodeAggregateId,
    mut ids: NodeAggregateIdsByNodePaths,
    prefix: &str,
) -> NodeAggregateIdsByNodePaths {
    for (child_name, declaration) in node_type.tethered_nodes() {
        let path = child_path((!prefix.is_empty()).then_some(prefix), child_name);
        let child_id = match ids.get(&path) {
            Some(id) => id.clone(),
            None => {
                let id = NodeAggregateId::derived(parent_id, child_name.as_str());
                ids.insert(path.clone(), id.clone());
                id
            }
        };
        if let Some(child_type) = node_types.get(&declaration.node_type.as_str().into()) {
            ids = complete_tethered_ids(node_types, child_type, &child_id, ids, &path);
        }
    }
    ids
}

pub(crate) fn default_property_values(node_type: &NodeType) -> SerializedPropertyValues {
    let mut values = SerializedPropertyValues::new();
    for (name, (value, type_name)) in node_type.default_values() {
        values.insert(name, SerializedPropertyValue::new(value, type_name));
    }
    values
}

/// The requested sibling if it is a sibling in `point`, else the first of
/// its succeeding siblings (in `reference` order) that is.
pub(crate) fn resolve_succeeding_sibling(
    graph: &ContentGraph,
    parent: &NodeAggregateId,
    requested: &NodeAggregateId,
    reference: &DimensionSpacePoint,
    point: &DimensionSpacePoint,
) -> Option<NodeAggregateId> {
    let mut candidates = vec![requested.clone()];
    candidates.extend(graph.succeeding_siblings_in(parent, requested, reference));
    graph.first_child_among(parent, point, &candidates)
}

fn child_path(prefix: Option<&str>, child_name: &NodeName) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix, child_name),
        None => child_name.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/creation_tests.rs"]
mod tests;
