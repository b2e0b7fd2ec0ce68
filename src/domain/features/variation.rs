//! Node variants: specializations, generalizations and peers of an origin.

use super::constraints::{
    require_node_aggregate_to_cover, require_node_aggregate_to_not_be_root, require_node_aggregate_to_not_occupy,
    require_node_aggregate_to_occupy,
};
use super::HandlerResult;
use crate::dimension::{
    DimensionSpacePointSet, InterDimensionalVariationGraph, OriginDimensionSpacePoint, VariantType,
};
use crate::domain::cqrs::commands::CreateNodeVariant;
use crate::domain::cqrs::events::InterdimensionalSibling;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::graph::ContentGraph;
use crate::domain::node_aggregate::NodeAggregate;
use crate::domain::services::ContentRepositoryServices;

impl ContentStreamData {
    /// Creates a variant at `target_origin` from the content at `source_origin`.
    /// Tethered descendants are varied along.
    pub(crate) fn handle_create_node_variant(
        &self,
        command: CreateNodeVariant,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let variation_graph = &services.variation_graph;
        let source_point = command.source_origin.as_dimension_space_point();
        let target_point = command.target_origin.as_dimension_space_point();
        variation_graph.require_allowed(source_point)?;
        variation_graph.require_allowed(target_point)?;
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_not_be_root(aggregate)?;
        require_node_aggregate_to_occupy(aggregate, &command.source_origin)?;
        require_node_aggregate_to_not_occupy(aggregate, &command.target_origin)?;

        let parent = match aggregate.parent_of_variant(&command.source_origin) {
            Some(parent_id) => self.require_node_aggregate(parent_id)?,
            None => {
                return Err(ContentRepositoryError::NodeConstraintViolation {
                    message: format!("'{}' has no parent at {}", aggregate.id(), command.source_origin),
                })
            }
        };
        require_node_aggregate_to_cover(parent, target_point)?;

        let variant_type = variation_graph.variant_type(target_point, source_point);
        let visibility = effective_visibility(variation_graph, &command.target_origin, aggregate)
            .intersect(&parent.covered_points());

        let mut events = Vec::new();
        collect_variant_events(
            self.graph(),
            &VariantRequest {
                variant_type,
                source_origin: &command.source_origin,
                target_origin: &command.target_origin,
                visibility: &visibility,
            },
            aggregate,
            parent.id(),
            &mut events,
        );
        Ok(events)
    }
}

struct VariantRequest<'a> {
    variant_type: VariantType,
    source_origin: &'a OriginDimensionSpacePoint,
    target_origin: &'a OriginDimensionSpacePoint,
    visibility: &'a DimensionSpacePointSet,
}

fn collect_variant_events(
    graph: &ContentGraph,
    request: &VariantRequest<'_>,
    aggregate: &NodeAggregate,
    parent_id: &crate::domain::types::NodeAggregateId,
    events: &mut Vec<ContentStreamEvent>,
) {
    let source_point = request.source_origin.as_dimension_space_point();
    let origin_siblings = graph.succeeding_siblings_in(parent_id, aggregate.id(), source_point);
    let siblings: Vec<InterdimensionalSibling> = request
        .visibility
        .iter()
        .map(|point| {
            InterdimensionalSibling::new(
                point.clone(),
                graph.first_child_among(parent_id, point, &origin_siblings),
            )
        })
        .collect();

    let node_aggregate_id = aggregate.id().clone();
    let source_origin = request.source_origin.clone();
    let target_origin = request.target_origin.clone();
    events.push(match request.variant_type {
        VariantType::Specialization => ContentStreamEvent::NodeSpecializationVariantWasCreated {
            node_aggregate_id,
            source_origin,
            specialization_origin: target_origin,
            specialization_siblings: siblings,
        },
        VariantType::Generalization => ContentStreamEvent::NodeGeneralizationVariantWasCreated {
            node_aggregate_id,
            source_origin,
            generalization_origin: target_origin,
            variant_siblings: siblings,
        },
        VariantType::Peer | VariantType::Same => ContentStreamEvent::NodePeerVariantWasCreated {
            node_aggregate_id,
            source_origin,
            peer_origin: target_origin,
            peer_siblings: siblings,
        },
    });

    for child in graph.child_aggregates(aggregate.id()) {
        if child.is_tethered() && child.occupies(request.source_origin) && !child.occupies(request.target_origin) {
            collect_variant_events(graph, request, child, aggregate.id(), events);
        }
    }
}

/// The target's specialization set, minus everything already claimed by
/// variants the aggregate occupies at more specialized points.
pub(crate) fn effective_visibility(
    variation_graph: &InterDimensionalVariationGraph,
    target_origin: &OriginDimensionSpacePoint,
    aggregate: &NodeAggregate,
) -> DimensionSpacePointSet {
    let target = target_origin.as_dimension_space_point();
    let mut excluded = DimensionSpacePointSet::empty();
    for occupied in aggregate.occupied_origins() {
        let point = occupied.as_dimension_space_point();
        if variation_graph.is_specialization_of(point, target) {
            excluded = excluded.union(&variation_graph.specialization_set(point, true, &DimensionSpacePointSet::empty()));
        }
    }
    variation_graph.specialization_set(target, true, &excluded)
}
