//! Moving node aggregates to a new parent or position.

use super::constraints::{
    require_node_aggregate_to_be_untethered, require_node_aggregate_to_cover, require_node_aggregate_to_cover_all,
    require_node_aggregate_to_not_be_root, require_node_type,
};
use super::HandlerResult;
use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet};
use crate::domain::cqrs::commands::MoveNodeAggregate;
use crate::domain::cqrs::events::InterdimensionalSibling;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::graph::ContentGraph;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::NodeAggregateId;

impl ContentStreamData {
    pub(crate) fn handle_move_node_aggregate(
        &self,
        command: MoveNodeAggregate,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let point = &command.dimension_space_point;
        services.variation_graph.require_allowed(point)?;
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_not_be_root(aggregate)?;
        require_node_aggregate_to_be_untethered(aggregate)?;
        require_node_aggregate_to_cover(aggregate, point)?;

        let affected = command
            .relation_distribution_strategy
            .resolve_affected_points(point, aggregate, &services.variation_graph);

        if let Some(new_parent_id) = &command.new_parent_node_aggregate_id {
            let node_type = require_node_type(services, aggregate.node_type_name())?;
            self.require_constraints_imposed_by_ancestors(services, node_type, aggregate.node_name(), new_parent_id)?;
            let new_parent = self.require_node_aggregate(new_parent_id)?;
            if let Some(node_name) = aggregate.node_name() {
                self.require_node_name_to_be_uncovered(node_name, new_parent_id, &affected, Some(aggregate.id()))?;
                let declares_name = services
                    .node_types
                    .get(new_parent.node_type_name())
                    .is_some_and(|t| t.has_tethered_node(node_name));
                if declares_name {
                    return Err(ContentRepositoryError::NodeNameIsAlreadyCovered {
                        node_name: node_name.clone(),
                        parent_node_aggregate_id: new_parent_id.clone(),
                    });
                }
            }
            require_node_aggregate_to_cover_all(new_parent, &affected)?;
            for affected_point in &affected {
                if self.graph().is_descendant_or_self(new_parent_id, aggregate.id(), affected_point) {
                    return Err(ContentRepositoryError::NodeAggregateIsDescendant {
                        node_aggregate_id: aggregate.id().clone(),
                        new_parent_node_aggregate_id: new_parent_id.clone(),
                    });
                }
            }
        }

        for sibling in [
            &command.new_preceding_sibling_node_aggregate_id,
            &command.new_succeeding_sibling_node_aggregate_id,
        ]
        .into_iter()
        .flatten()
        {
            self.require_node_aggregate(sibling)?;
            match &command.new_parent_node_aggregate_id {
                Some(parent) => self.require_node_aggregate_to_be_child(sibling, parent, point)?,
                None => self.require_node_aggregate_to_be_sibling(aggregate.id(), sibling, point)?,
            }
        }

        let succeeding_siblings = resolve_siblings_for_move(self.graph(), &command, &affected);
        Ok(vec![ContentStreamEvent::NodeAggregateWasMoved {
            node_aggregate_id: command.node_aggregate_id,
            new_parent_node_aggregate_id: command.new_parent_node_aggregate_id,
            succeeding_siblings,
        }])
    }
}

/// Position of the moved node per affected point. The requested siblings are
/// resolved at the selected point first; where they are missing, the closest
/// further sibling present in the variant is used. Points without any usable
/// sibling are only moved (to the end) when the parent changes or no sibling
/// was requested at all.
fn resolve_siblings_for_move(
    graph: &ContentGraph,
    command: &MoveNodeAggregate,
    affected: &DimensionSpacePointSet,
) -> Vec<InterdimensionalSibling> {
    let moved = &command.node_aggregate_id;
    let selected = &command.dimension_space_point;
    let succeeding = command.new_succeeding_sibling_node_aggregate_id.as_ref();
    let preceding = command.new_preceding_sibling_node_aggregate_id.as_ref();
    let complete_set =
        command.new_parent_node_aggregate_id.is_some() || (succeeding.is_none() && preceding.is_none());

    let succeeding_candidates: Vec<NodeAggregateId> = succeeding
        .map(|s| {
            let mut candidates = vec![s.clone()];
            candidates.extend(siblings_at(graph, s, selected, Direction::After));
            candidates.retain(|c| c != moved);
            candidates
        })
        .unwrap_or_default();
    let preceding_candidates: Vec<NodeAggregateId> = preceding
        .map(|p| {
            let mut candidates = vec![p.clone()];
            candidates.extend(siblings_at(graph, p, selected, Direction::Before));
            candidates.retain(|c| c != moved);
            candidates
        })
        .unwrap_or_default();

    let mut siblings = Vec::new();
    for point in affected {
        let parent = command
            .new_parent_node_aggregate_id
            .as_ref()
            .or_else(|| graph.node_aggregate(moved).and_then(|a| a.parent_in(point)));
        let Some(parent) = parent else {
            continue;
        };

        if let Some(sibling) = graph.first_child_among(parent, point, &succeeding_candidates) {
            siblings.push(InterdimensionalSibling::new(point.clone(), Some(sibling)));
            continue;
        }
        if let Some(anchor) = graph.first_child_among(parent, point, &preceding_candidates) {
            let next = graph
                .succeeding_siblings_in(parent, &anchor, point)
                .into_iter()
                .find(|c| c != moved);
            siblings.push(InterdimensionalSibling::new(point.clone(), next));
            continue;
        }
        if complete_set {
            siblings.push(InterdimensionalSibling::new(point.clone(), None));
        }
    }
    siblings
}

enum Direction {
    Before,
    After,
}

/// Siblings of `id` in `point`, closest first.
fn siblings_at(
    graph: &ContentGraph,
    id: &NodeAggregateId,
    point: &DimensionSpacePoint,
    direction: Direction,
) -> Vec<NodeAggregateId> {
    let Some(parent) = graph.node_aggregate(id).and_then(|a| a.parent_in(point)) else {
        return Vec::new();
    };
    match direction {
        Direction::After => graph.succeeding_siblings_in(parent, id, point),
        Direction::Before => {
            let children = graph.children_in(parent, point);
            let mut before: Vec<NodeAggregateId> = children
                .iter()
                .map(|c| c.id().clone())
                .take_while(|c| c != id)
                .collect();
            before.reverse();
            before
        }
    }
}
