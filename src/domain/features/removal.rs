//! Structural removal of node aggregates.

use super::constraints::{require_node_aggregate_to_be_untethered, require_node_aggregate_to_cover};
use super::HandlerResult;
use crate::dimension::OriginDimensionSpacePoint;
use crate::domain::cqrs::commands::RemoveNodeAggregate;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::services::ContentRepositoryServices;

impl ContentStreamData {
    /// Removes the aggregate and, transitively, its descendants from the
    /// points the selection strategy resolves to.
    pub(crate) fn handle_remove_node_aggregate(
        &self,
        command: RemoveNodeAggregate,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let point = &command.covered_dimension_space_point;
        services.variation_graph.require_allowed(point)?;
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_be_untethered(aggregate)?;
        require_node_aggregate_to_cover(aggregate, point)?;
        if let Some(attachment_point) = &command.removal_attachment_point {
            self.require_node_aggregate(attachment_point)?;
        }

        let affected_covered = command
            .node_variant_selection_strategy
            .resolve_affected_points(point, aggregate, &services.variation_graph);
        let affected_occupied: Vec<OriginDimensionSpacePoint> = aggregate
            .occupied_origins()
            .filter(|o| affected_covered.contains(o.as_dimension_space_point()))
            .cloned()
            .collect();

        Ok(vec![ContentStreamEvent::NodeAggregateWasRemoved {
            node_aggregate_id: command.node_aggregate_id,
            affected_occupied_dimension_space_points: affected_occupied,
            affected_covered_dimension_space_points: affected_covered,
            removal_attachment_point: command.removal_attachment_point,
        }])
    }
}
