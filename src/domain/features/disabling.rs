//! Disabling and enabling node aggregates.
//!
//! Disabled state is a per covered point flag. It hides the node and its
//! descendants in subgraphs but changes neither structure nor properties.

use super::constraints::require_node_aggregate_to_cover;
use super::HandlerResult;
use crate::domain::cqrs::commands::ToggleNodeAggregate;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::services::ContentRepositoryServices;

impl ContentStreamData {
    pub(crate) fn handle_disable_node_aggregate(
        &self,
        command: ToggleNodeAggregate,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        self.toggle_node_aggregate(command, services, true)
    }

    pub(crate) fn handle_enable_node_aggregate(
        &self,
        command: ToggleNodeAggregate,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        self.toggle_node_aggregate(command, services, false)
    }

    fn toggle_node_aggregate(
        &self,
        command: ToggleNodeAggregate,
        services: &ContentRepositoryServices,
        disable: bool,
    ) -> HandlerResult {
        let point = &command.covered_dimension_space_point;
        services.variation_graph.require_allowed(point)?;
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_cover(aggregate, point)?;

        let affected = command
            .node_variant_selection_strategy
            .resolve_affected_points(point, aggregate, &services.variation_graph);

        // Nothing to do when every affected point is already in the requested state.
        if affected.iter().all(|p| aggregate.is_disabled_in(p) == disable) {
            return Ok(Vec::new());
        }

        let event = if disable {
            ContentStreamEvent::NodeAggregateWasDisabled {
                node_aggregate_id: command.node_aggregate_id,
                affected_dimension_space_points: affected,
            }
        } else {
            ContentStreamEvent::NodeAggregateWasEnabled {
                node_aggregate_id: command.node_aggregate_id,
                affected_dimension_space_points: affected,
            }
        };
        Ok(vec![event])
    }
}
