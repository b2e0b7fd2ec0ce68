//! Adjusting stored content after the dimension configuration changed.

use super::HandlerResult;
use crate::dimension::DimensionSpacePoint;
use crate::domain::cqrs::commands::DimensionAdjustment;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::services::ContentRepositoryServices;

impl ContentStreamData {
    /// Renames a point, e.g. after a dimension value was renamed.
    pub(crate) fn handle_move_dimension_space_point(
        &self,
        command: DimensionAdjustment,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        services.variation_graph.require_allowed(&command.target)?;
        self.require_dimension_space_point_to_be_unused(&command.target)?;
        Ok(vec![ContentStreamEvent::DimensionSpacePointWasMoved {
            source: command.source,
            target: command.target,
        }])
    }

    /// Lets the content at `source` shine through to its new specialization `target`.
    pub(crate) fn handle_add_dimension_shine_through(
        &self,
        command: DimensionAdjustment,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let graph = &services.variation_graph;
        graph.require_allowed(&command.source)?;
        graph.require_allowed(&command.target)?;
        self.require_dimension_space_point_to_be_unused(&command.target)?;
        if !graph.is_specialization_of(&command.target, &command.source) {
            return Err(ContentRepositoryError::NodeConstraintViolation {
                message: format!("{} is no specialization of {}", command.target, command.source),
            });
        }
        Ok(vec![ContentStreamEvent::DimensionShineThroughWasAdded {
            source: command.source,
            target: command.target,
        }])
    }

    fn require_dimension_space_point_to_be_unused(
        &self,
        point: &DimensionSpacePoint,
    ) -> Result<(), ContentRepositoryError> {
        if self.graph().node_aggregates().any(|a| a.covers(point)) {
            return Err(ContentRepositoryError::DimensionSpacePointAlreadyInUse {
                dimension_space_point: point.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/dimension_adjustment_tests.rs"]
mod tests;
