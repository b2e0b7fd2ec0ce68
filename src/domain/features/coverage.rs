//! Restoring lost coverage, e.g. after a dimension value was added.

use super::constraints::{require_node_aggregate_to_cover, require_node_aggregate_to_occupy};
use super::HandlerResult;
use crate::dimension::DimensionSpacePointSet;
use crate::domain::cqrs::commands::RestoreNodeAggregateCoverage;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::services::ContentRepositoryServices;

impl ContentStreamData {
    pub(crate) fn handle_restore_coverage(
        &self,
        command: RestoreNodeAggregateCoverage,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let graph = &services.variation_graph;
        let target = &command.dimension_space_point_to_cover;
        let source = command.origin_dimension_space_point.as_dimension_space_point();
        graph.require_allowed(target)?;
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_occupy(aggregate, &command.origin_dimension_space_point)?;
        require_node_aggregate_to_cover(aggregate, source)?;

        if aggregate.covers(target) {
            return Err(ContentRepositoryError::NodeConstraintViolation {
                message: format!("'{}' already covers {}", aggregate.id(), target),
            });
        }
        if !graph.is_specialization_of(target, source) {
            return Err(ContentRepositoryError::NodeConstraintViolation {
                message: format!("{} is no specialization of {}", target, source),
            });
        }

        let parent = match aggregate.parent_in(source) {
            Some(parent_id) => Some(self.require_node_aggregate(parent_id)?),
            None => None,
        };
        if let Some(parent) = parent {
            require_node_aggregate_to_cover(parent, target)?;
        }

        let mut affected = DimensionSpacePointSet::single(target.clone());
        if command.with_specializations {
            for specialization in graph.specializations(target) {
                let parent_covers = match parent {
                    Some(p) => p.covers(specialization),
                    None => true,
                };
                if !aggregate.covers(specialization) && parent_covers {
                    affected.insert(specialization.clone());
                }
            }
        }

        Ok(vec![ContentStreamEvent::NodeAggregateCoverageWasRestored {
            node_aggregate_id: command.node_aggregate_id,
            source_dimension_space_point: source.clone(),
            affected_covered_dimension_space_points: affected,
            recursive: command.recursive,
        }])
    }
}
