//! Changing a node aggregate's type or name.

use super::constraints::{
    require_node_aggregate_to_be_untethered, require_node_aggregate_to_not_be_root, require_node_type,
    require_node_type_to_not_be_abstract, require_node_type_to_not_be_of_type_root,
};
use super::creation::{complete_tethered_ids, tethered_child_events, tethered_children_events, TetheredScope};
use super::HandlerResult;
use crate::dimension::DimensionSpacePointSet;
use crate::domain::cqrs::commands::{ChangeNodeAggregateName, ChangeNodeAggregateType};
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::node_aggregate::NodeAggregate;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::strategies::NodeAggregateTypeChangeConflictResolutionStrategy;
use crate::node_type::NodeType;

impl ContentStreamData {
    /// Switches the aggregate to a new node type. Children the new type does
    /// not allow either fail the command or are removed, depending on the
    /// strategy. Tethered children the new type declares are created.
    pub(crate) fn handle_change_node_aggregate_type(
        &self,
        command: ChangeNodeAggregateType,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_not_be_root(aggregate)?;
        let new_type = require_node_type(services, &command.new_node_type_name)?;
        require_node_type_to_not_be_abstract(new_type)?;
        require_node_type_to_not_be_of_type_root(new_type)?;
        for parent in self.graph().parent_aggregates(aggregate.id()) {
            self.require_constraints_imposed_by_ancestors(services, new_type, aggregate.node_name(), parent.id())?;
        }

        let mut events = Vec::new();
        let conflicts = self.conflicting_children(services, aggregate, new_type);
        if !conflicts.is_empty() {
            match command.strategy {
                NodeAggregateTypeChangeConflictResolutionStrategy::HappyPath => {
                    let names: Vec<String> = conflicts.iter().map(|c| c.id().to_string()).collect();
                    return Err(ContentRepositoryError::NodeConstraintViolation {
                        message: format!(
                            "node type '{}' does not allow the existing children {}",
                            new_type.name(),
                            names.join(", ")
                        ),
                    });
                }
                NodeAggregateTypeChangeConflictResolutionStrategy::Delete => {
                    for child in conflicts {
                        events.push(ContentStreamEvent::NodeAggregateWasRemoved {
                            node_aggregate_id: child.id().clone(),
                            affected_occupied_dimension_space_points: child.occupied_origins().cloned().collect(),
                            affected_covered_dimension_space_points: child.covered_points(),
                            removal_attachment_point: None,
                        });
                    }
                }
            }
        }

        events.push(ContentStreamEvent::NodeAggregateTypeWasChanged {
            node_aggregate_id: command.node_aggregate_id.clone(),
            new_node_type_name: command.new_node_type_name.clone(),
        });

        let ids = complete_tethered_ids(
            &services.node_types,
            new_type,
            aggregate.id(),
            command.tethered_descendant_node_aggregate_ids,
            "",
        );
        for (child_name, declaration) in new_type.tethered_nodes() {
            if self.graph().tethered_child(aggregate.id(), child_name).is_some() {
                continue;
            }
            let child_type = services.node_types.require(&declaration.node_type.as_str().into())?;
            let Some(child_id) = ids.get(child_name.as_str()) else {
                continue;
            };
            for origin in aggregate.occupied_origins() {
                let covered = aggregate.coverage_by_origin(origin);
                let scope = TetheredScope {
                    origin,
                    covered: &covered,
                    ids: &ids,
                };
                events.extend(tethered_child_events(child_type, &scope, aggregate.id(), child_name, child_id));
                tethered_children_events(
                    &services.node_types,
                    child_type,
                    &scope,
                    child_id,
                    Some(child_name.as_str()),
                    &mut events,
                )?;
            }
        }
        Ok(events)
    }

    /// Children that cannot stay below the aggregate once it has `new_type`:
    /// regular children of a disallowed type, tethered children the new type
    /// no longer declares, and grandchildren below a tethered child that the
    /// new type restricts.
    fn conflicting_children<'g>(
        &'g self,
        services: &ContentRepositoryServices,
        aggregate: &NodeAggregate,
        new_type: &NodeType,
    ) -> Vec<&'g NodeAggregate> {
        let mut conflicts = Vec::new();
        for child in self.graph().child_aggregates(aggregate.id()) {
            let Some(child_type) = services.node_types.get(child.node_type_name()) else {
                continue;
            };
            if child.is_tethered() {
                let declared = child.node_name().and_then(|n| new_type.type_of_tethered_node(n));
                match (declared, child.node_name()) {
                    (Some(declared), Some(child_name)) if declared == *child.node_type_name() => {
                        for grandchild in self.graph().child_aggregates(child.id()) {
                            if grandchild.is_tethered() {
                                continue;
                            }
                            let allowed = services
                                .node_types
                                .get(grandchild.node_type_name())
                                .is_some_and(|t| new_type.allows_grandchild_node_type(child_name, t));
                            if !allowed {
                                conflicts.push(grandchild);
                            }
                        }
                    }
                    _ => conflicts.push(child),
                }
            } else if !new_type.allows_child_node_type(child_type) {
                conflicts.push(child);
            }
        }
        conflicts
    }

    pub(crate) fn handle_change_node_aggregate_name(&self, command: ChangeNodeAggregateName) -> HandlerResult {
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_not_be_root(aggregate)?;
        require_node_aggregate_to_be_untethered(aggregate)?;
        for parent in self.graph().parent_aggregates(aggregate.id()) {
            let points = DimensionSpacePointSet::new(
                aggregate
                    .covered_points()
                    .iter()
                    .filter(|p| aggregate.parent_in(p) == Some(parent.id()))
                    .cloned(),
            );
            self.require_node_name_to_be_uncovered(&command.new_node_name, parent.id(), &points, Some(aggregate.id()))?;
        }
        Ok(vec![ContentStreamEvent::NodeAggregateNameWasChanged {
            node_aggregate_id: command.node_aggregate_id,
            new_node_name: command.new_node_name,
        }])
    }
}

#[cfg(test)]
#[path = "tests/type_change_tests.rs"]
mod tests;
