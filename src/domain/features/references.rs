//! Reference replacement.

use super::constraints::{require_node_aggregate_to_occupy, require_node_type};
use super::HandlerResult;
use crate::domain::cqrs::commands::SetNodeReferences;
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::services::ContentRepositoryServices;

impl ContentStreamData {
    /// Replaces the whole reference set `reference_name` of one variant.
    /// An empty list clears it.
    pub(crate) fn handle_set_node_references(
        &self,
        command: SetNodeReferences,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let source = self.require_node_aggregate(&command.source_node_aggregate_id)?;
        require_node_aggregate_to_occupy(source, &command.source_origin_dimension_space_point)?;
        let source_type = require_node_type(services, source.node_type_name())?;

        let cannot_be_set = |reason: String| ContentRepositoryError::ReferenceCannotBeSet {
            reference_name: command.reference_name.clone(),
            node_type_name: source_type.name().clone(),
            reason,
        };

        let declaration = source_type
            .reference(&command.reference_name)
            .ok_or_else(|| cannot_be_set("the reference is not declared".to_string()))?;

        if let Some(max_items) = declaration.constraints.max_items {
            if command.references.len() > max_items {
                return Err(cannot_be_set(format!(
                    "{} references exceed the maximum of {}",
                    command.references.len(),
                    max_items
                )));
            }
        }

        for reference in &command.references {
            let target = self.require_node_aggregate(&reference.target_node_aggregate_id)?;
            let target_type = require_node_type(services, target.node_type_name())?;
            if !source_type.allows_reference_target(&command.reference_name, target_type) {
                return Err(cannot_be_set(format!(
                    "targets of type '{}' are not allowed",
                    target_type.name()
                )));
            }
        }

        Ok(vec![ContentStreamEvent::NodeReferencesWereSet {
            source_node_aggregate_id: command.source_node_aggregate_id,
            affected_source_origin_dimension_space_points: vec![command.source_origin_dimension_space_point],
            reference_name: command.reference_name,
            references: command.references,
        }])
    }
}

#[cfg(test)]
#[path = "tests/references_tests.rs"]
mod tests;
