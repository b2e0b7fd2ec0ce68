//! Executes a migration: every step reads the source workspace's content and
//! writes the derived commands to the target workspace.

use super::config::{MigrationConfiguration, MigrationStepConfiguration};
use super::filters::Filter;
use super::registry::{build_filter, build_transformation};
use super::transformations::{
    GlobalTransformation, NodeAggregateTransformation, NodeTransformation, NodeVariantContext, Transformation,
};
use crate::domain::cqrs::commands::{CommandContext, ContentStreamCommand};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::graph::ContentGraph;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::{ContentStreamId, WorkspaceName};
use crate::domain::CommandResult;
use crate::repository::ContentRepository;
use tracing::{debug, info};

/// The transformations of one step; all of one shape.
#[derive(Debug, Clone, PartialEq)]
pub enum StepTransformations {
    Global(Vec<GlobalTransformation>),
    NodeAggregateBased(Vec<NodeAggregateTransformation>),
    NodeBased(Vec<NodeTransformation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStep {
    pub filters: Vec<Filter>,
    pub transformations: StepTransformations,
}

/// A validated migration ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub name: String,
    pub comments: Option<String>,
    pub steps: Vec<MigrationStep>,
}

impl Migration {
    pub fn from_configuration(name: &str, config: &MigrationConfiguration) -> Result<Self, ContentRepositoryError> {
        let steps = config
            .migration
            .iter()
            .enumerate()
            .map(|(index, step)| {
                MigrationStep::from_configuration(step).map_err(|e| ContentRepositoryError::InvalidConfiguration {
                    message: format!("migration {} step {}: {}", name, index + 1, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            comments: config.comments.clone(),
            steps,
        })
    }
}

impl MigrationStep {
    pub fn from_configuration(config: &MigrationStepConfiguration) -> Result<Self, ContentRepositoryError> {
        let filters = config.filters.iter().map(build_filter).collect::<Result<Vec<_>, _>>()?;
        let mut transformations = config.transformations.iter().map(build_transformation);
        let first = transformations
            .next()
            .transpose()?
            .ok_or_else(|| ContentRepositoryError::InvalidConfiguration {
                message: "a step needs at least one transformation".to_string(),
            })?;

        let mut step = match first {
            Transformation::Global(t) => StepTransformations::Global(vec![t]),
            Transformation::NodeAggregateBased(t) => StepTransformations::NodeAggregateBased(vec![t]),
            Transformation::NodeBased(t) => StepTransformations::NodeBased(vec![t]),
        };
        for transformation in transformations {
            match (&mut step, transformation?) {
                (StepTransformations::Global(list), Transformation::Global(t)) => list.push(t),
                (StepTransformations::NodeAggregateBased(list), Transformation::NodeAggregateBased(t)) => list.push(t),
                (StepTransformations::NodeBased(list), Transformation::NodeBased(t)) => list.push(t),
                _ => {
                    return Err(ContentRepositoryError::InvalidConfiguration {
                        message: "global, node aggregate based and node based transformations cannot be mixed in one step"
                            .to_string(),
                    })
                }
            }
        }

        if matches!(step, StepTransformations::NodeAggregateBased(_))
            && filters.iter().any(|f| !f.is_node_aggregate_filter())
        {
            return Err(ContentRepositoryError::InvalidConfiguration {
                message: "node aggregate based transformations only accept node aggregate filters".to_string(),
            });
        }

        Ok(Self {
            filters,
            transformations: step,
        })
    }

    /// Commands this step derives from `graph`.
    pub fn commands(&self, graph: &ContentGraph, services: &ContentRepositoryServices) -> Vec<ContentStreamCommand> {
        let matching_aggregates = move || {
            graph.node_aggregates().filter(move |aggregate| {
                self.filters
                    .iter()
                    .all(|f| f.matches_node_aggregate(aggregate, services))
            })
        };

        match &self.transformations {
            StepTransformations::Global(transformations) => {
                transformations.iter().flat_map(GlobalTransformation::commands).collect()
            }
            StepTransformations::NodeAggregateBased(transformations) => matching_aggregates()
                .flat_map(move |aggregate| transformations.iter().flat_map(move |t| t.commands(aggregate)))
                .collect(),
            StepTransformations::NodeBased(transformations) => {
                let mut commands = Vec::new();
                for aggregate in matching_aggregates() {
                    for (origin, variant) in aggregate.variants() {
                        if !self.filters.iter().all(|f| f.matches_node(origin, variant, services)) {
                            continue;
                        }
                        let covered_points = aggregate.coverage_by_origin(origin);
                        let node = NodeVariantContext {
                            node_aggregate: aggregate,
                            origin,
                            variant,
                            covered_points: &covered_points,
                        };
                        for transformation in transformations {
                            commands.extend(transformation.commands(&node));
                        }
                    }
                }
                commands
            }
        }
    }
}

impl ContentRepository {
    /// Runs `migration` from `source_workspace_name` into `target_workspace_name`.
    /// The target workspace is created on `target_content_stream_id`, based on
    /// the source, when it does not exist yet.
    pub async fn execute_migration(
        &self,
        migration: &Migration,
        source_workspace_name: &WorkspaceName,
        target_workspace_name: &WorkspaceName,
        target_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        self.require_workspace(source_workspace_name).await?;
        let mut result = CommandResult::empty();
        if self.find_workspace(target_workspace_name).await?.is_none() {
            result = self
                .create_workspace(
                    target_workspace_name,
                    source_workspace_name,
                    target_workspace_name.as_str(),
                    None,
                    target_content_stream_id,
                    context,
                )
                .await?;
        }

        for (index, step) in migration.steps.iter().enumerate() {
            let source = self.require_workspace(source_workspace_name).await?;
            let target = self.require_workspace(target_workspace_name).await?;
            let graph = self.content_graph(source.current_content_stream_id()).await?;
            let commands = step.commands(&graph, self.services());
            debug!(
                "Migration {} step {}: {} command(s)",
                migration.name,
                index + 1,
                commands.len()
            );
            for command in commands {
                result = result.merge(
                    self.handle(target.current_content_stream_id(), command, context)
                        .await?,
                );
            }
        }

        info!(
            "Executed migration {} from {} into {} ({} event(s))",
            migration.name,
            source_workspace_name,
            target_workspace_name,
            result.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
