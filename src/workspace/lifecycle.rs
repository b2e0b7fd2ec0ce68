//! Workspace lifecycle: create, rebase, publish, discard and friends.
//!
//! Every operation is an ordered sequence of appends. The workspace is only
//! repointed once its new content stream is complete, so a failure partway
//! leaves at most an orphaned stream behind and the workspace untouched.

use super::aggregate::{ContentStreamSwitchReason, WorkspaceCommand, WorkspaceData};
use crate::dimension::DimensionSpacePoint;
use crate::domain::cqrs::commands::{CommandContext, ContentStreamCommand};
use crate::domain::errors::{ContentRepositoryError, ErrorCategory, RebaseConflict};
use crate::domain::types::{ContentStreamId, NodeAggregateId, UserId, WorkspaceName};
use crate::domain::CommandResult;
use crate::repository::{ContentRepository, RecordedCommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Addresses a node for individual publish/discard. Without a point, every
/// change to the aggregate matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub node_aggregate_id: NodeAggregateId,
    pub dimension_space_point: Option<DimensionSpacePoint>,
}

impl NodeAddress {
    pub fn new(node_aggregate_id: NodeAggregateId, dimension_space_point: Option<DimensionSpacePoint>) -> Self {
        Self {
            node_aggregate_id,
            dimension_space_point,
        }
    }

    fn matches(&self, command: &ContentStreamCommand) -> bool {
        command.matches_node(&self.node_aggregate_id, self.dimension_space_point.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebaseErrorHandlingStrategy {
    /// Skip conflicting commands and report them.
    #[default]
    Force,
    /// Abort when any command conflicts and keep the old stream.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    UpToDate,
    Outdated,
}

/// Outcome of an operation that replays commands onto a new stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebaseResult {
    pub command_result: CommandResult,
    /// Commands that no longer applied and were skipped.
    pub conflicts: Vec<RebaseConflict>,
}

impl RebaseResult {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

impl ContentRepository {
    // ===== Creation =====

    pub async fn create_root_workspace(
        &self,
        workspace_name: &WorkspaceName,
        title: &str,
        new_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        self.require_workspace_to_be_absent(workspace_name).await?;
        let result = self.create_content_stream(new_content_stream_id, context).await?;
        self.handle_workspace_command(
            workspace_name,
            WorkspaceCommand::CreateRootWorkspace {
                workspace_name: workspace_name.clone(),
                title: title.to_string(),
                description: String::new(),
                new_content_stream_id: new_content_stream_id.clone(),
            },
        )
        .await?;
        info!("Created root workspace {} on {}", workspace_name, new_content_stream_id);
        Ok(result)
    }

    pub async fn create_workspace(
        &self,
        workspace_name: &WorkspaceName,
        base_workspace_name: &WorkspaceName,
        title: &str,
        owner: Option<UserId>,
        new_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        self.require_workspace_to_be_absent(workspace_name).await?;
        let base = self.require_workspace(base_workspace_name).await?;
        let result = self
            .fork_content_stream(new_content_stream_id, base.current_content_stream_id(), context)
            .await?;
        self.handle_workspace_command(
            workspace_name,
            WorkspaceCommand::CreateWorkspace {
                workspace_name: workspace_name.clone(),
                base_workspace_name: base_workspace_name.clone(),
                title: title.to_string(),
                description: String::new(),
                owner,
                new_content_stream_id: new_content_stream_id.clone(),
            },
        )
        .await?;
        info!(
            "Created workspace {} based on {} on {}",
            workspace_name, base_workspace_name, new_content_stream_id
        );
        Ok(result)
    }

    // ===== Status =====

    /// `UpToDate` when the workspace stream was forked from its base's current tip.
    pub async fn workspace_status(&self, workspace_name: &WorkspaceName) -> Result<WorkspaceStatus, ContentRepositoryError> {
        let workspace = self.require_workspace(workspace_name).await?;
        let Some(base_name) = workspace.base_workspace_name() else {
            return Ok(WorkspaceStatus::UpToDate);
        };
        let base = self.require_workspace(base_name).await?;
        let base_version = self.content_stream_version(base.current_content_stream_id())?;
        let stream = self.content_stream(workspace.current_content_stream_id()).await?;
        let up_to_date = stream
            .data()
            .and_then(|d| d.source())
            .is_some_and(|(source, version)| source == base.current_content_stream_id() && version == base_version);
        Ok(if up_to_date {
            WorkspaceStatus::UpToDate
        } else {
            WorkspaceStatus::Outdated
        })
    }

    /// Whether the workspace stream holds content changes of its own.
    pub async fn has_pending_changes(&self, workspace_name: &WorkspaceName) -> Result<bool, ContentRepositoryError> {
        let workspace = self.require_workspace(workspace_name).await?;
        Ok(self
            .content_stream_events(workspace.current_content_stream_id())?
            .iter()
            .any(|e| e.payload.is_publishable()))
    }

    // ===== Rebase =====

    pub async fn rebase_workspace(
        &self,
        workspace_name: &WorkspaceName,
        rebased_content_stream_id: &ContentStreamId,
        strategy: RebaseErrorHandlingStrategy,
        context: &CommandContext,
    ) -> Result<RebaseResult, ContentRepositoryError> {
        let (workspace, base) = self.workspace_with_base(workspace_name).await?;
        if self.workspace_status(workspace_name).await? == WorkspaceStatus::UpToDate {
            info!("Workspace {} is up to date, skipping rebase", workspace_name);
            return Ok(RebaseResult::default());
        }

        self.require_content_stream_to_be_absent(rebased_content_stream_id)?;
        let old_stream = workspace.current_content_stream_id().clone();
        let commands = self.recorded_commands(&old_stream)?;

        self.handle(&old_stream, ContentStreamCommand::CloseContentStream, context).await?;
        let mut forked = false;
        let replayed = async {
            let mut result = self
                .fork_content_stream(rebased_content_stream_id, base.current_content_stream_id(), context)
                .await?;
            forked = true;
            let (replayed, conflicts) = self.replay_commands(rebased_content_stream_id, commands).await?;
            result = result.merge(replayed);
            Ok::<_, ContentRepositoryError>(RebaseResult {
                command_result: result,
                conflicts,
            })
        }
        .await;

        let rebased = match replayed {
            Ok(rebased) if strategy == RebaseErrorHandlingStrategy::Fail && !rebased.is_clean() => {
                self.abandon(&old_stream, forked.then_some(rebased_content_stream_id), context)
                    .await?;
                return Err(ContentRepositoryError::WorkspaceRebaseFailed {
                    workspace_name: workspace_name.clone(),
                    conflicts: rebased.conflicts,
                });
            }
            Ok(rebased) => rebased,
            Err(e) => {
                self.abandon(&old_stream, forked.then_some(rebased_content_stream_id), context)
                    .await?;
                return Err(e);
            }
        };

        self.switch_content_stream(workspace_name, rebased_content_stream_id, ContentStreamSwitchReason::Rebased)
            .await?;
        self.handle(&old_stream, ContentStreamCommand::RemoveContentStream, context).await?;
        info!(
            "Rebased workspace {} onto {} ({} conflicts)",
            workspace_name,
            base.name(),
            rebased.conflicts.len()
        );
        Ok(rebased)
    }

    // ===== Publish =====

    /// Hands every pending change to the base workspace and restarts the
    /// workspace on a fresh stream forked from the new base tip.
    pub async fn publish_workspace(
        &self,
        workspace_name: &WorkspaceName,
        new_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let (workspace, base) = self.workspace_with_base(workspace_name).await?;
        if !self.has_pending_changes(workspace_name).await? {
            return Ok(CommandResult::empty());
        }

        let old_stream = workspace.current_content_stream_id().clone();
        let fork_version = self.require_unmodified_base(&workspace, &base).await?;
        let mut result = self
            .publish_content_stream(&old_stream, base.current_content_stream_id(), fork_version)
            .await?;

        result = result.merge(
            self.fork_content_stream(new_content_stream_id, base.current_content_stream_id(), context)
                .await?,
        );
        self.switch_content_stream(workspace_name, new_content_stream_id, ContentStreamSwitchReason::Published)
            .await?;
        self.handle(&old_stream, ContentStreamCommand::RemoveContentStream, context).await?;
        info!("Published workspace {} to {}", workspace_name, base.name());
        Ok(result)
    }

    /// Publishes only the changes touching `node_addresses`. The remaining
    /// changes are replayed onto a stream forked from the new base tip and
    /// stay pending in the workspace.
    pub async fn publish_individual_nodes(
        &self,
        workspace_name: &WorkspaceName,
        node_addresses: &[NodeAddress],
        matching_content_stream_id: &ContentStreamId,
        remaining_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<RebaseResult, ContentRepositoryError> {
        let (workspace, base) = self.workspace_with_base(workspace_name).await?;
        let old_stream = workspace.current_content_stream_id().clone();
        let (matching, remaining) = partition_commands(self.recorded_commands(&old_stream)?, node_addresses);
        if matching.is_empty() {
            return Ok(RebaseResult::default());
        }
        if remaining.is_empty() {
            let command_result = self
                .publish_workspace(workspace_name, remaining_content_stream_id, context)
                .await?;
            return Ok(RebaseResult {
                command_result,
                conflicts: Vec::new(),
            });
        }

        self.require_content_stream_to_be_absent(matching_content_stream_id)?;
        self.require_content_stream_to_be_absent(remaining_content_stream_id)?;
        self.handle(&old_stream, ContentStreamCommand::CloseContentStream, context).await?;

        // The matching changes must apply cleanly to the current base.
        let base_stream = base.current_content_stream_id();
        let base_version = self.content_stream_version(base_stream)?;
        let mut forked = false;
        let published = async {
            self.fork_content_stream_at(matching_content_stream_id, base_stream, base_version, context)
                .await?;
            forked = true;
            let (_, conflicts) = self.replay_commands(matching_content_stream_id, matching).await?;
            if !conflicts.is_empty() {
                return Err(ContentRepositoryError::WorkspaceRebaseFailed {
                    workspace_name: workspace_name.clone(),
                    conflicts,
                });
            }
            self.publish_content_stream(matching_content_stream_id, base_stream, base_version)
                .await
        }
        .await;
        let mut command_result = match published {
            Ok(result) => result,
            Err(e) => {
                self.abandon(&old_stream, forked.then_some(matching_content_stream_id), context)
                    .await?;
                return Err(e);
            }
        };

        command_result = command_result.merge(
            self.fork_content_stream(remaining_content_stream_id, base_stream, context)
                .await?,
        );
        let (replayed, conflicts) = self.replay_commands(remaining_content_stream_id, remaining).await?;
        command_result = command_result.merge(replayed);

        self.switch_content_stream(
            workspace_name,
            remaining_content_stream_id,
            ContentStreamSwitchReason::PartiallyPublished,
        )
        .await?;
        self.handle(&old_stream, ContentStreamCommand::RemoveContentStream, context).await?;
        self.handle(matching_content_stream_id, ContentStreamCommand::RemoveContentStream, context)
            .await?;
        info!(
            "Published {} node(s) of workspace {} to {}",
            node_addresses.len(),
            workspace_name,
            base.name()
        );
        Ok(RebaseResult {
            command_result,
            conflicts,
        })
    }

    // ===== Discard =====

    /// Drops every pending change by restarting from the workspace's fork point.
    pub async fn discard_workspace(
        &self,
        workspace_name: &WorkspaceName,
        new_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let (workspace, base) = self.workspace_with_base(workspace_name).await?;
        if !self.has_pending_changes(workspace_name).await? {
            return Ok(CommandResult::empty());
        }
        let old_stream = workspace.current_content_stream_id().clone();
        let (source, version) = self.discard_fork_point(&workspace, &base).await?;
        let result = self
            .fork_content_stream_at(new_content_stream_id, &source, version, context)
            .await?;
        self.switch_content_stream(workspace_name, new_content_stream_id, ContentStreamSwitchReason::Discarded)
            .await?;
        self.handle(&old_stream, ContentStreamCommand::RemoveContentStream, context).await?;
        info!("Discarded all changes in workspace {}", workspace_name);
        Ok(result)
    }

    /// Drops the changes touching `node_addresses` and keeps the rest.
    pub async fn discard_individual_nodes(
        &self,
        workspace_name: &WorkspaceName,
        node_addresses: &[NodeAddress],
        new_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<RebaseResult, ContentRepositoryError> {
        let (workspace, base) = self.workspace_with_base(workspace_name).await?;
        let old_stream = workspace.current_content_stream_id().clone();
        let (discarded, remaining) = partition_commands(self.recorded_commands(&old_stream)?, node_addresses);
        if discarded.is_empty() {
            return Ok(RebaseResult::default());
        }

        let (source, version) = self.discard_fork_point(&workspace, &base).await?;
        let mut command_result = self
            .fork_content_stream_at(new_content_stream_id, &source, version, context)
            .await?;
        let (replayed, conflicts) = self.replay_commands(new_content_stream_id, remaining).await?;
        command_result = command_result.merge(replayed);

        self.switch_content_stream(
            workspace_name,
            new_content_stream_id,
            ContentStreamSwitchReason::PartiallyDiscarded,
        )
        .await?;
        self.handle(&old_stream, ContentStreamCommand::RemoveContentStream, context).await?;
        info!(
            "Discarded {} change(s) in workspace {}",
            discarded.len(),
            workspace_name
        );
        Ok(RebaseResult {
            command_result,
            conflicts,
        })
    }

    // ===== Administration =====

    pub async fn change_base_workspace(
        &self,
        workspace_name: &WorkspaceName,
        base_workspace_name: &WorkspaceName,
        new_content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let workspace = self.require_workspace(workspace_name).await?;
        if workspace.base_workspace_name() == Some(base_workspace_name) {
            return Ok(CommandResult::empty());
        }
        if self.has_pending_changes(workspace_name).await? {
            return Err(ContentRepositoryError::WorkspaceIsNotEmpty {
                workspace_name: workspace_name.clone(),
            });
        }
        let base = self.require_workspace(base_workspace_name).await?;
        self.require_no_circular_relation(workspace_name, &base).await?;

        let old_stream = workspace.current_content_stream_id().clone();
        let result = self
            .fork_content_stream(new_content_stream_id, base.current_content_stream_id(), context)
            .await?;
        self.handle_workspace_command(
            workspace_name,
            WorkspaceCommand::ChangeBaseWorkspace {
                base_workspace_name: base_workspace_name.clone(),
                new_content_stream_id: new_content_stream_id.clone(),
            },
        )
        .await?;
        self.handle(&old_stream, ContentStreamCommand::RemoveContentStream, context).await?;
        info!("Workspace {} is now based on {}", workspace_name, base_workspace_name);
        Ok(result)
    }

    pub async fn delete_workspace(
        &self,
        workspace_name: &WorkspaceName,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let workspace = self.require_workspace(workspace_name).await?;
        let has_dependents = self
            .find_workspaces()
            .await?
            .iter()
            .any(|w| w.base_workspace_name() == Some(workspace_name));
        if has_dependents {
            return Err(ContentRepositoryError::WorkspaceHasDependents {
                workspace_name: workspace_name.clone(),
            });
        }
        let result = self
            .handle(
                workspace.current_content_stream_id(),
                ContentStreamCommand::RemoveContentStream,
                context,
            )
            .await?;
        self.handle_workspace_command(workspace_name, WorkspaceCommand::RemoveWorkspace)
            .await?;
        info!("Deleted workspace {}", workspace_name);
        Ok(result)
    }

    pub async fn rename_workspace(
        &self,
        workspace_name: &WorkspaceName,
        title: &str,
        description: &str,
    ) -> Result<(), ContentRepositoryError> {
        self.handle_workspace_command(
            workspace_name,
            WorkspaceCommand::RenameWorkspace {
                title: title.to_string(),
                description: description.to_string(),
            },
        )
        .await
    }

    pub async fn change_workspace_owner(
        &self,
        workspace_name: &WorkspaceName,
        owner: Option<UserId>,
    ) -> Result<(), ContentRepositoryError> {
        self.handle_workspace_command(workspace_name, WorkspaceCommand::ChangeWorkspaceOwner { owner })
            .await
    }

    // ===== Helpers =====

    async fn require_workspace_to_be_absent(&self, workspace_name: &WorkspaceName) -> Result<(), ContentRepositoryError> {
        if self.find_workspace(workspace_name).await?.is_some() {
            return Err(ContentRepositoryError::WorkspaceAlreadyExists {
                workspace_name: workspace_name.clone(),
            });
        }
        Ok(())
    }

    /// Target stream ids must be fresh; removed streams keep their id too.
    fn require_content_stream_to_be_absent(&self, content_stream_id: &ContentStreamId) -> Result<(), ContentRepositoryError> {
        if self.content_stream_version(content_stream_id)? > 0 {
            return Err(ContentRepositoryError::ContentStreamAlreadyExists {
                content_stream_id: content_stream_id.clone(),
            });
        }
        Ok(())
    }

    async fn workspace_with_base(
        &self,
        workspace_name: &WorkspaceName,
    ) -> Result<(WorkspaceData, WorkspaceData), ContentRepositoryError> {
        let workspace = self.require_workspace(workspace_name).await?;
        let Some(base_name) = workspace.base_workspace_name() else {
            return Err(ContentRepositoryError::WorkspaceHasNoBaseWorkspace {
                workspace_name: workspace_name.clone(),
            });
        };
        let base = self.require_workspace(base_name).await?;
        Ok((workspace, base))
    }

    /// The base version the workspace was forked at, if the base has not moved since.
    async fn require_unmodified_base(
        &self,
        workspace: &WorkspaceData,
        base: &WorkspaceData,
    ) -> Result<usize, ContentRepositoryError> {
        let (source, fork_version) = self.fork_point(workspace.current_content_stream_id()).await?;
        let base_version = self.content_stream_version(base.current_content_stream_id())?;
        if &source != base.current_content_stream_id() || fork_version != base_version {
            return Err(ContentRepositoryError::BaseWorkspaceHasBeenModifiedInTheMeantime {
                workspace_name: workspace.name().clone(),
                expected_version: fork_version,
                actual_version: base_version,
            });
        }
        Ok(fork_version)
    }

    /// Where a discard restarts: the original fork point while the base still
    /// runs on that stream, otherwise the tip of the base's current stream.
    async fn discard_fork_point(
        &self,
        workspace: &WorkspaceData,
        base: &WorkspaceData,
    ) -> Result<(ContentStreamId, usize), ContentRepositoryError> {
        let (source, version) = self.fork_point(workspace.current_content_stream_id()).await?;
        let base_stream = base.current_content_stream_id();
        if &source == base_stream {
            return Ok((source, version));
        }
        Ok((base_stream.clone(), self.content_stream_version(base_stream)?))
    }

    async fn fork_point(&self, content_stream_id: &ContentStreamId) -> Result<(ContentStreamId, usize), ContentRepositoryError> {
        let stream = self.content_stream(content_stream_id).await?;
        stream
            .data()
            .and_then(|d| d.source())
            .map(|(source, version)| (source.clone(), version))
            .ok_or_else(|| ContentRepositoryError::ContentStreamDoesNotExistYet {
                content_stream_id: content_stream_id.clone(),
            })
    }

    async fn require_no_circular_relation(
        &self,
        workspace_name: &WorkspaceName,
        new_base: &WorkspaceData,
    ) -> Result<(), ContentRepositoryError> {
        let mut current = Some(new_base.clone());
        while let Some(workspace) = current {
            if workspace.name() == workspace_name {
                return Err(ContentRepositoryError::CircularRelationBetweenWorkspaces {
                    workspace_name: workspace_name.clone(),
                });
            }
            current = match workspace.base_workspace_name() {
                Some(base) => self.find_workspace(base).await?,
                None => None,
            };
        }
        Ok(())
    }

    async fn switch_content_stream(
        &self,
        workspace_name: &WorkspaceName,
        new_content_stream_id: &ContentStreamId,
        reason: ContentStreamSwitchReason,
    ) -> Result<(), ContentRepositoryError> {
        self.handle_workspace_command(
            workspace_name,
            WorkspaceCommand::SwitchContentStream {
                new_content_stream_id: new_content_stream_id.clone(),
                reason,
            },
        )
        .await
    }

    /// Replays recorded commands in order under their original metadata.
    /// Commands that no longer apply become conflicts; storage errors abort.
    async fn replay_commands(
        &self,
        content_stream_id: &ContentStreamId,
        commands: Vec<RecordedCommand>,
    ) -> Result<(CommandResult, Vec<RebaseConflict>), ContentRepositoryError> {
        let mut result = CommandResult::empty();
        let mut conflicts = Vec::new();
        for (position, recorded) in commands.into_iter().enumerate() {
            let command_type = recorded.command.command_type();
            match self
                .handle_with_metadata(content_stream_id, recorded.command, recorded.metadata)
                .await
            {
                Ok(applied) => result = result.merge(applied),
                Err(e) if e.category() == ErrorCategory::Storage => return Err(e),
                Err(e) => {
                    warn!("Skipping {} #{} on {}: {}", command_type, position, content_stream_id, e);
                    conflicts.push(RebaseConflict {
                        position,
                        command_type: command_type.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok((result, conflicts))
    }

    /// Undoes a half-finished replay: the stream this operation forked goes,
    /// the old one reopens.
    async fn abandon(
        &self,
        old_stream: &ContentStreamId,
        forked_stream: Option<&ContentStreamId>,
        context: &CommandContext,
    ) -> Result<(), ContentRepositoryError> {
        if let Some(forked_stream) = forked_stream {
            self.handle(forked_stream, ContentStreamCommand::RemoveContentStream, context)
                .await?;
        }
        self.handle(old_stream, ContentStreamCommand::ReopenContentStream, context)
            .await?;
        Ok(())
    }
}

fn partition_commands(
    commands: Vec<RecordedCommand>,
    node_addresses: &[NodeAddress],
) -> (Vec<RecordedCommand>, Vec<RecordedCommand>) {
    commands
        .into_iter()
        .partition(|recorded| node_addresses.iter().any(|address| address.matches(&recorded.command)))
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
