//! The content repository: command bus over the event store.
//!
//! Commands are loaded against the addressed aggregate, handled, committed
//! to its stream with command metadata, and dispatched to the registered
//! queries. Read access returns the current folded state.

use crate::domain::cqrs::commands::{CommandContext, ContentStreamCommand};
use crate::domain::cqrs::{ContentStreamAggregate, ContentStreamEventEnvelope, ContentStreamQuery};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::graph::ContentGraph;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::{ContentStreamId, WorkspaceName};
use crate::domain::{CommandResult, RecordedEvent};
use crate::event_store::{FileStreamLog, LogEventStore, MemoryStreamLog, StoredAggregate, StreamLog};
use crate::workspace::{WorkspaceAggregate, WorkspaceCommand, WorkspaceData};
use cqrs_es::{Aggregate, AggregateContext, DomainEvent, EventEnvelope, EventStore, Query};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const METADATA_COMMAND_ID: &str = "command_id";
pub const METADATA_COMMAND_TYPE: &str = "command_type";
pub const METADATA_COMMAND_PAYLOAD: &str = "command_payload";
pub const METADATA_INITIATING_USER_ID: &str = "initiating_user_id";
pub const METADATA_INITIATING_TIMESTAMP: &str = "initiating_timestamp";

/// Snapshot every N events per stream.
const SNAPSHOT_EVERY: u64 = 100;

/// A command read back from a stream's event metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    pub command: ContentStreamCommand,
    pub metadata: HashMap<String, String>,
}

pub struct ContentRepository {
    services: ContentRepositoryServices,
    content_streams: LogEventStore<ContentStreamAggregate>,
    workspaces: LogEventStore<WorkspaceAggregate>,
    queries: Vec<Box<dyn Query<ContentStreamAggregate>>>,
    event_tx: broadcast::Sender<ContentStreamEventEnvelope>,
}

impl ContentRepository {
    pub fn new(log: Arc<dyn StreamLog>, services: ContentRepositoryServices) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            services,
            content_streams: LogEventStore::new(log.clone(), SNAPSHOT_EVERY),
            workspaces: LogEventStore::new(log, SNAPSHOT_EVERY),
            queries: vec![Box::new(ContentStreamQuery::new(event_tx.clone()))],
            event_tx,
        }
    }

    /// A repository persisting to JSONL files below `path`.
    pub fn open(path: &Path, services: ContentRepositoryServices) -> Self {
        Self::new(Arc::new(FileStreamLog::new(path.to_path_buf())), services)
    }

    pub fn in_memory(services: ContentRepositoryServices) -> Self {
        Self::new(Arc::new(MemoryStreamLog::new()), services)
    }

    /// Registers an additional subscriber for committed content stream events.
    pub fn with_query(mut self, query: Box<dyn Query<ContentStreamAggregate>>) -> Self {
        self.queries.push(query);
        self
    }

    pub fn services(&self) -> &ContentRepositoryServices {
        &self.services
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentStreamEventEnvelope> {
        self.event_tx.subscribe()
    }

    // ===== Content streams =====

    /// Handles one command against one content stream.
    pub async fn handle(
        &self,
        content_stream_id: &ContentStreamId,
        command: ContentStreamCommand,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let metadata = self.command_metadata(&command, context)?;
        self.handle_with_metadata(content_stream_id, command, metadata).await
    }

    /// Handles a command under existing metadata, e.g. when replaying it onto another stream.
    pub(crate) async fn handle_with_metadata(
        &self,
        content_stream_id: &ContentStreamId,
        command: ContentStreamCommand,
        metadata: HashMap<String, String>,
    ) -> Result<CommandResult, ContentRepositoryError> {
        if let ContentStreamCommand::ForkContentStream {
            source_content_stream_id,
            version_of_source_content_stream,
            ..
        } = &command
        {
            self.content_stream(source_content_stream_id).await?;
            let version = self.content_stream_version(source_content_stream_id)?;
            if *version_of_source_content_stream > version {
                return Err(ContentRepositoryError::ConcurrencyConflict {
                    message: format!(
                        "content stream {} is at version {}, cannot fork at {}",
                        source_content_stream_id, version, version_of_source_content_stream
                    ),
                });
            }
        }

        let id = content_stream_id.as_str();
        let context = self.content_streams.load_aggregate(id).await?;
        let events = context
            .aggregate()
            .handle(command, &self.services)
            .await
            .map_err(|e| match e {
                ContentRepositoryError::NotInitialized => ContentRepositoryError::ContentStreamDoesNotExistYet {
                    content_stream_id: content_stream_id.clone(),
                },
                other => other,
            })?;
        let envelopes = self.content_streams.commit(events, context, metadata).await?;
        self.dispatch(id, &envelopes).await;
        Ok(command_result::<ContentStreamAggregate>(id, &envelopes))
    }

    pub async fn create_content_stream(
        &self,
        content_stream_id: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let command = ContentStreamCommand::CreateContentStream {
            content_stream_id: content_stream_id.clone(),
        };
        self.handle(content_stream_id, command, context).await
    }

    /// Forks `source` at its current version.
    pub async fn fork_content_stream(
        &self,
        content_stream_id: &ContentStreamId,
        source: &ContentStreamId,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let version = self.content_stream_version(source)?;
        self.fork_content_stream_at(content_stream_id, source, version, context).await
    }

    pub async fn fork_content_stream_at(
        &self,
        content_stream_id: &ContentStreamId,
        source: &ContentStreamId,
        version: usize,
        context: &CommandContext,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let command = ContentStreamCommand::ForkContentStream {
            content_stream_id: content_stream_id.clone(),
            source_content_stream_id: source.clone(),
            version_of_source_content_stream: version,
        };
        self.handle(content_stream_id, command, context).await
    }

    /// The folded state of an existing, not removed content stream.
    pub async fn content_stream(
        &self,
        content_stream_id: &ContentStreamId,
    ) -> Result<ContentStreamAggregate, ContentRepositoryError> {
        let context = self.content_streams.load_aggregate(content_stream_id.as_str()).await?;
        if !context.aggregate.exists() {
            return Err(ContentRepositoryError::ContentStreamDoesNotExistYet {
                content_stream_id: content_stream_id.clone(),
            });
        }
        Ok(context.aggregate)
    }

    pub async fn content_graph(&self, content_stream_id: &ContentStreamId) -> Result<ContentGraph, ContentRepositoryError> {
        let aggregate = self.content_stream(content_stream_id).await?;
        Ok(aggregate.graph().cloned().unwrap_or_default())
    }

    /// Number of own events in the stream.
    pub fn content_stream_version(&self, content_stream_id: &ContentStreamId) -> Result<usize, ContentRepositoryError> {
        Ok(self.content_streams.version(content_stream_id.as_str())?)
    }

    /// The stream's own events, without inherited history.
    pub fn content_stream_events(
        &self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<EventEnvelope<ContentStreamAggregate>>, ContentRepositoryError> {
        Ok(self.content_streams.own_events(content_stream_id.as_str())?)
    }

    /// The node commands recorded in the stream's own events, in order, once each.
    pub fn recorded_commands(&self, content_stream_id: &ContentStreamId) -> Result<Vec<RecordedCommand>, ContentRepositoryError> {
        let mut seen: Vec<String> = Vec::new();
        let mut commands = Vec::new();
        for envelope in self.content_stream_events(content_stream_id)? {
            if !envelope.payload.is_publishable() {
                continue;
            }
            let (Some(command_id), Some(payload)) = (
                envelope.metadata.get(METADATA_COMMAND_ID),
                envelope.metadata.get(METADATA_COMMAND_PAYLOAD),
            ) else {
                continue;
            };
            if seen.contains(command_id) {
                continue;
            }
            seen.push(command_id.clone());
            let command: ContentStreamCommand =
                serde_json::from_str(payload).map_err(|e| ContentRepositoryError::StorageFailure {
                    message: format!("unreadable command payload in {}: {}", content_stream_id, e),
                })?;
            commands.push(RecordedCommand {
                command,
                metadata: envelope.metadata.clone(),
            });
        }
        Ok(commands)
    }

    /// Appends the content events of `source`'s own history to `target`,
    /// provided `target` is still at `expected_version`.
    pub(crate) async fn publish_content_stream(
        &self,
        source: &ContentStreamId,
        target: &ContentStreamId,
        expected_version: usize,
    ) -> Result<CommandResult, ContentRepositoryError> {
        let events: Vec<_> = self
            .content_stream_events(source)?
            .into_iter()
            .filter(|e| e.payload.is_publishable())
            .map(|e| (e.payload, e.metadata))
            .collect();
        if events.is_empty() {
            return Ok(CommandResult::empty());
        }
        let id = target.as_str();
        let envelopes = self.content_streams.append_events(id, expected_version, events)?;
        self.dispatch(id, &envelopes).await;
        Ok(command_result::<ContentStreamAggregate>(id, &envelopes))
    }

    async fn dispatch(&self, aggregate_id: &str, envelopes: &[EventEnvelope<ContentStreamAggregate>]) {
        for query in &self.queries {
            query.dispatch(aggregate_id, envelopes).await;
        }
    }

    fn command_metadata(
        &self,
        command: &ContentStreamCommand,
        context: &CommandContext,
    ) -> Result<HashMap<String, String>, ContentRepositoryError> {
        let payload = serde_json::to_string(command).map_err(|e| ContentRepositoryError::StorageFailure {
            message: format!("cannot serialize {}: {}", command.command_type(), e),
        })?;
        Ok(HashMap::from([
            (METADATA_COMMAND_ID.to_string(), uuid::Uuid::new_v4().to_string()),
            (METADATA_COMMAND_TYPE.to_string(), command.command_type().to_string()),
            (METADATA_COMMAND_PAYLOAD.to_string(), payload),
            (
                METADATA_INITIATING_USER_ID.to_string(),
                context.initiating_user_id.to_string(),
            ),
            (
                METADATA_INITIATING_TIMESTAMP.to_string(),
                self.services.clock.now().to_string(),
            ),
        ]))
    }

    // ===== Workspaces =====

    pub(crate) async fn handle_workspace_command(
        &self,
        workspace_name: &WorkspaceName,
        command: WorkspaceCommand,
    ) -> Result<(), ContentRepositoryError> {
        let id = workspace_name.as_str();
        let context = self.workspaces.load_aggregate(id).await?;
        let events = context.aggregate().handle(command, &()).await.map_err(|e| match e {
            ContentRepositoryError::NotInitialized => ContentRepositoryError::WorkspaceDoesNotExist {
                workspace_name: workspace_name.clone(),
            },
            other => other,
        })?;
        let envelopes = self.workspaces.commit(events, context, HashMap::new()).await?;
        for envelope in &envelopes {
            tracing::info!("Workspace {}: {}", workspace_name, envelope.payload.event_type());
        }
        Ok(())
    }

    pub async fn find_workspace(&self, workspace_name: &WorkspaceName) -> Result<Option<WorkspaceData>, ContentRepositoryError> {
        let context = self.workspaces.load_aggregate(workspace_name.as_str()).await?;
        Ok(context.aggregate.data().cloned())
    }

    pub async fn require_workspace(&self, workspace_name: &WorkspaceName) -> Result<WorkspaceData, ContentRepositoryError> {
        self.find_workspace(workspace_name)
            .await?
            .ok_or_else(|| ContentRepositoryError::WorkspaceDoesNotExist {
                workspace_name: workspace_name.clone(),
            })
    }

    /// All existing workspaces, ordered by name.
    pub async fn find_workspaces(&self) -> Result<Vec<WorkspaceData>, ContentRepositoryError> {
        let prefix = WorkspaceAggregate::stream_name("");
        let streams = self
            .content_streams
            .log()
            .streams()
            .map_err(|e| ContentRepositoryError::StorageFailure { message: e.to_string() })?;
        let mut workspaces = Vec::new();
        for stream in streams {
            if let Some(name) = stream.strip_prefix(&prefix) {
                if let Some(data) = self.find_workspace(&WorkspaceName::from(name)).await? {
                    workspaces.push(data);
                }
            }
        }
        workspaces.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(workspaces)
    }
}

fn command_result<A: StoredAggregate>(aggregate_id: &str, envelopes: &[EventEnvelope<A>]) -> CommandResult {
    let stream = A::stream_name(aggregate_id);
    CommandResult::from_events(
        envelopes
            .iter()
            .map(|e| RecordedEvent {
                stream: stream.clone(),
                sequence: e.sequence,
                event_type: e.payload.event_type(),
            })
            .collect(),
    )
}

#[cfg(test)]
#[path = "tests/repository_tests.rs"]
mod tests;
