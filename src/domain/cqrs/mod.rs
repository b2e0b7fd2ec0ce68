//! CQRS core types for the content stream aggregate.
//!
//! - **Commands**: intent to change one content stream
//! - **Events**: facts appended to the stream
//! - **Aggregate**: lifecycle checks, dispatch to the node handlers, event application
//! - **Query**: read-side subscribers

pub mod commands;
pub mod events;
pub mod query;

pub use commands::{CommandContext, ContentStreamCommand};
pub use events::ContentStreamEvent;
pub use query::{ContentStreamEventEnvelope, ContentStreamQuery};

use crate::domain::errors::ContentRepositoryError;
use crate::domain::graph::ContentGraph;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::ContentStreamId;
use crate::event_store::StoredAggregate;
use async_trait::async_trait;
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStreamStatus {
    Open,
    Closed,
    Removed,
}

/// State of an existing content stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStreamData {
    id: ContentStreamId,
    source: Option<(ContentStreamId, usize)>,
    status: ContentStreamStatus,
    graph: ContentGraph,
}

impl ContentStreamData {
    fn new(id: ContentStreamId) -> Self {
        Self {
            id,
            source: None,
            status: ContentStreamStatus::Open,
            graph: ContentGraph::default(),
        }
    }

    // ========== Public Getters ==========

    pub fn id(&self) -> &ContentStreamId {
        &self.id
    }

    /// Source stream and version this stream was forked from.
    pub fn source(&self) -> Option<(&ContentStreamId, usize)> {
        self.source.as_ref().map(|(id, version)| (id, *version))
    }

    pub fn status(&self) -> ContentStreamStatus {
        self.status
    }

    pub fn is_closed(&self) -> bool {
        self.status == ContentStreamStatus::Closed
    }

    pub fn is_removed(&self) -> bool {
        self.status == ContentStreamStatus::Removed
    }

    pub fn graph(&self) -> &ContentGraph {
        &self.graph
    }

    fn lifecycle_event(&self, command: ContentStreamCommand) -> Result<Vec<ContentStreamEvent>, ContentRepositoryError> {
        let content_stream_id = self.id.clone();
        match command {
            ContentStreamCommand::CloseContentStream if self.is_closed() => {
                Err(ContentRepositoryError::ContentStreamIsClosed { content_stream_id })
            }
            ContentStreamCommand::CloseContentStream => {
                Ok(vec![ContentStreamEvent::ContentStreamWasClosed { content_stream_id }])
            }
            ContentStreamCommand::ReopenContentStream if !self.is_closed() => {
                Err(ContentRepositoryError::ContentStreamIsNotClosed { content_stream_id })
            }
            ContentStreamCommand::ReopenContentStream => {
                Ok(vec![ContentStreamEvent::ContentStreamWasReopened { content_stream_id }])
            }
            ContentStreamCommand::RemoveContentStream => {
                Ok(vec![ContentStreamEvent::ContentStreamWasRemoved { content_stream_id }])
            }
            _ => Err(ContentRepositoryError::ContentStreamAlreadyExists { content_stream_id }),
        }
    }

    fn node_events(
        &self,
        command: ContentStreamCommand,
        services: &ContentRepositoryServices,
    ) -> Result<Vec<ContentStreamEvent>, ContentRepositoryError> {
        match command {
            ContentStreamCommand::CreateRootNodeAggregateWithNode(c) => self.handle_create_root_node_aggregate(c, services),
            ContentStreamCommand::UpdateRootNodeAggregateDimensions(c) => {
                self.handle_update_root_node_aggregate_dimensions(c, services)
            }
            ContentStreamCommand::CreateNodeAggregateWithNode(c) => self.handle_create_node_aggregate(c, services),
            ContentStreamCommand::SetNodeProperties(c) => self.handle_set_node_properties(c, services),
            ContentStreamCommand::SetSerializedNodeProperties(c) => self.handle_set_serialized_node_properties(c),
            ContentStreamCommand::SetNodeReferences(c) => self.handle_set_node_references(c, services),
            ContentStreamCommand::MoveNodeAggregate(c) => self.handle_move_node_aggregate(c, services),
            ContentStreamCommand::DisableNodeAggregate(c) => self.handle_disable_node_aggregate(c, services),
            ContentStreamCommand::EnableNodeAggregate(c) => self.handle_enable_node_aggregate(c, services),
            ContentStreamCommand::RemoveNodeAggregate(c) => self.handle_remove_node_aggregate(c, services),
            ContentStreamCommand::RestoreNodeAggregateCoverage(c) => self.handle_restore_coverage(c, services),
            ContentStreamCommand::ChangeNodeAggregateType(c) => self.handle_change_node_aggregate_type(c, services),
            ContentStreamCommand::ChangeNodeAggregateName(c) => self.handle_change_node_aggregate_name(c),
            ContentStreamCommand::CreateNodeVariant(c) => self.handle_create_node_variant(c, services),
            ContentStreamCommand::CopyNodesRecursively(c) => self.handle_copy_nodes_recursively(c, services),
            ContentStreamCommand::MoveDimensionSpacePoint(c) => self.handle_move_dimension_space_point(c, services),
            ContentStreamCommand::AddDimensionShineThrough(c) => self.handle_add_dimension_shine_through(c, services),
            lifecycle => self.lifecycle_event(lifecycle),
        }
    }
}

/// Content stream aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum ContentStreamState {
    #[default]
    Uninitialized,
    Active(Box<ContentStreamData>),
}

/// One content stream: its lifecycle plus the content graph folded from its history.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentStreamAggregate {
    pub state: ContentStreamState,
}

impl ContentStreamAggregate {
    pub fn data(&self) -> Option<&ContentStreamData> {
        match &self.state {
            ContentStreamState::Active(data) => Some(data),
            ContentStreamState::Uninitialized => None,
        }
    }

    /// Whether the stream exists and was not removed.
    pub fn exists(&self) -> bool {
        self.data().is_some_and(|d| !d.is_removed())
    }

    pub fn graph(&self) -> Option<&ContentGraph> {
        self.data().map(ContentStreamData::graph)
    }
}

#[async_trait]
impl Aggregate for ContentStreamAggregate {
    type Command = ContentStreamCommand;
    type Event = ContentStreamEvent;
    type Error = ContentRepositoryError;
    type Services = ContentRepositoryServices;

    fn aggregate_type() -> String {
        "ContentStream".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match (&self.state, command) {
            // CreateContentStream - only valid on an uninitialized stream
            (ContentStreamState::Uninitialized, ContentStreamCommand::CreateContentStream { content_stream_id }) => {
                Ok(vec![ContentStreamEvent::ContentStreamWasCreated { content_stream_id }])
            }

            // ForkContentStream - source existence is checked by the repository
            (
                ContentStreamState::Uninitialized,
                ContentStreamCommand::ForkContentStream {
                    content_stream_id,
                    source_content_stream_id,
                    version_of_source_content_stream,
                },
            ) => Ok(vec![ContentStreamEvent::ContentStreamWasForked {
                content_stream_id,
                source_content_stream_id,
                version_of_source_content_stream,
            }]),

            (ContentStreamState::Uninitialized, _) => Err(ContentRepositoryError::NotInitialized),

            // Removed streams are gone for every command
            (ContentStreamState::Active(data), _) if data.is_removed() => {
                Err(ContentRepositoryError::ContentStreamDoesNotExistYet {
                    content_stream_id: data.id().clone(),
                })
            }

            (ContentStreamState::Active(data), command) if command.is_lifecycle_command() => {
                data.lifecycle_event(command)
            }

            (ContentStreamState::Active(data), _) if data.is_closed() => {
                Err(ContentRepositoryError::ContentStreamIsClosed {
                    content_stream_id: data.id().clone(),
                })
            }

            (ContentStreamState::Active(data), command) => {
                tracing::debug!("Handling {} on content stream {}", command.command_type(), data.id());
                data.node_events(command, services)
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ContentStreamEvent::ContentStreamWasCreated { content_stream_id } => {
                self.state = ContentStreamState::Active(Box::new(ContentStreamData::new(content_stream_id)));
            }

            // Composed histories replay the source first; the fork event rebinds identity.
            ContentStreamEvent::ContentStreamWasForked {
                content_stream_id,
                source_content_stream_id,
                version_of_source_content_stream,
            } => {
                if let ContentStreamState::Uninitialized = self.state {
                    self.state = ContentStreamState::Active(Box::new(ContentStreamData::new(content_stream_id.clone())));
                }
                if let ContentStreamState::Active(data) = &mut self.state {
                    data.id = content_stream_id;
                    data.source = Some((source_content_stream_id, version_of_source_content_stream));
                    data.status = ContentStreamStatus::Open;
                }
            }

            event => {
                let ContentStreamState::Active(data) = &mut self.state else {
                    return;
                };
                match &event {
                    ContentStreamEvent::ContentStreamWasClosed { .. } => data.status = ContentStreamStatus::Closed,
                    ContentStreamEvent::ContentStreamWasReopened { .. } => data.status = ContentStreamStatus::Open,
                    ContentStreamEvent::ContentStreamWasRemoved { .. } => data.status = ContentStreamStatus::Removed,
                    content_event => data.graph.apply(content_event),
                }
            }
        }
    }
}

impl StoredAggregate for ContentStreamAggregate {
    fn inherited_history(first_event: &ContentStreamEvent) -> Option<(String, usize)> {
        match first_event {
            ContentStreamEvent::ContentStreamWasForked {
                source_content_stream_id,
                version_of_source_content_stream,
                ..
            } => Some((source_content_stream_id.to_string(), *version_of_source_content_stream)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;
