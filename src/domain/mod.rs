//! Event-sourced domain model of the content graph.
//!
//! Every change to a content stream is a command handled by the
//! `ContentStreamAggregate`, validated against the stream's current content
//! graph, and persisted as events appended to the stream.
//!
//! # Architecture
//!
//! - **Commands** (`cqrs/commands.rs`): intent to change one content stream
//! - **Events** (`cqrs/events.rs`): facts appended to the stream
//! - **Aggregate** (`cqrs/mod.rs`): lifecycle checks and event application
//! - **Features** (`features/`): one handler module per node concern
//! - **Graph** (`graph.rs`, `subgraph.rs`): in-memory state and read queries
//!
//! # Usage
//!
//! ```ignore
//! use contentgraph::domain::{ContentStreamCommand, CommandContext};
//!
//! let command = ContentStreamCommand::CreateContentStream { content_stream_id };
//! repository.handle(&content_stream_id, command, &CommandContext::system()).await?;
//! ```

pub mod command_result;
pub mod cqrs;
pub mod errors;
pub mod features;
pub mod graph;
pub mod node_aggregate;
pub mod properties;
pub(crate) mod serde_pairs;
pub mod services;
pub mod strategies;
pub mod subgraph;
pub mod types;

// Re-export CQRS types
pub use cqrs::*;

// Re-export commonly used types for convenience
pub use command_result::{CommandResult, RecordedEvent};
pub use errors::{ContentRepositoryError, ErrorCategory, RebaseConflict};
pub use features::copying::{NodeAggregateIdMapping, NodeSubtreeSnapshot};
pub use graph::ContentGraph;
pub use node_aggregate::{NodeAggregate, NodeCoverage, NodeVariant};
pub use properties::{NodeReference, PropertyValuesToWrite, SerializedPropertyValue, SerializedPropertyValues};
pub use services::{ContentRepositoryServices, RepositoryClock};
pub use strategies::{
    NodeAggregateTypeChangeConflictResolutionStrategy, NodeVariantSelectionStrategy, RelationDistributionStrategy,
};
pub use subgraph::{ContentSubgraph, Node, VisibilityConstraints};
pub use types::{
    ContentStreamId, NodeAggregateClassification, NodeAggregateId, NodeAggregateIdsByNodePaths, NodeName,
    NodeTypeName, PropertyName, ReferenceName, TimestampUtc, UserId, WorkspaceName,
};
