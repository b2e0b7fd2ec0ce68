//! Error types for the content repository.

use crate::dimension::{DimensionSpacePoint, OriginDimensionSpacePoint};
use crate::domain::types::{
    ContentStreamId, NodeAggregateId, NodeName, NodeTypeName, PropertyName, ReferenceName,
    WorkspaceName,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Coarse classification used by callers to decide how to react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A referenced content stream, node aggregate, dimension point, node type or workspace does not exist.
    NotFound,
    /// The command would violate a structural, type or dimension constraint.
    ConstraintViolation,
    /// The command raced with another writer or no longer applies to the current base.
    Conflict,
    /// Persistence failed.
    Storage,
}

/// A command that could not be replayed during a rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseConflict {
    /// Position of the command in the workspace's divergent history (0-based).
    pub position: usize,
    pub command_type: String,
    pub message: String,
}

/// Errors that can occur while handling content repository commands.
#[derive(Debug, Clone)]
pub enum ContentRepositoryError {
    /// Command executed on a content stream that was never created.
    NotInitialized,
    ContentStreamDoesNotExistYet {
        content_stream_id: ContentStreamId,
    },
    ContentStreamAlreadyExists {
        content_stream_id: ContentStreamId,
    },
    ContentStreamIsClosed {
        content_stream_id: ContentStreamId,
    },
    ContentStreamIsNotClosed {
        content_stream_id: ContentStreamId,
    },
    NodeAggregateCurrentlyDoesNotExist {
        node_aggregate_id: NodeAggregateId,
    },
    NodeAggregateCurrentlyExists {
        node_aggregate_id: NodeAggregateId,
    },
    NodeAggregateDoesCurrentlyNotCoverDimensionSpacePoint {
        node_aggregate_id: NodeAggregateId,
        dimension_space_point: DimensionSpacePoint,
    },
    NodeAggregateDoesCurrentlyNotOccupyDimensionSpacePoint {
        node_aggregate_id: NodeAggregateId,
        origin: OriginDimensionSpacePoint,
    },
    DimensionSpacePointIsAlreadyOccupied {
        node_aggregate_id: NodeAggregateId,
        origin: OriginDimensionSpacePoint,
    },
    DimensionSpacePointNotFound {
        dimension_space_point: DimensionSpacePoint,
    },
    DimensionSpacePointAlreadyInUse {
        dimension_space_point: DimensionSpacePoint,
    },
    NodeTypeNotFound {
        node_type_name: NodeTypeName,
    },
    NodeTypeIsAbstract {
        node_type_name: NodeTypeName,
    },
    NodeTypeIsNotOfTypeRoot {
        node_type_name: NodeTypeName,
    },
    NodeTypeIsOfTypeRoot {
        node_type_name: NodeTypeName,
    },
    NodeAggregateIsRoot {
        node_aggregate_id: NodeAggregateId,
    },
    NodeAggregateIsTethered {
        node_aggregate_id: NodeAggregateId,
    },
    /// A parent or grandparent node type does not allow the child's node type.
    NodeConstraintViolation { message: String },
    NodeAggregateIsDescendant {
        node_aggregate_id: NodeAggregateId,
        new_parent_node_aggregate_id: NodeAggregateId,
    },
    NodeNameIsAlreadyCovered {
        node_name: NodeName,
        parent_node_aggregate_id: NodeAggregateId,
    },
    PropertyCannotBeSet {
        property_name: PropertyName,
        node_type_name: NodeTypeName,
        reason: String,
    },
    ReferenceCannotBeSet {
        reference_name: ReferenceName,
        node_type_name: NodeTypeName,
        reason: String,
    },
    UnsupportedStrategy { message: String },
    InvalidConfiguration { message: String },
    WorkspaceDoesNotExist {
        workspace_name: WorkspaceName,
    },
    WorkspaceAlreadyExists {
        workspace_name: WorkspaceName,
    },
    WorkspaceHasNoBaseWorkspace {
        workspace_name: WorkspaceName,
    },
    WorkspaceIsNotEmpty {
        workspace_name: WorkspaceName,
    },
    WorkspaceHasDependents {
        workspace_name: WorkspaceName,
    },
    CircularRelationBetweenWorkspaces {
        workspace_name: WorkspaceName,
    },
    BaseWorkspaceHasBeenModifiedInTheMeantime {
        workspace_name: WorkspaceName,
        expected_version: usize,
        actual_version: usize,
    },
    WorkspaceRebaseFailed {
        workspace_name: WorkspaceName,
        conflicts: Vec<RebaseConflict>,
    },
    /// Optimistic lock failure (concurrent modification detected).
    ConcurrencyConflict { message: String },
    /// Storage/persistence failure.
    StorageFailure { message: String },
}

impl ContentRepositoryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotInitialized
            | Self::ContentStreamDoesNotExistYet { .. }
            | Self::NodeAggregateCurrentlyDoesNotExist { .. }
            | Self::NodeAggregateDoesCurrentlyNotCoverDimensionSpacePoint { .. }
            | Self::NodeAggregateDoesCurrentlyNotOccupyDimensionSpacePoint { .. }
            | Self::DimensionSpacePointNotFound { .. }
            | Self::NodeTypeNotFound { .. }
            | Self::WorkspaceDoesNotExist { .. } => ErrorCategory::NotFound,
            Self::BaseWorkspaceHasBeenModifiedInTheMeantime { .. }
            | Self::WorkspaceRebaseFailed { .. }
            | Self::ConcurrencyConflict { .. } => ErrorCategory::Conflict,
            Self::StorageFailure { .. } => ErrorCategory::Storage,
            _ => ErrorCategory::ConstraintViolation,
        }
    }
}

impl Display for ContentRepositoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "content stream not initialized"),
            Self::ContentStreamDoesNotExistYet { content_stream_id } => {
                write!(f, "content stream {} does not exist yet", content_stream_id)
            }
            Self::ContentStreamAlreadyExists { content_stream_id } => {
                write!(f, "content stream {} already exists", content_stream_id)
            }
            Self::ContentStreamIsClosed { content_stream_id } => {
                write!(f, "content stream {} is closed", content_stream_id)
            }
            Self::ContentStreamIsNotClosed { content_stream_id } => {
                write!(f, "content stream {} is not closed", content_stream_id)
            }
            Self::NodeAggregateCurrentlyDoesNotExist { node_aggregate_id } => {
                write!(f, "node aggregate {} does currently not exist", node_aggregate_id)
            }
            Self::NodeAggregateCurrentlyExists { node_aggregate_id } => {
                write!(f, "node aggregate {} does currently exist", node_aggregate_id)
            }
            Self::NodeAggregateDoesCurrentlyNotCoverDimensionSpacePoint {
                node_aggregate_id,
                dimension_space_point,
            } => write!(
                f,
                "node aggregate {} does currently not cover {}",
                node_aggregate_id, dimension_space_point
            ),
            Self::NodeAggregateDoesCurrentlyNotOccupyDimensionSpacePoint {
                node_aggregate_id,
                origin,
            } => write!(
                f,
                "node aggregate {} does currently not occupy {}",
                node_aggregate_id, origin
            ),
            Self::DimensionSpacePointIsAlreadyOccupied {
                node_aggregate_id,
                origin,
            } => write!(
                f,
                "node aggregate {} already occupies {}",
                node_aggregate_id, origin
            ),
            Self::DimensionSpacePointNotFound {
                dimension_space_point,
            } => write!(
                f,
                "dimension space point {} is not allowed",
                dimension_space_point
            ),
            Self::DimensionSpacePointAlreadyInUse {
                dimension_space_point,
            } => write!(
                f,
                "dimension space point {} is already in use",
                dimension_space_point
            ),
            Self::NodeTypeNotFound { node_type_name } => {
                write!(f, "node type {} not found", node_type_name)
            }
            Self::NodeTypeIsAbstract { node_type_name } => {
                write!(f, "node type {} is abstract", node_type_name)
            }
            Self::NodeTypeIsNotOfTypeRoot { node_type_name } => {
                write!(f, "node type {} is not of type root", node_type_name)
            }
            Self::NodeTypeIsOfTypeRoot { node_type_name } => {
                write!(f, "node type {} is of type root", node_type_name)
            }
            Self::NodeAggregateIsRoot { node_aggregate_id } => {
                write!(f, "node aggregate {} is a root node aggregate", node_aggregate_id)
            }
            Self::NodeAggregateIsTethered { node_aggregate_id } => {
                write!(f, "node aggregate {} is tethered", node_aggregate_id)
            }
            Self::NodeConstraintViolation { message } => {
                write!(f, "node constraint violation: {}", message)
            }
            Self::NodeAggregateIsDescendant {
                node_aggregate_id,
                new_parent_node_aggregate_id,
            } => write!(
                f,
                "node aggregate {} is an ancestor of {}",
                node_aggregate_id, new_parent_node_aggregate_id
            ),
            Self::NodeNameIsAlreadyCovered {
                node_name,
                parent_node_aggregate_id,
            } => write!(
                f,
                "node name {} is already covered below {}",
                node_name, parent_node_aggregate_id
            ),
            Self::PropertyCannotBeSet {
                property_name,
                node_type_name,
                reason,
            } => write!(
                f,
                "property {} cannot be set on node type {}: {}",
                property_name, node_type_name, reason
            ),
            Self::ReferenceCannotBeSet {
                reference_name,
                node_type_name,
                reason,
            } => write!(
                f,
                "reference {} cannot be set on node type {}: {}",
                reference_name, node_type_name, reason
            ),
            Self::UnsupportedStrategy { message } => write!(f, "unsupported strategy: {}", message),
            Self::InvalidConfiguration { message } => {
                write!(f, "invalid configuration: {}", message)
            }
            Self::WorkspaceDoesNotExist { workspace_name } => {
                write!(f, "workspace {} does not exist", workspace_name)
            }
            Self::WorkspaceAlreadyExists { workspace_name } => {
                write!(f, "workspace {} already exists", workspace_name)
            }
            Self::WorkspaceHasNoBaseWorkspace { workspace_name } => {
                write!(f, "workspace {} has no base workspace", workspace_name)
            }
            Self::WorkspaceIsNotEmpty { workspace_name } => {
                write!(f, "workspace {} has pending changes", workspace_name)
            }
            Self::WorkspaceHasDependents { workspace_name } => {
                write!(f, "other workspaces are based on {}", workspace_name)
            }
            Self::CircularRelationBetweenWorkspaces { workspace_name } => write!(
                f,
                "changing the base of {} would create a circular relation",
                workspace_name
            ),
            Self::BaseWorkspaceHasBeenModifiedInTheMeantime {
                workspace_name,
                expected_version,
                actual_version,
            } => write!(
                f,
                "base of workspace {} has been modified in the meantime (expected version {}, found {}); rebase first",
                workspace_name, expected_version, actual_version
            ),
            Self::WorkspaceRebaseFailed {
                workspace_name,
                conflicts,
            } => write!(
                f,
                "rebase of workspace {} failed with {} conflicting command(s)",
                workspace_name,
                conflicts.len()
            ),
            Self::ConcurrencyConflict { message } => write!(f, "concurrency conflict: {}", message),
            Self::StorageFailure { message } => write!(f, "storage failure: {}", message),
        }
    }
}

impl std::error::Error for ContentRepositoryError {}

impl From<cqrs_es::AggregateError<ContentRepositoryError>> for ContentRepositoryError {
    fn from(error: cqrs_es::AggregateError<ContentRepositoryError>) -> Self {
        match error {
            cqrs_es::AggregateError::UserError(inner) => inner,
            cqrs_es::AggregateError::AggregateConflict => Self::ConcurrencyConflict {
                message: "stream was appended to concurrently".to_string(),
            },
            other => Self::StorageFailure {
                message: other.to_string(),
            },
        }
    }
}
