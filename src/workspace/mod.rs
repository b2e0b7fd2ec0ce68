//! Workspaces: named pointers to content streams, arranged as a tree of
//! bases, plus the publish/rebase/discard orchestration over them.

pub mod aggregate;
pub mod lifecycle;

pub use aggregate::{
    ContentStreamSwitchReason, WorkspaceAggregate, WorkspaceCommand, WorkspaceData, WorkspaceEvent, WorkspaceState,
};
pub use lifecycle::{NodeAddress, RebaseErrorHandlingStrategy, RebaseResult, WorkspaceStatus};
