//! The workspace aggregate: a named, movable pointer to a content stream.

use crate::domain::errors::ContentRepositoryError;
use crate::domain::types::{ContentStreamId, UserId, WorkspaceName};
use crate::event_store::StoredAggregate;
use async_trait::async_trait;
use cqrs_es::{Aggregate, DomainEvent};
use serde::{Deserialize, Serialize};

/// Why a workspace moved to another content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStreamSwitchReason {
    Rebased,
    Published,
    PartiallyPublished,
    Discarded,
    PartiallyDiscarded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceCommand {
    CreateRootWorkspace {
        workspace_name: WorkspaceName,
        title: String,
        description: String,
        new_content_stream_id: ContentStreamId,
    },
    CreateWorkspace {
        workspace_name: WorkspaceName,
        base_workspace_name: WorkspaceName,
        title: String,
        description: String,
        owner: Option<UserId>,
        new_content_stream_id: ContentStreamId,
    },
    RenameWorkspace {
        title: String,
        description: String,
    },
    ChangeWorkspaceOwner {
        owner: Option<UserId>,
    },
    SwitchContentStream {
        new_content_stream_id: ContentStreamId,
        reason: ContentStreamSwitchReason,
    },
    ChangeBaseWorkspace {
        base_workspace_name: WorkspaceName,
        new_content_stream_id: ContentStreamId,
    },
    RemoveWorkspace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceEvent {
    RootWorkspaceWasCreated {
        workspace_name: WorkspaceName,
        title: String,
        description: String,
        new_content_stream_id: ContentStreamId,
    },
    WorkspaceWasCreated {
        workspace_name: WorkspaceName,
        base_workspace_name: WorkspaceName,
        title: String,
        description: String,
        owner: Option<UserId>,
        new_content_stream_id: ContentStreamId,
    },
    WorkspaceWasRenamed {
        title: String,
        description: String,
    },
    WorkspaceOwnerWasChanged {
        owner: Option<UserId>,
    },
    WorkspaceContentStreamWasSwitched {
        new_content_stream_id: ContentStreamId,
        previous_content_stream_id: ContentStreamId,
        reason: ContentStreamSwitchReason,
    },
    WorkspaceBaseWorkspaceWasChanged {
        base_workspace_name: WorkspaceName,
        new_content_stream_id: ContentStreamId,
    },
    WorkspaceWasRemoved,
}

impl DomainEvent for WorkspaceEvent {
    fn event_type(&self) -> String {
        match self {
            Self::RootWorkspaceWasCreated { .. } => "RootWorkspaceWasCreated",
            Self::WorkspaceWasCreated { .. } => "WorkspaceWasCreated",
            Self::WorkspaceWasRenamed { .. } => "WorkspaceWasRenamed",
            Self::WorkspaceOwnerWasChanged { .. } => "WorkspaceOwnerWasChanged",
            Self::WorkspaceContentStreamWasSwitched { .. } => "WorkspaceContentStreamWasSwitched",
            Self::WorkspaceBaseWorkspaceWasChanged { .. } => "WorkspaceBaseWorkspaceWasChanged",
            Self::WorkspaceWasRemoved => "WorkspaceWasRemoved",
        }
        .to_string()
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceData {
    name: WorkspaceName,
    base_workspace_name: Option<WorkspaceName>,
    title: String,
    description: String,
    owner: Option<UserId>,
    current_content_stream_id: ContentStreamId,
}

impl WorkspaceData {
    // ========== Public Getters ==========

    pub fn name(&self) -> &WorkspaceName {
        &self.name
    }

    pub fn base_workspace_name(&self) -> Option<&WorkspaceName> {
        self.base_workspace_name.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    pub fn current_content_stream_id(&self) -> &ContentStreamId {
        &self.current_content_stream_id
    }

    pub fn is_root(&self) -> bool {
        self.base_workspace_name.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum WorkspaceState {
    #[default]
    Uninitialized,
    Active(Box<WorkspaceData>),
    Removed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceAggregate {
    pub state: WorkspaceState,
}

impl WorkspaceAggregate {
    pub fn data(&self) -> Option<&WorkspaceData> {
        match &self.state {
            WorkspaceState::Active(data) => Some(data),
            _ => None,
        }
    }
}

#[async_trait]
impl Aggregate for WorkspaceAggregate {
    type Command = WorkspaceCommand;
    type Event = WorkspaceEvent;
    type Error = ContentRepositoryError;
    type Services = ();

    fn aggregate_type() -> String {
        "Workspace".to_string()
    }

    async fn handle(&self, command: Self::Command, _services: &Self::Services) -> Result<Vec<Self::Event>, Self::Error> {
        match (&self.state, command) {
            // Creation - a removed name may be taken again
            (
                WorkspaceState::Uninitialized | WorkspaceState::Removed,
                WorkspaceCommand::CreateRootWorkspace {
                    workspace_name,
                    title,
                    description,
                    new_content_stream_id,
                },
            ) => Ok(vec![WorkspaceEvent::RootWorkspaceWasCreated {
                workspace_name,
                title,
                description,
                new_content_stream_id,
            }]),

            (
                WorkspaceState::Uninitialized | WorkspaceState::Removed,
                WorkspaceCommand::CreateWorkspace {
                    workspace_name,
                    base_workspace_name,
                    title,
                    description,
                    owner,
                    new_content_stream_id,
                },
            ) => Ok(vec![WorkspaceEvent::WorkspaceWasCreated {
                workspace_name,
                base_workspace_name,
                title,
                description,
                owner,
                new_content_stream_id,
            }]),

            (WorkspaceState::Uninitialized | WorkspaceState::Removed, _) => Err(ContentRepositoryError::NotInitialized),

            (
                WorkspaceState::Active(data),
                WorkspaceCommand::CreateRootWorkspace { .. } | WorkspaceCommand::CreateWorkspace { .. },
            ) => Err(ContentRepositoryError::WorkspaceAlreadyExists {
                workspace_name: data.name.clone(),
            }),

            (WorkspaceState::Active(_), WorkspaceCommand::RenameWorkspace { title, description }) => {
                Ok(vec![WorkspaceEvent::WorkspaceWasRenamed { title, description }])
            }

            (WorkspaceState::Active(_), WorkspaceCommand::ChangeWorkspaceOwner { owner }) => {
                Ok(vec![WorkspaceEvent::WorkspaceOwnerWasChanged { owner }])
            }

            (
                WorkspaceState::Active(data),
                WorkspaceCommand::SwitchContentStream {
                    new_content_stream_id,
                    reason,
                },
            ) => Ok(vec![WorkspaceEvent::WorkspaceContentStreamWasSwitched {
                new_content_stream_id,
                previous_content_stream_id: data.current_content_stream_id.clone(),
                reason,
            }]),

            // Root workspaces have no base to change
            (WorkspaceState::Active(data), WorkspaceCommand::ChangeBaseWorkspace { .. }) if data.is_root() => {
                Err(ContentRepositoryError::WorkspaceHasNoBaseWorkspace {
                    workspace_name: data.name.clone(),
                })
            }

            (
                WorkspaceState::Active(_),
                WorkspaceCommand::ChangeBaseWorkspace {
                    base_workspace_name,
                    new_content_stream_id,
                },
            ) => Ok(vec![WorkspaceEvent::WorkspaceBaseWorkspaceWasChanged {
                base_workspace_name,
                new_content_stream_id,
            }]),

            (WorkspaceState::Active(_), WorkspaceCommand::RemoveWorkspace) => Ok(vec![WorkspaceEvent::WorkspaceWasRemoved]),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            WorkspaceEvent::RootWorkspaceWasCreated {
                workspace_name,
                title,
                description,
                new_content_stream_id,
            } => {
                self.state = WorkspaceState::Active(Box::new(WorkspaceData {
                    name: workspace_name,
                    base_workspace_name: None,
                    title,
                    description,
                    owner: None,
                    current_content_stream_id: new_content_stream_id,
                }));
            }
            WorkspaceEvent::WorkspaceWasCreated {
                workspace_name,
                base_workspace_name,
                title,
                description,
                owner,
                new_content_stream_id,
            } => {
                self.state = WorkspaceState::Active(Box::new(WorkspaceData {
                    name: workspace_name,
                    base_workspace_name: Some(base_workspace_name),
                    title,
                    description,
                    owner,
                    current_content_stream_id: new_content_stream_id,
                }));
            }
            WorkspaceEvent::WorkspaceWasRemoved => self.state = WorkspaceState::Removed,
            event => {
                let WorkspaceState::Active(data) = &mut self.state else {
                    return;
                };
                match event {
                    WorkspaceEvent::WorkspaceWasRenamed { title, description } => {
                        data.title = title;
                        data.description = description;
                    }
                    WorkspaceEvent::WorkspaceOwnerWasChanged { owner } => data.owner = owner,
                    WorkspaceEvent::WorkspaceContentStreamWasSwitched {
                        new_content_stream_id, ..
                    } => data.current_content_stream_id = new_content_stream_id,
                    WorkspaceEvent::WorkspaceBaseWorkspaceWasChanged {
                        base_workspace_name,
                        new_content_stream_id,
                    } => {
                        data.base_workspace_name = Some(base_workspace_name);
                        data.current_content_stream_id = new_content_stream_id;
                    }
                    _ => {}
                }
            }
        }
    }
}

impl StoredAggregate for WorkspaceAggregate {}

#[cfg(test)]
#[path = "tests/aggregate_tests.rs"]
mod tests;
