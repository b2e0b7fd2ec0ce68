use super::*;

fn user_workspace() -> WorkspaceAggregate {
    let mut aggregate = WorkspaceAggregate::default();
    aggregate.apply(WorkspaceEvent::WorkspaceWasCreated {
        workspace_name: WorkspaceName::from("user-jane"),
        base_workspace_name: WorkspaceName::live(),
        title: "Jane".to_string(),
        description: String::new(),
        owner: Some(UserId::from("jane")),
        new_content_stream_id: ContentStreamId::from("cs-1"),
    });
    aggregate
}

fn live_workspace() -> WorkspaceAggregate {
    let mut aggregate = WorkspaceAggregate::default();
    aggregate.apply(WorkspaceEvent::RootWorkspaceWasCreated {
        workspace_name: WorkspaceName::live(),
        title: "Live".to_string(),
        description: String::new(),
        new_content_stream_id: ContentStreamId::from("cs-live"),
    });
    aggregate
}

#[tokio::test]
async fn create_on_uninitialized_succeeds() {
    let aggregate = WorkspaceAggregate::default();

    let events = aggregate
        .handle(
            WorkspaceCommand::CreateRootWorkspace {
                workspace_name: WorkspaceName::live(),
                title: "Live".to_string(),
                description: String::new(),
                new_content_stream_id: ContentStreamId::from("cs-live"),
            },
            &(),
        )
        .await
        .unwrap();

    assert!(matches!(&events[..], [WorkspaceEvent::RootWorkspaceWasCreated { .. }]));
}

#[tokio::test]
async fn create_on_existing_workspace_is_rejected() {
    let aggregate = live_workspace();

    let result = aggregate
        .handle(
            WorkspaceCommand::CreateRootWorkspace {
                workspace_name: WorkspaceName::live(),
                title: "Live".to_string(),
                description: String::new(),
                new_content_stream_id: ContentStreamId::from("cs-other"),
            },
            &(),
        )
        .await;

    assert!(matches!(result, Err(ContentRepositoryError::WorkspaceAlreadyExists { .. })));
}

#[tokio::test]
async fn commands_on_missing_workspace_are_rejected() {
    let aggregate = WorkspaceAggregate::default();

    let result = aggregate.handle(WorkspaceCommand::RemoveWorkspace, &()).await;

    assert!(matches!(result, Err(ContentRepositoryError::NotInitialized)));
}

#[tokio::test]
async fn switch_records_the_previous_stream() {
    let mut aggregate = user_workspace();

    let events = aggregate
        .handle(
            WorkspaceCommand::SwitchContentStream {
                new_content_stream_id: ContentStreamId::from("cs-2"),
                reason: ContentStreamSwitchReason::Rebased,
            },
            &(),
        )
        .await
        .unwrap();
    for event in events.clone() {
        aggregate.apply(event);
    }

    assert_eq!(
        events,
        vec![WorkspaceEvent::WorkspaceContentStreamWasSwitched {
            new_content_stream_id: ContentStreamId::from("cs-2"),
            previous_content_stream_id: ContentStreamId::from("cs-1"),
            reason: ContentStreamSwitchReason::Rebased,
        }]
    );
    assert_eq!(aggregate.data().unwrap().current_content_stream_id(), &ContentStreamId::from("cs-2"));
}

#[tokio::test]
async fn root_workspace_has_no_base_to_change() {
    let aggregate = live_workspace();

    let result = aggregate
        .handle(
            WorkspaceCommand::ChangeBaseWorkspace {
                base_workspace_name: WorkspaceName::from("review"),
                new_content_stream_id: ContentStreamId::from("cs-2"),
            },
            &(),
        )
        .await;

    assert!(matches!(result, Err(ContentRepositoryError::WorkspaceHasNoBaseWorkspace { .. })));
}

#[test]
fn rename_owner_and_base_changes_update_the_data() {
    let mut aggregate = user_workspace();

    aggregate.apply(WorkspaceEvent::WorkspaceWasRenamed {
        title: "Jane's drafts".to_string(),
        description: "Spring campaign".to_string(),
    });
    aggregate.apply(WorkspaceEvent::WorkspaceOwnerWasChanged { owner: None });
    aggregate.apply(WorkspaceEvent::WorkspaceBaseWorkspaceWasChanged {
        base_workspace_name: WorkspaceName::from("review"),
        new_content_stream_id: ContentStreamId::from("cs-3"),
    });

    let data = aggregate.data().unwrap();
    assert_eq!(data.title(), "Jane's drafts");
    assert_eq!(data.description(), "Spring campaign");
    assert_eq!(data.owner(), None);
    assert_eq!(data.base_workspace_name(), Some(&WorkspaceName::from("review")));
    assert_eq!(data.current_content_stream_id(), &ContentStreamId::from("cs-3"));
    assert!(!data.is_root());
}

#[tokio::test]
async fn removed_name_can_be_taken_again() {
    let mut aggregate = user_workspace();
    aggregate.apply(WorkspaceEvent::WorkspaceWasRemoved);
    assert!(aggregate.data().is_none());

    let events = aggregate
        .handle(
            WorkspaceCommand::CreateWorkspace {
                workspace_name: WorkspaceName::from("user-jane"),
                base_workspace_name: WorkspaceName::live(),
                title: "Jane".to_string(),
                description: String::new(),
                owner: None,
                new_content_stream_id: ContentStreamId::from("cs-9"),
            },
            &(),
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(WorkspaceAggregate::stream_name("user-jane"), "Workspace-user-jane");
}
