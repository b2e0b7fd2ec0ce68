use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contentgraph::domain::cqrs::commands::{CommandContext, ContentStreamCommand, CreateRootNodeAggregateWithNode};
use contentgraph::domain::types::{ContentStreamId, NodeAggregateId, NodeTypeName, UserId, WorkspaceName};
use contentgraph::migration::{Migration, MigrationConfiguration};
use contentgraph::workspace::RebaseErrorHandlingStrategy;
use contentgraph::{logging, ContentRepository, RepositoryConfig};
use cqrs_es::DomainEvent;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "contentgraph")]
#[command(about = "Event-sourced content repository with workspaces and dimension variants")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Configuration file (defaults to $CONTENTGRAPH_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Acting user recorded in command metadata
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the live workspace with a root node aggregate
    Init {
        /// Node type of the root node aggregate
        #[arg(long)]
        root_type: String,
    },
    /// Manage workspaces
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Run a migration file from one workspace into another
    Migrate {
        file: PathBuf,
        #[arg(long, default_value = "live")]
        source: String,
        #[arg(long)]
        target: String,
    },
    /// Print the own events of a content stream
    Events { content_stream_id: String },
}

#[derive(Subcommand)]
enum WorkspaceCommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "live")]
        base: String,
        #[arg(long)]
        title: Option<String>,
    },
    Rebase {
        name: String,
        /// Abort on the first conflicting change instead of skipping it
        #[arg(long)]
        fail_on_conflict: bool,
    },
    Publish { name: String },
    Discard { name: String },
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = RepositoryConfig::resolve(cli.config.as_deref())?;
    let storage = config.storage_path()?;
    std::fs::create_dir_all(&storage)
        .with_context(|| format!("Failed to create storage directory: {}", storage.display()))?;
    debug!("Using storage at {}", storage.display());

    let repository = ContentRepository::open(&storage, config.services()?);
    let context = cli
        .user
        .as_deref()
        .map(|user| CommandContext::new(UserId::from(user)))
        .unwrap_or_else(CommandContext::system);

    match cli.command {
        Command::Init { root_type } => init(&repository, &root_type, &context).await,
        Command::Workspace(command) => workspace(&repository, command, &context).await,
        Command::Migrate { file, source, target } => {
            let configuration = MigrationConfiguration::from_file(&file)?;
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "migration".to_string());
            let migration = Migration::from_configuration(&name, &configuration)?;
            let result = repository
                .execute_migration(
                    &migration,
                    &WorkspaceName::from(source.as_str()),
                    &WorkspaceName::from(target.as_str()),
                    &ContentStreamId::create(),
                    &context,
                )
                .await?;
            println!("Migration {} wrote {} event(s)", migration.name, result.len());
            Ok(())
        }
        Command::Events { content_stream_id } => {
            let id = ContentStreamId::from(content_stream_id.as_str());
            for envelope in repository.content_stream_events(&id)? {
                println!(
                    "{:>6}  {}  {}",
                    envelope.sequence,
                    envelope.payload.event_type(),
                    serde_json::to_string(&envelope.payload)?
                );
            }
            Ok(())
        }
    }
}

async fn init(repository: &ContentRepository, root_type: &str, context: &CommandContext) -> Result<()> {
    let live = WorkspaceName::live();
    let content_stream_id = ContentStreamId::create();
    repository
        .create_root_workspace(&live, "Live", &content_stream_id, context)
        .await?;
    let root = NodeAggregateId::create();
    repository
        .handle(
            &content_stream_id,
            ContentStreamCommand::CreateRootNodeAggregateWithNode(CreateRootNodeAggregateWithNode {
                node_aggregate_id: root.clone(),
                node_type_name: NodeTypeName::from(root_type),
            }),
            context,
        )
        .await?;
    println!("Created workspace {} on {} with root {}", live, content_stream_id, root);
    Ok(())
}

async fn workspace(repository: &ContentRepository, command: WorkspaceCommand, context: &CommandContext) -> Result<()> {
    match command {
        WorkspaceCommand::List => {
            for workspace in repository.find_workspaces().await? {
                let status = repository.workspace_status(workspace.name()).await?;
                println!(
                    "{:<20} base={:<12} stream={}  {:?}",
                    workspace.name(),
                    workspace.base_workspace_name().map(|b| b.as_str()).unwrap_or("-"),
                    workspace.current_content_stream_id(),
                    status
                );
            }
        }
        WorkspaceCommand::Create { name, base, title } => {
            let name = WorkspaceName::from(name.as_str());
            let title = title.unwrap_or_else(|| name.to_string());
            repository
                .create_workspace(
                    &name,
                    &WorkspaceName::from(base.as_str()),
                    &title,
                    Some(context.initiating_user_id.clone()),
                    &ContentStreamId::create(),
                    context,
                )
                .await?;
            println!("Created workspace {}", name);
        }
        WorkspaceCommand::Rebase { name, fail_on_conflict } => {
            let strategy = if fail_on_conflict {
                RebaseErrorHandlingStrategy::Fail
            } else {
                RebaseErrorHandlingStrategy::Force
            };
            let result = repository
                .rebase_workspace(
                    &WorkspaceName::from(name.as_str()),
                    &ContentStreamId::create(),
                    strategy,
                    context,
                )
                .await?;
            for conflict in &result.conflicts {
                eprintln!(
                    "conflict: #{} {}: {}",
                    conflict.position, conflict.command_type, conflict.message
                );
            }
            println!("Rebased {} ({} conflict(s))", name, result.conflicts.len());
        }
        WorkspaceCommand::Publish { name } => {
            let result = repository
                .publish_workspace(&WorkspaceName::from(name.as_str()), &ContentStreamId::create(), context)
                .await?;
            println!("Published {} ({} event(s))", name, result.len());
        }
        WorkspaceCommand::Discard { name } => {
            repository
                .discard_workspace(&WorkspaceName::from(name.as_str()), &ContentStreamId::create(), context)
                .await?;
            println!("Discarded all changes in {}", name);
        }
        WorkspaceCommand::Delete { name } => {
            repository
                .delete_workspace(&WorkspaceName::from(name.as_str()), context)
                .await?;
            println!("Deleted workspace {}", name);
        }
    }
    Ok(())
}
