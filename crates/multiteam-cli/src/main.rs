mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use multiteam_agent::{ProviderRegistry, ProviderResolver};
use multiteam_orchestrator::CancellationToken;
use multiteam_registry::{build_orchestrator, FileProjectRegistry, ProjectRecord, ProjectRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "multiteam", about = "multiteam: run goals through teams of actors")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "multiteam.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stored projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Run a goal through a stored project
    Run {
        /// Project id
        id: Uuid,
        /// Goal handed to the teams
        goal: String,
        /// Print per-role metrics to stderr after the run
        #[arg(long)]
        metrics: bool,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Import a project definition from a TOML file
    Import {
        file: PathBuf,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List stored projects
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Print a stored project as JSON
    Show { id: Uuid },
    /// Delete a stored project
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(&cli.config).await?;
    let registry = FileProjectRegistry::new(config.projects_dir()).await?;

    match cli.command {
        Commands::Project { action } => match action {
            ProjectAction::Import { file, owner } => {
                let raw = tokio::fs::read_to_string(&file).await.map_err(|e| {
                    anyhow::anyhow!("Failed to read project file '{}': {e}", file.display())
                })?;
                let mut record = ProjectRecord::from_toml_str(&raw)?;
                if let Some(owner) = owner.or_else(|| config.default_owner.clone()) {
                    record.owner = owner;
                }
                if record.owner.trim().is_empty() {
                    anyhow::bail!("No owner given: pass --owner or set default_owner in the config");
                }
                let stored = registry.save(&record).await?;
                info!(project = %stored.id, owner = %stored.owner, "Project imported");
                println!("{}", stored.id);
            }
            ProjectAction::List { owner } => {
                let projects = match owner.or_else(|| config.default_owner.clone()) {
                    Some(owner) => registry.list_for_owner(&owner).await?,
                    None => registry.list().await?,
                };
                if projects.is_empty() {
                    println!("No projects stored.");
                    println!("Import one with: multiteam project import <file.toml> --owner <name>");
                } else {
                    for p in &projects {
                        println!(
                            "{}  {}  owner={} teams={}{}",
                            p.id,
                            p.name,
                            p.owner,
                            p.teams,
                            if p.global { " +global" } else { "" }
                        );
                    }
                    println!("\nTotal: {} project(s)", projects.len());
                }
            }
            ProjectAction::Show { id } => {
                let record = registry
                    .load(id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Project {id} not found"))?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            ProjectAction::Delete { id } => {
                if registry.delete(id).await? {
                    println!("Deleted {id}");
                } else {
                    anyhow::bail!("Project {id} not found");
                }
            }
        },
        Commands::Run { id, goal, metrics } => {
            let record = registry
                .load(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Project {id} not found"))?;
            let resolver: Arc<dyn ProviderResolver> = Arc::new(ProviderRegistry::with_builtin());
            let orchestrator = build_orchestrator(&record, resolver)?;

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling run");
                    trigger.cancel();
                }
            });

            info!(project = %id, goal = %goal, "Running project");
            let result = orchestrator.run_project_with(&goal, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if metrics {
                let snapshot = orchestrator.monitor().to_json();
                eprintln!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
    }

    Ok(())
}
