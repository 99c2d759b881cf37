//! Cadence CLI - phase-gated workflow control
//!
//! Usage:
//!   cadence init                              Initialize Cadence in current repo
//!   cadence check <command...>                Classify a shell command
//!   cadence authorize --session <id> <cmd...> Authorize a shell tool call
//!   cadence status --session <id>             Show pause state of a session
//!   cadence resume --session <id> [text]      Resume a paused session
//!   cadence skills                            List available skills

use anyhow::{Context, Result};
use cadence_core::config::CADENCE_DIR;
use cadence_core::CadenceConfig;
use cadence_metrics::{counters, JsonlTelemetrySink};
use cadence_orchestrator::risk::{self, CommandRisk};
use cadence_orchestrator::{FileSessionStore, WorkflowManager};
use cadence_skills::{InMemorySkillRegistry, SkillManager};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit status when a command stops on a pause
const PAUSED_EXIT_CODE: i32 = 2;

/// Telemetry log inside the Cadence directory
const TELEMETRY_FILE: &str = "telemetry.jsonl";

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Phase-gated workflow orchestration")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root (defaults to current directory)
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write default config and state directories
    Init,

    /// Classify a shell command as safe, elevated or unclassified
    Check {
        /// Command text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Authorize a shell tool call, pausing the session if it needs elevation
    Authorize {
        /// Session identifier
        #[arg(long)]
        session: String,

        /// Tool name
        #[arg(long, default_value = "bash")]
        tool: String,

        /// Command text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show the pause state of a session
    Status {
        /// Session identifier
        #[arg(long)]
        session: String,
    },

    /// Resume a paused session
    Resume {
        /// Session identifier
        #[arg(long)]
        session: String,

        /// How the pause was resolved
        #[arg(default_value = "")]
        resolution: String,
    },

    /// List skill descriptions
    Skills {
        /// Directory of skill definitions (defaults to .cadence/skills)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG overrides --verbose
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    counters::init();

    match cli.command {
        Commands::Init => cmd_init(&cli.repo).await,
        Commands::Check { command } => cmd_check(&cli.repo, &command.join(" ")),
        Commands::Authorize {
            session,
            tool,
            command,
        } => cmd_authorize(&cli.repo, &session, &tool, &command.join(" ")).await,
        Commands::Status { session } => cmd_status(&cli.repo, &session).await,
        Commands::Resume {
            session,
            resolution,
        } => cmd_resume(&cli.repo, &session, &resolution).await,
        Commands::Skills { dir } => cmd_skills(&cli.repo, dir),
    }
}

fn load_config(repo: &Path) -> Result<CadenceConfig> {
    CadenceConfig::load_or_default(repo).context("Failed to load .cadence/config.toml")
}

/// Workflow manager bound to a file-backed session
fn session_manager(repo: &Path, session: &str) -> Result<WorkflowManager> {
    let config = load_config(repo)?;
    let store = FileSessionStore::new(config.sessions_dir(repo));
    // Reject bad ids before any state is touched
    store.session_path(session)?;
    debug!("Using session store at {:?}", store.dir());

    let telemetry = JsonlTelemetrySink::new(repo.join(CADENCE_DIR).join(TELEMETRY_FILE));

    Ok(WorkflowManager::new(config)
        .with_session(Arc::new(store), session)
        .with_telemetry(Arc::new(telemetry)))
}

async fn cmd_init(repo: &Path) -> Result<()> {
    info!("Initializing Cadence in {:?}", repo);

    let config_path = CadenceConfig::write_default(repo)?;
    let config = CadenceConfig::default();
    tokio::fs::create_dir_all(config.sessions_dir(repo)).await?;
    tokio::fs::create_dir_all(repo.join(CADENCE_DIR).join("skills")).await?;

    println!("Initialized Cadence in {:?}", repo);
    println!("Created:");
    println!("  {}", config_path.display());
    println!("  {}/", config.sessions.dir.display());
    println!("  {}/skills/", CADENCE_DIR);

    Ok(())
}

fn cmd_check(repo: &Path, command: &str) -> Result<()> {
    let config = load_config(repo)?;
    let auth = &config.authorization;

    let classification = risk::classify_with(command, &auth.safe_prefixes);
    println!("{}: {}", classification, risk::summarize_command(command, auth.summary_max_chars));

    if classification == CommandRisk::Elevated {
        println!("{}", risk::elevation_question(command, auth.summary_max_chars));
    }

    Ok(())
}

async fn cmd_authorize(repo: &Path, session: &str, tool: &str, command: &str) -> Result<()> {
    let manager = session_manager(repo, session)?;

    match manager
        .authorize_tool_call(tool, &json!({ "command": command }))
        .await
    {
        Ok(()) => {
            println!("Authorized");
            Ok(())
        }
        Err(e) => match e.pause_details() {
            Some((reason, question)) => {
                println!("Paused ({})", reason);
                println!("{}", question);
                println!();
                println!("Run 'cadence resume --session {}' once approved", session);
                std::process::exit(PAUSED_EXIT_CODE);
            }
            None => Err(e.into()),
        },
    }
}

async fn cmd_status(repo: &Path, session: &str) -> Result<()> {
    let manager = session_manager(repo, session)?;
    manager.restore_pause_state_from_session().await;
    let info = manager.get_pause_info().await;

    println!("Cadence Session {}", session);
    println!("==================");

    if !info.paused {
        println!("Status: active");
        return Ok(());
    }

    println!("Status:   paused");
    println!("Reason:   {}", info.reason);
    println!("Question: {}", info.question);
    if let Some(at) = info.paused_at {
        println!("Since:    {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    Ok(())
}

async fn cmd_resume(repo: &Path, session: &str, resolution: &str) -> Result<()> {
    let manager = session_manager(repo, session)?;

    if !manager.restore_pause_state_from_session().await {
        println!("Session {} is not paused", session);
        return Ok(());
    }

    manager.resume(resolution).await;
    println!("Resumed session {}", session);

    Ok(())
}

fn cmd_skills(repo: &Path, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| repo.join(CADENCE_DIR).join("skills"));
    let registry = InMemorySkillRegistry::load_dir(&dir)
        .with_context(|| format!("Failed to load skills from {:?}", dir))?;

    if registry.is_empty() {
        println!("No skills found in {:?}", dir);
        return Ok(());
    }

    let skills = SkillManager::new(Some(Arc::new(registry)), None);
    println!("{}", skills.skills_description());

    Ok(())
}
