mod cmd_apply;
mod cmd_artifact;
mod cmd_audit;
mod cmd_checkpoint;
mod cmd_config;
mod cmd_init;
mod cmd_session;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vellum_conductor::Workspace;
use vellum_ledger::VellumPaths;

#[derive(Parser)]
#[command(
    name = "vellum",
    version,
    about = "Versioned artifacts with checkpoints and transactional changesets"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .vellum/ workspace in the current directory
    Init,
    /// Create, read, update and delete artifacts
    Artifact {
        #[command(subcommand)]
        cmd: cmd_artifact::ArtifactCmd,
    },
    /// Create, list, show and restore checkpoints
    Checkpoint {
        #[command(subcommand)]
        cmd: cmd_checkpoint::CheckpointCmd,
    },
    /// Manage sessions and their turns
    Session {
        #[command(subcommand)]
        cmd: cmd_session::SessionCmd,
    },
    /// Apply a JSON change list as one transaction
    Apply {
        /// File holding a JSON array of {operation, file_path, new_content?, reason?}
        file: PathBuf,
        /// Confine the changeset to this session's directory
        #[arg(long)]
        session: Option<String>,
        /// Command that must succeed after the changes are applied
        #[arg(long)]
        verify: Option<String>,
        /// Verification timeout in seconds (defaults to verify_timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read or write workspace config (.vellum/config.json)
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Show recorded artifact mutations (.vellum/audit.jsonl)
    Audit {
        /// Only show the most recent N records (0 = all)
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = std::env::var("VELLUM_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .init();
}

/// Locate the workspace containing `cwd`.
pub(crate) fn workspace_root(cwd: &Path) -> anyhow::Result<PathBuf> {
    VellumPaths::find_root(cwd)
        .ok_or_else(|| anyhow::anyhow!("No .vellum/ workspace found. Run `vellum init` first."))
}

pub(crate) fn open_workspace(cwd: &Path) -> anyhow::Result<Workspace> {
    Workspace::open(workspace_root(cwd)?)
}

/// Run a future on a fresh runtime.
pub(crate) fn block_on<F: std::future::Future>(fut: F) -> anyhow::Result<F::Output> {
    Ok(tokio::runtime::Runtime::new()?.block_on(fut))
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => cmd_init::execute(&cwd),
        Command::Artifact { cmd } => cmd_artifact::run(cmd, &cwd),
        Command::Checkpoint { cmd } => cmd_checkpoint::run(cmd, &cwd),
        Command::Session { cmd } => cmd_session::run(cmd, &cwd),
        Command::Apply {
            file,
            session,
            verify,
            timeout,
            json,
        } => cmd_apply::execute(&cmd_apply::ApplyParams {
            cwd: &cwd,
            file: &file,
            session: session.as_deref(),
            verify: verify.as_deref(),
            timeout_secs: timeout,
            json,
        }),
        Command::Config { cmd } => cmd_config::run(cmd, &cwd),
        Command::Audit { limit, json } => cmd_audit::execute(&cwd, limit, json),
    }
}
