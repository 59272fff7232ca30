use clap::Subcommand;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use vellum_core::ContentCategory;
use vellum_ledger::HEAD_REF;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ArtifactCmd {
    /// Create a new artifact
    Put {
        /// Artifact path (e.g. /docs/readme.md)
        path: String,
        /// Read content from this file (default: stdin)
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Inline content
        #[arg(long)]
        content: Option<String>,
        /// Artifact type (default: derived from the extension)
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Replace the content of a tracked artifact
    Update {
        path: String,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Print an artifact's current content
    Get { path: String },
    /// Delete an artifact
    Rm { path: String },
    /// List artifacts under a prefix
    Ls {
        #[arg(default_value = "/")]
        prefix: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the version history of an artifact
    History {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Compare an artifact between two commits (ids, unique prefixes or HEAD)
    Diff {
        path: String,
        from: String,
        #[arg(default_value = HEAD_REF)]
        to: String,
    },
}

// ── Dispatch ──

pub fn run(cmd: ArtifactCmd, cwd: &Path) -> anyhow::Result<()> {
    match cmd {
        ArtifactCmd::Put {
            path,
            file,
            content,
            kind,
            description,
        } => {
            let bytes = read_input(file.as_deref(), content)?;
            put(cwd, &path, kind.as_deref(), &bytes, &description)
        }
        ArtifactCmd::Update {
            path,
            file,
            content,
        } => {
            let bytes = read_input(file.as_deref(), content)?;
            update(cwd, &path, &bytes)
        }
        ArtifactCmd::Get { path } => get(cwd, &path),
        ArtifactCmd::Rm { path } => rm(cwd, &path),
        ArtifactCmd::Ls { prefix, json } => ls(cwd, &prefix, json),
        ArtifactCmd::History { path, json } => history(cwd, &path, json),
        ArtifactCmd::Diff { path, from, to } => diff(cwd, &path, &from, &to),
    }
}

fn read_input(file: Option<&Path>, content: Option<String>) -> anyhow::Result<Vec<u8>> {
    if let Some(text) = content {
        return Ok(text.into_bytes());
    }
    if let Some(file) = file {
        return Ok(std::fs::read(file)?);
    }
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

// ── Command Implementations ──

pub fn put(
    cwd: &Path,
    path: &str,
    kind: Option<&str>,
    content: &[u8],
    description: &str,
) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    let kind = kind.unwrap_or_else(|| ContentCategory::from_path(path).as_str());
    let commit = crate::block_on(ws.create_artifact(path, kind, content, description))??;
    println!("{path} {}", &commit[..12]);
    Ok(())
}

pub fn update(cwd: &Path, path: &str, content: &[u8]) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    let commit = crate::block_on(ws.update_artifact(path, content))??;
    println!("{path} {}", &commit[..12]);
    Ok(())
}

pub fn get(cwd: &Path, path: &str) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    match crate::block_on(ws.get_artifact_content(path))?? {
        Some(bytes) => std::io::stdout().write_all(&bytes)?,
        None => anyhow::bail!("artifact not found: {path}"),
    }
    Ok(())
}

pub fn rm(cwd: &Path, path: &str) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    match crate::block_on(ws.delete_artifact(path))?? {
        Some(commit) => println!("deleted {path} {}", &commit[..12]),
        None => println!("{path} does not exist"),
    }
    Ok(())
}

pub fn ls(cwd: &Path, prefix: &str, json: bool) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    let (paths, metadata) = crate::block_on(async {
        Ok::<_, vellum_core::VellumError>((ws.list_paths(prefix).await?, ws.get_all_metadata().await?))
    })??;

    if json {
        let rows: Vec<_> = paths
            .iter()
            .map(|p| {
                let meta = metadata.get(p);
                serde_json::json!({
                    "path": p,
                    "type": meta.map(|m| m.kind.as_str()),
                    "description": meta.map(|m| m.description.as_str()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if paths.is_empty() {
        println!("(no artifacts)");
    }
    for p in &paths {
        match metadata.get(p) {
            Some(meta) => println!("{p}\t{}", meta.kind),
            None => println!("{p}\t(untracked)"),
        }
    }
    Ok(())
}

pub fn history(cwd: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    let entries = crate::block_on(ws.history(path))??;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("(no history for {path})");
    }
    for e in &entries {
        println!("{} {} {}", &e.commit_id[..12], e.timestamp, e.message);
    }
    Ok(())
}

pub fn diff(cwd: &Path, path: &str, from: &str, to: &str) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    let (old, new) = crate::block_on(ws.diff(path, from, to))??;
    print!("{}", render_diff(path, from, to, old.as_deref(), new.as_deref()));
    Ok(())
}

/// Whole-content comparison: both sides in full when they differ.
fn render_diff(path: &str, from: &str, to: &str, old: Option<&[u8]>, new: Option<&[u8]>) -> String {
    if old == new {
        return "(no changes)\n".to_string();
    }
    let side = |bytes: Option<&[u8]>, sign: char| -> String {
        match bytes {
            None => format!("{sign} (absent)\n"),
            Some(b) => match std::str::from_utf8(b) {
                Ok(text) => text.lines().map(|l| format!("{sign}{l}\n")).collect(),
                Err(_) => format!("{sign} (binary, {} bytes)\n", b.len()),
            },
        }
    };
    format!(
        "--- {path}@{from}\n+++ {path}@{to}\n{}{}",
        side(old, '-'),
        side(new, '+')
    )
}
