use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum CheckpointCmd {
    /// Snapshot the state and every tracked artifact
    Create {
        #[arg(default_value = "manual checkpoint")]
        description: String,
    },
    /// List checkpoints, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print a checkpoint record as JSON
    Show { id: String },
    /// Restore a checkpoint
    Restore { id: String },
}

pub fn run(cmd: CheckpointCmd, cwd: &Path) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    match cmd {
        CheckpointCmd::Create { description } => {
            let cp = crate::block_on(ws.create_checkpoint(&description))??;
            println!("{} ({} artifacts)", cp.id, cp.artifacts.len());
        }
        CheckpointCmd::List { json } => {
            let list = crate::block_on(ws.list_checkpoints())??;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("(no checkpoints)");
            } else {
                for cp in &list {
                    println!(
                        "{}  {}  {} artifacts  {}",
                        cp.id, cp.timestamp, cp.artifact_count, cp.description
                    );
                }
            }
        }
        CheckpointCmd::Show { id } => {
            let cp = crate::block_on(ws.get_checkpoint(&id))??;
            println!("{}", serde_json::to_string_pretty(&cp)?);
        }
        CheckpointCmd::Restore { id } => {
            crate::block_on(ws.restore_checkpoint(&id))??;
            println!("Restored {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_unknown_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        let err = run(
            CheckpointCmd::Restore {
                id: "cp_nope".into(),
            },
            tmp.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("checkpoint not found"));
    }

    #[test]
    fn create_then_list() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        run(
            CheckpointCmd::Create {
                description: "first".into(),
            },
            tmp.path(),
        )
        .unwrap();
        let ws = vellum_conductor::Workspace::open(tmp.path()).unwrap();
        let list = crate::block_on(ws.list_checkpoints()).unwrap().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].description, "first");
    }
}
