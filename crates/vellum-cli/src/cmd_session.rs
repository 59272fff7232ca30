use clap::Subcommand;
use std::path::Path;
use vellum_core::{Session, TurnStatus};

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Start a session
    New { goal: String },
    /// List sessions
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print a session manifest as JSON
    Show { id: String },
    /// Append the next turn (checkpoints first)
    Turn { id: String },
    /// Set a turn's status (pending, proposed, applied, rejected)
    Status {
        id: String,
        turn: usize,
        status: TurnStatus,
    },
    /// Restore turn N's checkpoint and drop later turns
    Rewind { id: String, turn: usize },
    /// Archive a session
    Archive { id: String },
    /// Delete a session and every artifact under its directory
    Rm { id: String },
}

pub fn run(cmd: SessionCmd, cwd: &Path) -> anyhow::Result<()> {
    let ws = crate::open_workspace(cwd)?;
    match cmd {
        SessionCmd::New { goal } => {
            let s = crate::block_on(ws.create_session(&goal))??;
            println!("{}", s.id);
        }
        SessionCmd::List { json } => {
            let sessions = crate::block_on(ws.list_sessions())??;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("(no sessions)");
            } else {
                for s in &sessions {
                    print_summary(s);
                }
            }
        }
        SessionCmd::Show { id } => {
            let s = crate::block_on(ws.get_session(&id))??;
            println!("{}", serde_json::to_string_pretty(&s)?);
        }
        SessionCmd::Turn { id } => {
            let turn = crate::block_on(ws.create_turn(&id))??;
            match &turn.checkpoint_id {
                Some(cp) => println!("turn {} (checkpoint {cp})", turn.index),
                None => println!("turn {} (no checkpoint, cannot be rewound to)", turn.index),
            }
        }
        SessionCmd::Status { id, turn, status } => {
            let t = crate::block_on(ws.set_turn_status(&id, turn, status))??;
            println!("turn {} -> {}", t.index, t.status);
        }
        SessionCmd::Rewind { id, turn } => {
            let s = crate::block_on(ws.rewind_to_turn(&id, turn))??;
            println!("Rewound {} to turn {turn} ({} turns)", s.id, s.turns.len());
        }
        SessionCmd::Archive { id } => {
            crate::block_on(ws.archive_session(&id))??;
            println!("Archived {id}");
        }
        SessionCmd::Rm { id } => {
            let removed = crate::block_on(ws.delete_session(&id))??;
            println!("Deleted {id} ({} artifacts)", removed.len());
        }
    }
    Ok(())
}

fn print_summary(s: &Session) {
    let status = if s.is_active() { "active" } else { "archived" };
    println!("{}  {status}  {} turns  {}", s.id, s.turns.len(), s.goal);
}
