use anyhow::Context;
use std::path::Path;
use std::time::Duration;
use vellum_conductor::{ChangesetOptions, ChangesetOutcome};
use vellum_core::namespace::session_dir;
use vellum_core::ChangeOp;

pub struct ApplyParams<'a> {
    pub cwd: &'a Path,
    pub file: &'a Path,
    pub session: Option<&'a str>,
    pub verify: Option<&'a str>,
    pub timeout_secs: Option<u64>,
    pub json: bool,
}

fn load_ops(file: &Path) -> anyhow::Result<Vec<ChangeOp>> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading change list {}", file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing change list {}", file.display()))
}

/// Execute `vellum apply <changes.json>`. A rolled-back changeset is an error
/// exit after the outcome has been printed.
pub fn execute(params: &ApplyParams<'_>) -> anyhow::Result<()> {
    let ops = load_ops(params.file)?;
    let ws = crate::open_workspace(params.cwd)?;
    if let Some(id) = params.session {
        crate::block_on(ws.get_session(id))??;
    }

    let options = ChangesetOptions {
        session_scope: params.session.map(session_dir),
        verify_command: params.verify.map(str::to_string),
        timeout: params.timeout_secs.map(Duration::from_secs),
        source: params.file.display().to_string(),
    };
    let outcome = crate::block_on(ws.apply_changeset(&ops, options))??;

    if params.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    if !outcome.success {
        anyhow::bail!(
            "changeset rolled back: {}",
            outcome.error.as_deref().unwrap_or("unknown failure")
        );
    }
    Ok(())
}

fn print_outcome(outcome: &ChangesetOutcome) {
    if outcome.success {
        println!(
            "Applied {} changes (checkpoint {})",
            outcome.applied_count,
            outcome.checkpoint.as_deref().unwrap_or("-")
        );
        for change in &outcome.applied_changes {
            println!("  {} {}", change.operation, change.path);
        }
    } else {
        println!(
            "Rolled back after {} changes to {}",
            outcome.applied_count,
            outcome.checkpoint_restored.as_deref().unwrap_or("-")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(cwd: &'a Path, file: &'a Path) -> ApplyParams<'a> {
        ApplyParams {
            cwd,
            file,
            session: None,
            verify: None,
            timeout_secs: None,
            json: false,
        }
    }

    #[test]
    fn applies_and_rolls_back_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();

        let good = tmp.path().join("good.json");
        std::fs::write(
            &good,
            r#"[{"operation": "CREATE", "file_path": "/src/lib.rs", "new_content": "pub fn f() {}"}]"#,
        )
        .unwrap();
        execute(&params(tmp.path(), &good)).unwrap();

        let bad = tmp.path().join("bad.json");
        std::fs::write(
            &bad,
            r#"[
                {"operation": "MODIFY", "file_path": "/src/lib.rs", "new_content": "broken"},
                {"operation": "MODIFY", "file_path": "/missing.rs", "new_content": "x"}
            ]"#,
        )
        .unwrap();
        let err = execute(&params(tmp.path(), &bad)).unwrap_err();
        assert!(err.to_string().contains("rolled back"));

        let ws = vellum_conductor::Workspace::open(tmp.path()).unwrap();
        let content = crate::block_on(ws.get_artifact_content("/src/lib.rs"))
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(content, b"pub fn f() {}");
    }

    #[test]
    fn unknown_session_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        let file = tmp.path().join("c.json");
        std::fs::write(&file, "[]").unwrap();
        let mut p = params(tmp.path(), &file);
        p.session = Some("ses_nope");
        assert!(execute(&p).is_err());
    }

    #[test]
    fn malformed_change_list_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        let file = tmp.path().join("broken.json");
        std::fs::write(&file, "{not json").unwrap();
        let err = execute(&params(tmp.path(), &file)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
