use std::path::Path;
use vellum_ledger::VellumPaths;
use vellum_store::audit::read_audit_log;

/// `vellum audit`
pub fn execute(cwd: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let paths = VellumPaths::discover(crate::workspace_root(cwd)?);
    let records = read_audit_log(&paths.audit_jsonl)?;
    let skip = if limit == 0 {
        0
    } else {
        records.len().saturating_sub(limit)
    };

    if records.is_empty() {
        println!("(no audit records)");
        return Ok(());
    }
    for r in &records[skip..] {
        if json {
            println!("{}", serde_json::to_string(r)?);
        } else {
            println!("{}  {:<7}  {:>8}  {}", r.at, r.op, r.size, r.path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_lists_mutations() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        crate::cmd_artifact::put(tmp.path(), "/a.md", None, b"abc", "").unwrap();
        crate::cmd_artifact::rm(tmp.path(), "/a.md").unwrap();
        execute(tmp.path(), 0, false).unwrap();

        let records = read_audit_log(&VellumPaths::discover(tmp.path()).audit_jsonl).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].size, 3);
    }
}
