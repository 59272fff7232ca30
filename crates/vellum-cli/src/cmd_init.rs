use std::path::Path;
use vellum_conductor::Workspace;
use vellum_ledger::VellumPaths;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = VellumPaths::discover(repo_root);
    let already = paths.is_initialized();
    Workspace::init(repo_root)?;
    if already {
        println!("Already initialized at {}", paths.vellum_dir.display());
    } else {
        println!("Initialized empty workspace at {}", paths.vellum_dir.display());
    }
    Ok(())
}
