pub mod artifact;
pub mod audit;
pub mod checkpoint;
pub mod config;
pub mod state;

pub use artifact::ArtifactStore;
pub use audit::{AuditOp, AuditRecord, AuditSink, JsonlAuditSink, NullAuditSink, TracingAuditSink};
pub use config::VellumConfig;
pub use state::StateStore;

use std::io::Write;
use std::path::Path;

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}
