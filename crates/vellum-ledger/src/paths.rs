use std::path::{Path, PathBuf};

/// All well-known paths under `.vellum/`.
#[derive(Debug, Clone)]
pub struct VellumPaths {
    pub root: PathBuf,
    pub vellum_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub versions_jsonl: PathBuf,
    pub objects_dir: PathBuf,
    pub slots_dir: PathBuf,
    pub lock_file: PathBuf,
    pub config_json: PathBuf,
    pub audit_jsonl: PathBuf,
}

impl VellumPaths {
    /// Derive all paths from a workspace root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let vellum_dir = root.join(".vellum");
        let ledger_dir = vellum_dir.join("ledger");
        Self {
            versions_jsonl: ledger_dir.join("versions.jsonl"),
            objects_dir: ledger_dir.join("objects"),
            slots_dir: vellum_dir.join("slots"),
            lock_file: vellum_dir.join("LOCK"),
            config_json: vellum_dir.join("config.json"),
            audit_jsonl: vellum_dir.join("audit.jsonl"),
            ledger_dir,
            vellum_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [&self.ledger_dir, &self.objects_dir, &self.slots_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ledger_dir.is_dir()
    }

    pub fn object_file(&self, hash: &str) -> PathBuf {
        self.objects_dir.join(hash)
    }

    pub fn slot_file(&self, name: &str) -> PathBuf {
        self.slots_dir.join(format!("{name}.json"))
    }

    /// Walk up from `start` looking for a directory containing `.vellum/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".vellum").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}
