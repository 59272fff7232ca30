//! Filesystem backend: content-addressed objects plus an append-only
//! `versions.jsonl`, replayed into memory on open.

use crate::backend::{ArtifactBackend, ContentPair};
use crate::index::VersionIndex;
use crate::lock::WorkspaceLock;
use crate::paths::VellumPaths;
use std::io::Write;
use std::path::{Path, PathBuf};
use vellum_core::digest::sha256_hex;
use vellum_core::{new_version_entry, Result, VellumError, VersionEntry, VersionOp};

pub struct FsBackend {
    paths: VellumPaths,
    index: VersionIndex,
    fsync: bool,
    _lock: WorkspaceLock,
}

impl FsBackend {
    /// Create the `.vellum/` layout if needed, then open it.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let paths = VellumPaths::discover(root);
        paths
            .ensure_layout()
            .map_err(|e| VellumError::io(paths.vellum_dir.display().to_string(), e))?;
        Self::open_paths(paths)
    }

    /// Open an existing workspace. Fails if `.vellum/` has not been initialized.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let paths = VellumPaths::discover(root);
        if !paths.is_initialized() {
            return Err(VellumError::not_found(
                "workspace",
                paths.vellum_dir.display().to_string(),
            ));
        }
        Self::open_paths(paths)
    }

    fn open_paths(paths: VellumPaths) -> Result<Self> {
        let lock = WorkspaceLock::acquire(&paths)?;
        let index = replay_log(&paths.versions_jsonl)?;
        tracing::debug!(
            entries = index.len(),
            root = %paths.root.display(),
            "opened version log"
        );
        Ok(Self {
            paths,
            index,
            fsync: false,
            _lock: lock,
        })
    }

    /// fsync the version log after every append.
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn paths(&self) -> &VellumPaths {
        &self.paths
    }

    /// Write an object if absent. tmp file, fsync, rename.
    fn put_object(&self, bytes: &[u8]) -> Result<String> {
        let hash = sha256_hex(bytes);
        let final_path = self.paths.object_file(&hash);
        if final_path.exists() {
            return Ok(hash);
        }
        let tmp_path = self.paths.objects_dir.join(format!(".tmp_{hash}"));
        let io_err = |e| VellumError::io(final_path.display().to_string(), e);
        let mut file = std::fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        std::fs::rename(&tmp_path, &final_path).map_err(io_err)?;
        Ok(hash)
    }

    fn read_object(&self, key: &str, hash: &str) -> Result<Vec<u8>> {
        std::fs::read(self.paths.object_file(hash)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VellumError::Corrupt {
                key: key.to_string(),
                detail: format!("missing object {hash}"),
            },
            _ => VellumError::io(key, e),
        })
    }

    fn content_at(&self, key: &str, entry: &VersionEntry) -> Result<Option<Vec<u8>>> {
        match entry.blob.as_deref() {
            Some(hash) => self.read_object(key, hash).map(Some),
            None => Ok(None),
        }
    }

    fn append_entry(&mut self, entry: VersionEntry) -> Result<String> {
        let log_key = self.paths.versions_jsonl.display().to_string();
        let json = serde_json::to_string(&entry).map_err(|e| VellumError::serde(&log_key, e))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.paths.versions_jsonl)
            .map_err(|e| VellumError::io(&log_key, e))?;
        writeln!(file, "{json}").map_err(|e| VellumError::io(&log_key, e))?;
        if self.fsync {
            file.sync_all().map_err(|e| VellumError::io(&log_key, e))?;
        }
        tracing::debug!(
            key = %entry.artifact_path,
            commit = %&entry.commit_id[..12],
            op = ?entry.op,
            "committed"
        );
        let commit = entry.commit_id.clone();
        self.index.push(entry);
        Ok(commit)
    }

    fn check_slot_name(name: &str) -> Result<()> {
        let ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if ok {
            Ok(())
        } else {
            Err(VellumError::InvalidPath {
                path: name.to_string(),
                reason: "slot names are limited to [A-Za-z0-9_-]",
            })
        }
    }
}

/// Rebuild the index from `versions.jsonl`, checking the parent chain and
/// every commit id. A torn final line from an interrupted append is cut off.
fn replay_log(path: &Path) -> Result<VersionIndex> {
    let mut index = VersionIndex::default();
    if !path.exists() {
        return Ok(index);
    }
    let key = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| VellumError::io(&key, e))?;

    let mut good_len = 0usize;
    let mut offset = 0usize;
    let mut lines = content.split_inclusive('\n').peekable();
    while let Some(raw) = lines.next() {
        offset += raw.len();
        let is_last = lines.peek().is_none();
        let line = raw.trim();
        if line.is_empty() {
            good_len = offset;
            continue;
        }
        let complete = raw.ends_with('\n');
        let entry = match serde_json::from_str::<VersionEntry>(line) {
            Ok(entry) if complete => entry,
            Err(e) if !is_last => return Err(VellumError::serde(&key, e)),
            _ => {
                tracing::warn!(log = %key, "dropping torn trailing entry in version log");
                break;
            }
        };
        if entry.parent.as_deref() != index.last_commit() {
            return Err(VellumError::Corrupt {
                key,
                detail: format!("broken parent chain at commit {}", entry.commit_id),
            });
        }
        if entry.compute_commit_id() != entry.commit_id {
            return Err(VellumError::Corrupt {
                key,
                detail: format!("commit id mismatch at {}", entry.commit_id),
            });
        }
        index.push(entry);
        good_len = offset;
    }

    if good_len < content.len() {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| VellumError::io(&key, e))?;
        file.set_len(good_len as u64)
            .map_err(|e| VellumError::io(&key, e))?;
    }
    Ok(index)
}

impl ArtifactBackend for FsBackend {
    fn put(&mut self, key: &str, bytes: &[u8], message: &str) -> Result<String> {
        let hash = self.put_object(bytes)?;
        let entry = new_version_entry(
            key,
            VersionOp::Put,
            self.index.last_commit(),
            Some(&hash),
            bytes.len() as u64,
            message,
        );
        self.append_entry(entry)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        match self.index.live_blob(key) {
            Some(hash) => self.read_object(key, hash),
            None => Err(VellumError::not_found("artifact", key)),
        }
    }

    fn delete(&mut self, key: &str, message: &str) -> Result<String> {
        if self.index.live_blob(key).is_none() {
            return Err(VellumError::not_found("artifact", key));
        }
        let entry = new_version_entry(
            key,
            VersionOp::Delete,
            self.index.last_commit(),
            None,
            0,
            message,
        );
        self.append_entry(entry)
    }

    fn history(&self, key: &str) -> Result<Vec<VersionEntry>> {
        Ok(self.index.history(key))
    }

    fn diff(&self, key: &str, ref_a: &str, ref_b: &str) -> Result<ContentPair> {
        let a = self.index.resolve(key, ref_a)?;
        let b = self.index.resolve(key, ref_b)?;
        Ok((self.content_at(key, a)?, self.content_at(key, b)?))
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.index.live_keys(prefix))
    }

    fn head(&self, key: &str) -> Result<Option<VersionEntry>> {
        Ok(self.index.head(key).cloned())
    }

    fn read_slot(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Self::check_slot_name(name)?;
        let path = self.paths.slot_file(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VellumError::io(path.display().to_string(), e)),
        }
    }

    fn write_slot(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        Self::check_slot_name(name)?;
        let path = self.paths.slot_file(name);
        let io_err = |e| VellumError::io(path.display().to_string(), e);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.paths.slots_dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HEAD_REF;

    #[test]
    fn log_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let (c1, c2) = {
            let mut b = FsBackend::init(tmp.path()).unwrap();
            let c1 = b.put("/docs/a.md", b"v1", "create /docs/a.md").unwrap();
            let c2 = b.put("/docs/a.md", b"v2", "update /docs/a.md").unwrap();
            b.put("/docs/b.md", b"b", "create /docs/b.md").unwrap();
            b.delete("/docs/b.md", "delete /docs/b.md").unwrap();
            (c1, c2)
        };

        let b = FsBackend::open(tmp.path()).unwrap();
        assert_eq!(b.get("/docs/a.md").unwrap(), b"v2");
        assert!(b.get("/docs/b.md").is_err());
        let hist = b.history("/docs/a.md").unwrap();
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].commit_id, c1);
        assert_eq!(hist[1].commit_id, c2);
        assert_eq!(b.keys("/docs/").unwrap(), vec!["/docs/a.md"]);

        let (old, new) = b.diff("/docs/a.md", &c1, HEAD_REF).unwrap();
        assert_eq!(old.unwrap(), b"v1");
        assert_eq!(new.unwrap(), b"v2");
    }

    #[test]
    fn open_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            FsBackend::open(tmp.path()),
            Err(VellumError::NotFound { .. })
        ));
    }

    #[test]
    fn second_writer_is_locked_out() {
        let tmp = tempfile::tempdir().unwrap();
        let _first = FsBackend::init(tmp.path()).unwrap();
        assert!(FsBackend::open(tmp.path()).is_err());
    }

    #[test]
    fn identical_content_shares_one_object() {
        let tmp = tempfile::tempdir().unwrap();
        let mut b = FsBackend::init(tmp.path()).unwrap();
        b.put("/a.txt", b"same", "create /a.txt").unwrap();
        b.put("/b.txt", b"same", "create /b.txt").unwrap();
        let objects: Vec<_> = std::fs::read_dir(&b.paths().objects_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(objects.len(), 1);
        assert!(!objects[0].file_name().to_string_lossy().starts_with(".tmp_"));
    }

    #[test]
    fn torn_tail_is_truncated_on_open() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut b = FsBackend::init(tmp.path()).unwrap();
            b.put("/a.txt", b"one", "create /a.txt").unwrap();
        }
        let log = VellumPaths::discover(tmp.path()).versions_jsonl;
        let mut f = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
        f.write_all(b"{\"artifactPath\":\"/a.txt\",\"commi").unwrap();
        drop(f);

        let mut b = FsBackend::open(tmp.path()).unwrap();
        assert_eq!(b.history("/a.txt").unwrap().len(), 1);
        b.put("/a.txt", b"two", "update /a.txt").unwrap();
        drop(b);

        let b = FsBackend::open(tmp.path()).unwrap();
        assert_eq!(b.get("/a.txt").unwrap(), b"two");
        assert_eq!(b.history("/a.txt").unwrap().len(), 2);
    }

    #[test]
    fn tampered_entry_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut b = FsBackend::init(tmp.path()).unwrap();
            b.put("/a.txt", b"one", "create /a.txt").unwrap();
        }
        let log = VellumPaths::discover(tmp.path()).versions_jsonl;
        let text = std::fs::read_to_string(&log).unwrap();
        std::fs::write(&log, text.replace("create /a.txt", "forged")).unwrap();
        assert!(matches!(
            FsBackend::open(tmp.path()),
            Err(VellumError::Corrupt { .. })
        ));
    }

    #[test]
    fn slots_round_trip_and_reject_bad_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mut b = FsBackend::init(tmp.path()).unwrap();
        b.write_slot("state", b"{\"totalCycles\":2}").unwrap();
        assert_eq!(b.read_slot("state").unwrap().unwrap(), b"{\"totalCycles\":2}");
        assert!(b.read_slot("missing").unwrap().is_none());
        assert!(b.write_slot("../escape", b"x").is_err());
    }
}
