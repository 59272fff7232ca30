use crate::audit::{AuditOp, AuditRecord, AuditSink, TracingAuditSink};
use crate::state::StateStore;
use std::collections::BTreeMap;
use vellum_core::ids::now_rfc3339;
use vellum_core::namespace::validate_path;
use vellum_core::{
    ArtifactMeta, ContentCategory, GlobalState, Result, SizeLimits, VellumError, VersionEntry,
};
use vellum_ledger::{ArtifactBackend, ContentPair};

/// Path-keyed artifact API over an [`ArtifactBackend`].
///
/// Owns the backend and the [`StateStore`], so every write to either goes
/// through one value. Wrap it in a single-writer lock for concurrent callers.
pub struct ArtifactStore {
    backend: Box<dyn ArtifactBackend>,
    state: StateStore,
    limits: SizeLimits,
    audit: Box<dyn AuditSink>,
}

impl ArtifactStore {
    /// Load the persisted state from `backend` and wrap both.
    pub fn open(backend: Box<dyn ArtifactBackend>) -> Result<Self> {
        let state = StateStore::load(backend.as_ref())?;
        Ok(Self {
            backend,
            state,
            limits: SizeLimits::default(),
            audit: Box::new(TracingAuditSink),
        })
    }

    pub fn with_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn limits(&self) -> &SizeLimits {
        &self.limits
    }

    pub fn backend(&self) -> &dyn ArtifactBackend {
        self.backend.as_ref()
    }

    // ── State ──

    pub fn state(&self) -> Result<&GlobalState> {
        self.state.get_state()
    }

    pub fn state_generation(&self) -> u64 {
        self.state.generation()
    }

    pub fn mutate_state<F>(&mut self, updater: F) -> Result<GlobalState>
    where
        F: FnOnce(&mut GlobalState),
    {
        self.state.mutate(self.backend.as_mut(), updater)
    }

    pub fn mutate_state_expecting<F>(&mut self, expected: u64, updater: F) -> Result<GlobalState>
    where
        F: FnOnce(&mut GlobalState),
    {
        self.state
            .mutate_expecting(self.backend.as_mut(), expected, updater)
    }

    pub(crate) fn replace_state(&mut self, state: GlobalState) -> Result<()> {
        self.state.replace(self.backend.as_mut(), state)
    }

    // ── Artifacts ──

    /// Fails with `SizeLimitExceeded` before anything is written.
    fn check_size(&self, path: &str, content: &[u8]) -> Result<()> {
        let category = ContentCategory::from_path(path);
        let limit = self.limits.limit_for(category);
        let actual = content.len() as u64;
        if actual > limit {
            return Err(VellumError::SizeLimitExceeded {
                path: path.to_string(),
                category,
                limit,
                actual,
            });
        }
        Ok(())
    }

    /// Store new content at `path` and register its metadata.
    pub fn create_artifact(
        &mut self,
        path: &str,
        kind: &str,
        content: &[u8],
        description: &str,
    ) -> Result<String> {
        validate_path(path)?;
        self.check_size(path, content)?;
        if self.state()?.is_tracked(path) || self.backend.exists(path)? {
            return Err(VellumError::AlreadyExists {
                path: path.to_string(),
            });
        }
        let commit = self
            .backend
            .put(path, content, &format!("create {path}"))?;
        let meta = ArtifactMeta::new(kind, description);
        if let Err(e) = self.mutate_state(|s| {
            s.artifact_metadata.insert(path.to_string(), meta);
        }) {
            if let Err(undo) = self.backend.delete(path, &format!("undo create {path}")) {
                tracing::warn!(path, error = %undo, "content left without metadata");
            }
            return Err(e);
        }
        self.emit(path, AuditOp::Create, content.len() as u64, Some(&commit));
        Ok(commit)
    }

    /// Replace the content of a tracked artifact.
    pub fn update_artifact(&mut self, path: &str, content: &[u8]) -> Result<String> {
        if !self.state()?.is_tracked(path) {
            return Err(VellumError::NotTracked {
                path: path.to_string(),
            });
        }
        self.check_size(path, content)?;
        let commit = self
            .backend
            .put(path, content, &format!("update {path}"))?;
        self.emit(path, AuditOp::Update, content.len() as u64, Some(&commit));
        Ok(commit)
    }

    /// Remove `path` from the metadata map and the backend. Returns the delete
    /// commit, or `None` when there was nothing to delete.
    pub fn delete_artifact(&mut self, path: &str) -> Result<Option<String>> {
        let removed = self.state()?.artifact_metadata.get(path).cloned();
        if removed.is_some() {
            self.mutate_state(|s| {
                s.artifact_metadata.remove(path);
            })?;
        }
        if !self.backend.exists(path)? {
            return Ok(None);
        }
        let commit = match self.backend.delete(path, &format!("delete {path}")) {
            Ok(commit) => commit,
            Err(e) => {
                if let Some(meta) = removed {
                    let restored = self.mutate_state(|s| {
                        s.artifact_metadata.insert(path.to_string(), meta);
                    });
                    if let Err(undo) = restored {
                        tracing::warn!(path, error = %undo, "metadata lost for undeleted artifact");
                    }
                }
                return Err(e);
            }
        };
        self.emit(path, AuditOp::Delete, 0, Some(&commit));
        Ok(Some(commit))
    }

    /// Create or update a record owned by the store layers (checkpoints,
    /// session manifests). Records are registered in the metadata map but are
    /// not subject to the size limits.
    pub fn put_record(
        &mut self,
        path: &str,
        kind: &str,
        content: &[u8],
        description: &str,
    ) -> Result<String> {
        validate_path(path)?;
        let op = if self.backend.exists(path)? {
            AuditOp::Update
        } else {
            AuditOp::Create
        };
        let commit = self.backend.put(path, content, &format!("{op} {path}"))?;
        if !self.state()?.is_tracked(path) {
            let meta = ArtifactMeta::new(kind, description);
            self.mutate_state(|s| {
                s.artifact_metadata.insert(path.to_string(), meta);
            })?;
        }
        self.emit(path, op, content.len() as u64, Some(&commit));
        Ok(commit)
    }

    /// Overwrite backend content without the create/update distinction or
    /// any metadata change. Identical content is left alone.
    pub fn restore_content(
        &mut self,
        path: &str,
        content: &[u8],
        checkpoint_id: &str,
    ) -> Result<Option<String>> {
        if self.get_artifact_content(path)?.as_deref() == Some(content) {
            return Ok(None);
        }
        let commit = self
            .backend
            .put(path, content, &format!("restore {path} from {checkpoint_id}"))?;
        self.emit(path, AuditOp::Restore, content.len() as u64, Some(&commit));
        Ok(Some(commit))
    }

    pub fn get_artifact_content(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.backend.get(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(VellumError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_all_metadata(&self) -> Result<BTreeMap<String, ArtifactMeta>> {
        Ok(self.state()?.artifact_metadata.clone())
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        self.backend.exists(path)
    }

    /// Paths with live content under `prefix`, tracked or not.
    pub fn list_paths(&self, prefix: &str) -> Result<Vec<String>> {
        self.backend.keys(prefix)
    }

    pub fn history(&self, path: &str) -> Result<Vec<VersionEntry>> {
        self.backend.history(path)
    }

    pub fn diff(&self, path: &str, ref_a: &str, ref_b: &str) -> Result<ContentPair> {
        self.backend.diff(path, ref_a, ref_b)
    }

    fn emit(&self, path: &str, op: AuditOp, size: u64, commit: Option<&str>) {
        let record = AuditRecord {
            at: now_rfc3339(),
            path: path.to_string(),
            op,
            size,
            commit: commit.map(str::to_string),
        };
        if let Err(e) = self.audit.record(&record) {
            tracing::warn!(path, op = %op, error = %e, "audit sink rejected record");
        }
    }
}
