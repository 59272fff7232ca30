use crate::changeset::{self, ChangesetOptions, ChangesetOutcome};
use crate::session;
use crate::verify::{ShellVerifier, Verifier};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use vellum_core::{
    ArtifactMeta, ChangeOp, Checkpoint, CheckpointSummary, GlobalState, Result, Session, Turn,
    TurnStatus, VellumError, VersionEntry,
};
use vellum_ledger::{ArtifactBackend, ContentPair, FsBackend, MemoryBackend, VellumPaths};
use vellum_store::checkpoint;
use vellum_store::config::{load_config, write_config_map};
use vellum_store::{ArtifactStore, JsonlAuditSink, VellumConfig};

/// Single-writer entry point for every operation.
///
/// All calls queue on one async mutex, so multi-step operations (checkpoint,
/// changeset apply, rewind) run with nothing interleaved. Clones share the
/// same store.
#[derive(Clone)]
pub struct Workspace {
    store: Arc<Mutex<ArtifactStore>>,
    verifier: Arc<dyn Verifier>,
    verify_timeout: Duration,
    root: Option<PathBuf>,
}

impl Workspace {
    fn build(
        backend: Box<dyn ArtifactBackend>,
        config: &VellumConfig,
        paths: Option<&VellumPaths>,
    ) -> Result<Self> {
        let mut store = ArtifactStore::open(backend)?.with_limits(config.limits.clone());
        let mut verifier_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if let Some(paths) = paths {
            if config.audit_log {
                store = store.with_audit(Box::new(JsonlAuditSink::new(&paths.audit_jsonl)));
            }
            verifier_root = paths.root.clone();
        }
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            verifier: Arc::new(ShellVerifier::new(verifier_root)),
            verify_timeout: config.verify_timeout(),
            root: paths.map(|p| p.root.clone()),
        })
    }

    /// Volatile workspace over a [`MemoryBackend`].
    pub fn in_memory() -> Result<Self> {
        Self::build(Box::new(MemoryBackend::new()), &VellumConfig::default(), None)
    }

    /// Create `.vellum/` under `root` (with a default config file) and open it.
    pub fn init(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let paths = VellumPaths::discover(root.as_ref());
        let backend = FsBackend::init(root.as_ref())?;
        if !paths.config_json.exists() {
            let serde_json::Value::Object(map) = serde_json::to_value(VellumConfig::default())? else {
                anyhow::bail!("default config did not serialize to an object");
            };
            write_config_map(&paths.config_json, &map)?;
        }
        let config = load_config(&paths.config_json)?;
        let backend = backend.with_fsync(config.fsync);
        Ok(Self::build(Box::new(backend), &config, Some(&paths))?)
    }

    /// Open an initialized workspace, applying its config.
    pub fn open(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let paths = VellumPaths::discover(root.as_ref());
        let config = load_config(&paths.config_json)?;
        let backend = FsBackend::open(root.as_ref())?.with_fsync(config.fsync);
        Ok(Self::build(Box::new(backend), &config, Some(&paths))?)
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    // ── Artifacts ──

    pub async fn create_artifact(
        &self,
        path: &str,
        kind: &str,
        content: &[u8],
        description: &str,
    ) -> Result<String> {
        self.store
            .lock()
            .await
            .create_artifact(path, kind, content, description)
    }

    pub async fn update_artifact(&self, path: &str, content: &[u8]) -> Result<String> {
        self.store.lock().await.update_artifact(path, content)
    }

    pub async fn delete_artifact(&self, path: &str) -> Result<Option<String>> {
        self.store.lock().await.delete_artifact(path)
    }

    pub async fn get_artifact_content(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.store.lock().await.get_artifact_content(path)
    }

    pub async fn get_all_metadata(&self) -> Result<BTreeMap<String, ArtifactMeta>> {
        self.store.lock().await.get_all_metadata()
    }

    pub async fn list_paths(&self, prefix: &str) -> Result<Vec<String>> {
        self.store.lock().await.list_paths(prefix)
    }

    pub async fn history(&self, path: &str) -> Result<Vec<VersionEntry>> {
        self.store.lock().await.history(path)
    }

    pub async fn diff(&self, path: &str, ref_a: &str, ref_b: &str) -> Result<ContentPair> {
        self.store.lock().await.diff(path, ref_a, ref_b)
    }

    // ── State ──

    /// A copy of the live state and the generation it was read at.
    pub async fn state(&self) -> Result<(GlobalState, u64)> {
        let store = self.store.lock().await;
        Ok((store.state()?.clone(), store.state_generation()))
    }

    /// Mutate the state. With `expected`, fail with `StaleState` if anything
    /// changed since that generation was read.
    pub async fn update_state<F>(&self, expected: Option<u64>, updater: F) -> Result<GlobalState>
    where
        F: FnOnce(&mut GlobalState) + Send,
    {
        let mut store = self.store.lock().await;
        match expected {
            Some(generation) => store.mutate_state_expecting(generation, updater),
            None => store.mutate_state(updater),
        }
    }

    // ── Checkpoints ──

    pub async fn create_checkpoint(&self, description: &str) -> Result<Checkpoint> {
        checkpoint::create(&mut *self.store.lock().await, description)
    }

    pub async fn restore_checkpoint(&self, id: &str) -> Result<()> {
        checkpoint::restore(&mut *self.store.lock().await, id)
    }

    pub async fn get_checkpoint(&self, id: &str) -> Result<Checkpoint> {
        checkpoint::get(&*self.store.lock().await, id)
    }

    pub async fn list_checkpoints(&self) -> Result<Vec<CheckpointSummary>> {
        checkpoint::list(&*self.store.lock().await)
    }

    // ── Sessions ──

    pub async fn create_session(&self, goal: &str) -> Result<Session> {
        session::create_session(&mut *self.store.lock().await, goal)
    }

    pub async fn get_session(&self, id: &str) -> Result<Session> {
        session::get_session(&*self.store.lock().await, id)
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        session::list_sessions(&*self.store.lock().await)
    }

    pub async fn list_turns(&self, id: &str) -> Result<Vec<Turn>> {
        session::list_turns(&*self.store.lock().await, id)
    }

    pub async fn create_turn(&self, id: &str) -> Result<Turn> {
        session::create_turn(&mut *self.store.lock().await, id)
    }

    pub async fn set_turn_status(&self, id: &str, index: usize, status: TurnStatus) -> Result<Turn> {
        session::set_turn_status(&mut *self.store.lock().await, id, index, status)
    }

    pub async fn rewind_to_turn(&self, id: &str, index: usize) -> Result<Session> {
        session::rewind_to_turn(&mut *self.store.lock().await, id, index)
    }

    pub async fn archive_session(&self, id: &str) -> Result<Session> {
        session::archive_session(&mut *self.store.lock().await, id)
    }

    pub async fn delete_session(&self, id: &str) -> Result<Vec<String>> {
        session::delete_session(&mut *self.store.lock().await, id)
    }

    // ── Changesets ──

    /// Apply a change list under the writer lock, held through verification.
    /// A missing timeout falls back to the configured `verify_timeout_secs`.
    ///
    /// The transaction runs on its own task, so dropping the returned future
    /// does not stop it between the checkpoint and its commit or rollback.
    pub async fn apply_changeset(
        &self,
        ops: &[ChangeOp],
        mut options: ChangesetOptions,
    ) -> Result<ChangesetOutcome> {
        options.timeout.get_or_insert(self.verify_timeout);
        let mut store = Arc::clone(&self.store).lock_owned().await;
        let verifier = Arc::clone(&self.verifier);
        let ops = ops.to_vec();
        let task = tokio::spawn(async move {
            changeset::apply(&mut store, &ops, &options, verifier.as_ref()).await
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(VellumError::Interrupted {
                detail: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::scripted::{ScriptedVerifier, Step};
    use vellum_store::audit::read_audit_log;
    use vellum_store::config::read_config_map;

    #[tokio::test]
    async fn restore_scenario_over_memory() {
        let ws = Workspace::in_memory().unwrap();
        ws.create_artifact("/docs/a.md", "markdown", b"v1", "").await.unwrap();
        let cp1 = ws.create_checkpoint("cp1").await.unwrap();
        ws.update_artifact("/docs/a.md", b"v2").await.unwrap();
        assert_eq!(ws.get_artifact_content("/docs/a.md").await.unwrap().unwrap(), b"v2");
        ws.restore_checkpoint(&cp1.id).await.unwrap();
        assert_eq!(ws.get_artifact_content("/docs/a.md").await.unwrap().unwrap(), b"v1");
    }

    #[tokio::test]
    async fn fs_workspace_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let (cp_id, session_id) = {
            let ws = Workspace::init(tmp.path()).unwrap();
            ws.create_artifact("/docs/a.md", "markdown", b"v1", "intro").await.unwrap();
            ws.update_state(None, |s| s.total_cycles = 7).await.unwrap();
            let cp = ws.create_checkpoint("saved").await.unwrap();
            let s = ws.create_session("persist").await.unwrap();
            ws.create_turn(&s.id).await.unwrap();
            (cp.id, s.id)
        };

        let ws = Workspace::open(tmp.path()).unwrap();
        assert_eq!(ws.get_artifact_content("/docs/a.md").await.unwrap().unwrap(), b"v1");
        let (state, _) = ws.state().await.unwrap();
        assert_eq!(state.total_cycles, 7);
        assert_eq!(state.artifact_metadata["/docs/a.md"].description, "intro");
        assert_eq!(ws.get_checkpoint(&cp_id).await.unwrap().description, "saved");
        assert_eq!(ws.list_turns(&session_id).await.unwrap().len(), 1);

        let audit = read_audit_log(&tmp.path().join(".vellum").join("audit.jsonl")).unwrap();
        assert!(audit.iter().any(|r| r.path == "/docs/a.md"));
    }

    #[tokio::test]
    async fn open_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Workspace::open(tmp.path()).is_err());
    }

    #[tokio::test]
    async fn configured_limits_apply() {
        let tmp = tempfile::tempdir().unwrap();
        drop(Workspace::init(tmp.path()).unwrap());
        let config_path = tmp.path().join(".vellum").join("config.json");
        let mut map = read_config_map(&config_path).unwrap();
        vellum_store::config::set_key(&mut map, "limits.document", serde_json::json!(3)).unwrap();
        write_config_map(&config_path, &map).unwrap();

        let ws = Workspace::open(tmp.path()).unwrap();
        let err = ws
            .create_artifact("/a.md", "markdown", b"four", "")
            .await
            .unwrap_err();
        assert!(matches!(err, VellumError::SizeLimitExceeded { limit: 3, actual: 4, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_are_serialized() {
        let ws = Workspace::in_memory().unwrap();
        let mut handles = Vec::new();
        for i in 0..32 {
            let ws = ws.clone();
            handles.push(tokio::spawn(async move {
                ws.create_artifact(&format!("/n/{i}.txt"), "text", b"x", "")
                    .await
                    .unwrap();
                ws.update_state(None, |s| s.total_cycles += 1).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let (state, _) = ws.state().await.unwrap();
        assert_eq!(state.total_cycles, 32);
        assert_eq!(state.artifact_metadata.len(), 32);
    }

    #[tokio::test]
    async fn stale_state_update_is_rejected() {
        let ws = Workspace::in_memory().unwrap();
        let (_, seen) = ws.state().await.unwrap();
        ws.update_state(None, |s| s.total_cycles = 1).await.unwrap();
        let err = ws
            .update_state(Some(seen), |s| s.total_cycles = 2)
            .await
            .unwrap_err();
        assert!(matches!(err, VellumError::StaleState { .. }));
        assert_eq!(ws.state().await.unwrap().0.total_cycles, 1);
    }

    #[tokio::test]
    async fn changeset_scenario_rolls_back() {
        let ws = Workspace::in_memory().unwrap();
        let ops = vec![ChangeOp::create("/x", "x"), ChangeOp::modify("/missing", "m")];
        let out = ws
            .apply_changeset(&ops, ChangesetOptions::default())
            .await
            .unwrap();
        assert!(!out.success);
        assert!(ws.get_artifact_content("/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_caller_still_gets_rollback() {
        let ws = Workspace::in_memory()
            .unwrap()
            .with_verifier(Arc::new(ScriptedVerifier::new([Step::Hang])));
        let ops = vec![ChangeOp::create("/t.md", "t")];
        let options = ChangesetOptions {
            verify_command: Some("slow".into()),
            timeout: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let caller = tokio::time::timeout(
            Duration::from_millis(50),
            ws.apply_changeset(&ops, options),
        )
        .await;
        assert!(caller.is_err());

        // Queues behind the still-running transaction.
        assert!(ws.get_artifact_content("/t.md").await.unwrap().is_none());
        assert!(!ws.get_all_metadata().await.unwrap().contains_key("/t.md"));
        assert_eq!(ws.list_checkpoints().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_rewind_through_facade() {
        let ws = Workspace::in_memory()
            .unwrap()
            .with_verifier(Arc::new(ScriptedVerifier::new([Step::Pass])));
        let s = ws.create_session("feature").await.unwrap();
        ws.create_turn(&s.id).await.unwrap();
        let scope = vellum_core::namespace::session_dir(&s.id);
        let ops = vec![ChangeOp::create(format!("{scope}turn-0.proposal.md"), "plan")];
        let out = ws
            .apply_changeset(
                &ops,
                ChangesetOptions {
                    session_scope: Some(scope),
                    verify_command: Some("true".into()),
                    source: "turn 0".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.success);
        ws.set_turn_status(&s.id, 0, TurnStatus::Applied).await.unwrap();
        ws.create_turn(&s.id).await.unwrap();
        ws.create_turn(&s.id).await.unwrap();

        let rewound = ws.rewind_to_turn(&s.id, 1).await.unwrap();
        assert_eq!(rewound.turns.len(), 2);
        let turns = ws.list_turns(&s.id).await.unwrap();
        assert!(turns.iter().enumerate().all(|(i, t)| t.index == i));
        assert_eq!(ws.list_sessions().await.unwrap().len(), 1);
    }
}
