//! All-or-nothing application of a parsed change list.
//!
//! The backend commits every op on its own, so atomicity is observable only:
//! a checkpoint is taken before the first op and restored if any op or the
//! verifier fails.

use crate::verify::{Verifier, VerifyOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vellum_core::namespace::is_protected;
use vellum_core::{ChangeKind, ChangeOp, Checkpoint, ContentCategory, Result, VellumError};
use vellum_store::checkpoint;
use vellum_store::ArtifactStore;

#[derive(Debug, Clone, Default)]
pub struct ChangesetOptions {
    /// Session directory the caller is confined to, trailing slash included.
    pub session_scope: Option<String>,
    pub verify_command: Option<String>,
    pub timeout: Option<Duration>,
    /// Where the change list came from; used to label the checkpoint.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub operation: ChangeKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetOutcome {
    pub success: bool,
    pub applied_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_changes: Vec<AppliedChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_restored: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Reject ops that leave the session directory for a protected namespace.
fn check_scope(ops: &[ChangeOp], scope: &str) -> Result<()> {
    let dir = if scope.ends_with('/') {
        scope.to_string()
    } else {
        format!("{scope}/")
    };
    for op in ops {
        if !op.path.starts_with(&dir) && is_protected(&op.path) {
            return Err(VellumError::WorkspaceViolation {
                path: op.path.clone(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

fn apply_op(store: &mut ArtifactStore, op: &ChangeOp) -> Result<Option<String>> {
    match op.kind {
        ChangeKind::Create => {
            if store.exists(&op.path)? {
                return Err(VellumError::AlreadyExists {
                    path: op.path.clone(),
                });
            }
            let kind = ContentCategory::from_path(&op.path);
            let description = op.reason.as_deref().unwrap_or_default();
            store
                .create_artifact(&op.path, kind.as_str(), op.content_bytes(), description)
                .map(Some)
        }
        ChangeKind::Modify => {
            if !store.exists(&op.path)? {
                return Err(VellumError::MissingContent {
                    path: op.path.clone(),
                });
            }
            store.update_artifact(&op.path, op.content_bytes()).map(Some)
        }
        ChangeKind::Delete => store.delete_artifact(&op.path),
    }
}

/// Apply `ops` in order, verify, and roll back on any failure.
///
/// Returns `Err` only when nothing was touched (scope violation, checkpoint
/// failure) or when the rollback itself failed. Every other failure comes
/// back as `success: false`.
pub async fn apply(
    store: &mut ArtifactStore,
    ops: &[ChangeOp],
    options: &ChangesetOptions,
    verifier: &dyn Verifier,
) -> Result<ChangesetOutcome> {
    if let Some(scope) = options.session_scope.as_deref() {
        check_scope(ops, scope)?;
    }

    let cp = checkpoint::create(store, &format!("before changeset: {}", options.source))?;

    let mut applied = Vec::with_capacity(ops.len());
    let mut stashed = Vec::new();
    let mut failure = None;
    for op in ops {
        let result = stash_untracked(store, &cp, op, &mut stashed).and_then(|()| apply_op(store, op));
        match result {
            Ok(commit) => applied.push(AppliedChange {
                operation: op.kind,
                path: op.path.clone(),
                commit,
            }),
            Err(e) => {
                failure = Some(format!("{} {}: {e}", op.kind, op.path));
                break;
            }
        }
    }

    if failure.is_none() {
        if let Some(command) = options.verify_command.as_deref() {
            let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
            let outcome = tokio::time::timeout(timeout, verifier.verify(command, timeout))
                .await
                .unwrap_or_else(|_| VerifyOutcome::timed_out(command, timeout));
            if !outcome.passed {
                let err = VellumError::Verification {
                    detail: outcome.detail.unwrap_or_else(|| "verifier reported failure".into()),
                };
                failure = Some(err.to_string());
            }
        }
    }

    let Some(error) = failure else {
        tracing::info!(source = %options.source, applied = applied.len(), checkpoint = %cp.id, "changeset applied");
        return Ok(ChangesetOutcome {
            success: true,
            applied_count: applied.len(),
            applied_changes: applied,
            checkpoint: Some(cp.id),
            checkpoint_restored: None,
            error: None,
        });
    };

    tracing::warn!(source = %options.source, error = %error, checkpoint = %cp.id, "changeset failed, rolling back");
    rollback(store, &cp, &applied, &stashed).map_err(|e| VellumError::RollbackFailed {
        checkpoint: cp.id.clone(),
        source: Box::new(e),
    })?;
    Ok(ChangesetOutcome {
        success: false,
        applied_count: applied.len(),
        applied_changes: Vec::new(),
        checkpoint: None,
        checkpoint_restored: Some(cp.id),
        error: Some(error),
    })
}

/// Keep the bytes of an untracked artifact a DELETE is about to remove. The
/// checkpoint only snapshots tracked paths, so restore cannot bring it back.
fn stash_untracked(
    store: &ArtifactStore,
    cp: &Checkpoint,
    op: &ChangeOp,
    stashed: &mut Vec<(String, Vec<u8>)>,
) -> Result<()> {
    if op.kind != ChangeKind::Delete
        || cp.artifacts.contains_key(&op.path)
        || stashed.iter().any(|(path, _)| *path == op.path)
    {
        return Ok(());
    }
    if let Some(bytes) = store.get_artifact_content(&op.path)? {
        stashed.push((op.path.clone(), bytes));
    }
    Ok(())
}

/// Restore the checkpoint, then undo what restore cannot see: remove
/// artifacts this changeset created and put back untracked ones it deleted.
fn rollback(
    store: &mut ArtifactStore,
    cp: &Checkpoint,
    applied: &[AppliedChange],
    stashed: &[(String, Vec<u8>)],
) -> Result<()> {
    checkpoint::restore(store, &cp.id)?;
    for change in applied {
        if change.operation == ChangeKind::Create && !cp.artifacts.contains_key(&change.path) {
            store.delete_artifact(&change.path)?;
        }
    }
    for (path, bytes) in stashed {
        store.restore_content(path, bytes, &cp.id)?;
    }
    Ok(())
}
