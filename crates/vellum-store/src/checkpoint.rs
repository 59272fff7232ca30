//! Full snapshots of the state and every tracked artifact.
//!
//! Checkpoint records are ordinary artifacts under `/.checkpoints/`, written
//! through [`ArtifactStore::put_record`]. Snapshots never include that prefix,
//! so a checkpoint does not contain earlier checkpoints.

use crate::artifact::ArtifactStore;
use std::collections::BTreeMap;
use vellum_core::ids::{new_checkpoint_id, now_rfc3339};
use vellum_core::namespace::{checkpoint_id_from_path, checkpoint_path, CHECKPOINT_PREFIX};
use vellum_core::{ArtifactSnapshot, Checkpoint, CheckpointSummary, Result, VellumError};

/// Artifact type recorded in the metadata map for checkpoint records.
pub const CHECKPOINT_KIND: &str = "checkpoint";

/// Snapshot the current state and tracked contents, then persist the record.
pub fn create(store: &mut ArtifactStore, description: &str) -> Result<Checkpoint> {
    let state = store.state()?.clone();
    let mut artifacts = BTreeMap::new();
    for (path, meta) in &state.artifact_metadata {
        if path.starts_with(CHECKPOINT_PREFIX) {
            continue;
        }
        let content = match store.get_artifact_content(path)? {
            Some(bytes) => bytes,
            None => {
                tracing::warn!(path = %path, "tracked artifact has no content, snapshotting it empty");
                Vec::new()
            }
        };
        artifacts.insert(path.clone(), ArtifactSnapshot::from_bytes(meta.clone(), &content));
    }

    let checkpoint = Checkpoint {
        id: new_checkpoint_id(),
        description: description.to_string(),
        timestamp: now_rfc3339(),
        state,
        artifacts,
    };
    let path = checkpoint_path(&checkpoint.id);
    let bytes = serde_json::to_vec_pretty(&checkpoint).map_err(|e| VellumError::serde(&path, e))?;
    store.put_record(&path, CHECKPOINT_KIND, &bytes, description)?;
    tracing::info!(
        checkpoint = %checkpoint.id,
        artifacts = checkpoint.artifacts.len(),
        description,
        "checkpoint created"
    );
    Ok(checkpoint)
}

/// Read a checkpoint record back.
pub fn get(store: &ArtifactStore, id: &str) -> Result<Checkpoint> {
    let path = checkpoint_path(id);
    let bytes = store
        .get_artifact_content(&path)?
        .ok_or_else(|| VellumError::not_found("checkpoint", id))?;
    serde_json::from_slice(&bytes).map_err(|e| VellumError::serde(&path, e))
}

/// Put every recorded artifact back and replace the state wholesale.
///
/// Artifacts created after the checkpoint are left in place; only paths the
/// checkpoint knows about are rewritten.
pub fn restore(store: &mut ArtifactStore, id: &str) -> Result<()> {
    let checkpoint = get(store, id)?;
    let mut rewritten = 0usize;
    for (path, snapshot) in &checkpoint.artifacts {
        let bytes = snapshot.bytes(path)?;
        if store.restore_content(path, &bytes, id)?.is_some() {
            rewritten += 1;
        }
    }
    store.replace_state(checkpoint.state)?;
    tracing::info!(checkpoint = %id, rewritten, "checkpoint restored");
    Ok(())
}

/// Summaries of every checkpoint record in the backend, newest first.
pub fn list(store: &ArtifactStore) -> Result<Vec<CheckpointSummary>> {
    let mut summaries = Vec::new();
    for path in store.list_paths(CHECKPOINT_PREFIX)? {
        let Some(id) = checkpoint_id_from_path(&path) else {
            continue;
        };
        summaries.push(get(store, id)?.summary());
    }
    summaries.sort_by(|a, b| (&b.timestamp, &b.id).cmp(&(&a.timestamp, &a.id)));
    Ok(summaries)
}
