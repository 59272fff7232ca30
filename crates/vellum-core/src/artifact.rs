use crate::digest::{canonical_json_bytes, sha256_hex};
use crate::ids::now_rfc3339;
use serde::{Deserialize, Serialize};

/// Metadata tracked for every artifact in `GlobalState::artifact_metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

impl ArtifactMeta {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOp {
    Put,
    Delete,
}

/// One entry of the append-only version log. Never amended once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub artifact_path: String,
    pub commit_id: String,
    pub message: String,
    pub timestamp: String,
    pub op: VersionOp,
    /// Commit id of the previous entry in the global log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Content hash of the stored bytes; absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl VersionEntry {
    /// Recompute the commit id from the entry body.
    pub fn compute_commit_id(&self) -> String {
        let mut val = serde_json::to_value(self).expect("version entry serialization should not fail");
        if let Some(obj) = val.as_object_mut() {
            obj.remove("commitId");
        }
        sha256_hex(&canonical_json_bytes(&val))
    }

    pub fn is_delete(&self) -> bool {
        self.op == VersionOp::Delete
    }
}

/// Build a sealed entry: timestamped now, chained to `parent`, commit id filled in.
pub fn new_version_entry(
    path: &str,
    op: VersionOp,
    parent: Option<&str>,
    blob: Option<&str>,
    size: u64,
    message: &str,
) -> VersionEntry {
    let mut entry = VersionEntry {
        artifact_path: path.to_string(),
        commit_id: String::new(),
        message: message.to_string(),
        timestamp: now_rfc3339(),
        op,
        parent: parent.map(str::to_string),
        blob: blob.map(str::to_string),
        size,
    };
    entry.commit_id = entry.compute_commit_id();
    entry
}
