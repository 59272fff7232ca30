use crate::artifact::ArtifactMeta;
use crate::error::{Result, VellumError};
use crate::state::GlobalState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How `ArtifactSnapshot::content` encodes the artifact bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    #[default]
    Utf8,
    Hex,
}

impl ContentEncoding {
    fn is_utf8(&self) -> bool {
        *self == ContentEncoding::Utf8
    }
}

/// Full copy of one artifact inside a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub metadata: ArtifactMeta,
    pub content: String,
    #[serde(default, skip_serializing_if = "ContentEncoding::is_utf8")]
    pub encoding: ContentEncoding,
}

impl ArtifactSnapshot {
    pub fn from_bytes(metadata: ArtifactMeta, bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self {
                metadata,
                content: text.to_string(),
                encoding: ContentEncoding::Utf8,
            },
            Err(_) => Self {
                metadata,
                content: hex::encode(bytes),
                encoding: ContentEncoding::Hex,
            },
        }
    }

    pub fn bytes(&self, path: &str) -> Result<Vec<u8>> {
        match self.encoding {
            ContentEncoding::Utf8 => Ok(self.content.clone().into_bytes()),
            ContentEncoding::Hex => hex::decode(&self.content).map_err(|e| VellumError::Corrupt {
                key: path.to_string(),
                detail: format!("bad hex content: {e}"),
            }),
        }
    }
}

/// Immutable snapshot of the state plus every tracked artifact's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub description: String,
    pub timestamp: String,
    pub state: GlobalState,
    pub artifacts: BTreeMap<String, ArtifactSnapshot>,
}

impl Checkpoint {
    pub fn summary(&self) -> CheckpointSummary {
        CheckpointSummary {
            id: self.id.clone(),
            description: self.description.clone(),
            timestamp: self.timestamp.clone(),
            artifact_count: self.artifacts.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSummary {
    pub id: String,
    pub description: String,
    pub timestamp: String,
    pub artifact_count: usize,
}
