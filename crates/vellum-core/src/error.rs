use crate::category::ContentCategory;

pub type Result<T> = std::result::Result<T, VellumError>;

/// Coarse family of a [`VellumError`], for callers that render or route failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Artifact,
    State,
    NotFound,
    WorkspaceViolation,
    Verification,
}

#[derive(Debug, thiserror::Error)]
pub enum VellumError {
    #[error("{path}: {actual} bytes exceeds the {category} limit of {limit} bytes")]
    SizeLimitExceeded {
        path: String,
        category: ContentCategory,
        limit: u64,
        actual: u64,
    },

    #[error("artifact already exists: {path}")]
    AlreadyExists { path: String },

    #[error("artifact is not tracked: {path}")]
    NotTracked { path: String },

    #[error("artifact has no content to modify: {path}")]
    MissingContent { path: String },

    #[error("invalid artifact path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("backend I/O failed on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode or decode {key}: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt record {key}: {detail}")]
    Corrupt { key: String, detail: String },

    #[error("state store is not initialized")]
    StateUninitialized,

    #[error("state changed underneath the caller (expected generation {expected}, found {actual})")]
    StaleState { expected: u64, actual: u64 },

    #[error("session {id} is archived")]
    SessionArchived { id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("turn {turn} of session {session} has no checkpoint to rewind to")]
    NoCheckpoint { session: String, turn: usize },

    #[error("{path} is outside the session scope {scope} and inside a protected namespace")]
    WorkspaceViolation { path: String, scope: String },

    #[error("verification failed: {detail}")]
    Verification { detail: String },

    #[error("rollback to {checkpoint} failed: {source}")]
    RollbackFailed {
        checkpoint: String,
        #[source]
        source: Box<VellumError>,
    },

    #[error("changeset task stopped before finishing: {detail}")]
    Interrupted { detail: String },
}

impl VellumError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        VellumError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        VellumError::Io {
            key: key.into(),
            source,
        }
    }

    pub fn serde(key: impl Into<String>, source: serde_json::Error) -> Self {
        VellumError::Serde {
            key: key.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VellumError::SizeLimitExceeded { .. }
            | VellumError::AlreadyExists { .. }
            | VellumError::NotTracked { .. }
            | VellumError::MissingContent { .. }
            | VellumError::InvalidPath { .. }
            | VellumError::Io { .. }
            | VellumError::Serde { .. }
            | VellumError::Corrupt { .. } => ErrorKind::Artifact,
            VellumError::StateUninitialized
            | VellumError::StaleState { .. }
            | VellumError::SessionArchived { .. }
            | VellumError::Interrupted { .. } => ErrorKind::State,
            VellumError::NotFound { .. } | VellumError::NoCheckpoint { .. } => ErrorKind::NotFound,
            VellumError::WorkspaceViolation { .. } => ErrorKind::WorkspaceViolation,
            VellumError::Verification { .. } => ErrorKind::Verification,
            VellumError::RollbackFailed { source, .. } => source.kind(),
        }
    }
}
