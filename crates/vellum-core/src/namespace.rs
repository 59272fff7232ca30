//! Reserved path prefixes. The backend does not enforce these; the store and
//! conductor layers do.

use crate::error::{Result, VellumError};

pub const CHECKPOINT_PREFIX: &str = "/.checkpoints/";
pub const SESSION_PREFIX: &str = "/sessions/";
pub const SYSTEM_PREFIX: &str = "/system/";

/// Namespaces that session-scoped changesets may not write into.
pub const PROTECTED_PREFIXES: &[&str] = &[CHECKPOINT_PREFIX, SESSION_PREFIX, SYSTEM_PREFIX];

/// Unversioned slot holding the serialized `GlobalState`.
pub const STATE_SLOT: &str = "state";

/// Which half of a turn's bundle pair a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Context,
    Proposal,
}

impl BundleKind {
    fn suffix(self) -> &'static str {
        match self {
            BundleKind::Context => "context",
            BundleKind::Proposal => "proposal",
        }
    }
}

pub fn checkpoint_path(id: &str) -> String {
    format!("{CHECKPOINT_PREFIX}{id}.json")
}

/// Inverse of [`checkpoint_path`].
pub fn checkpoint_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(CHECKPOINT_PREFIX)?.strip_suffix(".json")
}

/// Directory prefix owning every artifact of a session, trailing slash included.
pub fn session_dir(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}/")
}

pub fn session_manifest_path(session_id: &str) -> String {
    format!("{}session.json", session_dir(session_id))
}

pub fn turn_bundle_path(session_id: &str, turn: usize, kind: BundleKind) -> String {
    format!("{}turn-{turn}.{}.md", session_dir(session_id), kind.suffix())
}

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Artifact paths are absolute, slash-separated and free of `.`/`..` segments.
pub fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason| {
        Err(VellumError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    };
    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path.ends_with('/') {
        return invalid("must name a file, not a directory");
    }
    if path.contains('\0') || path.contains('\\') {
        return invalid("contains a NUL byte or backslash");
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => return invalid("contains an empty segment"),
            "." | ".." => return invalid("contains a relative segment"),
            _ => {}
        }
    }
    Ok(())
}
