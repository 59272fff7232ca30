use crate::backend::HEAD_REF;
use std::collections::HashMap;
use vellum_core::{Result, VellumError, VersionEntry};

/// In-memory view of the version log: the entries in commit order plus the
/// positions belonging to each key. Both backends keep one of these.
#[derive(Debug, Default)]
pub(crate) struct VersionIndex {
    log: Vec<VersionEntry>,
    per_key: HashMap<String, Vec<usize>>,
}

impl VersionIndex {
    pub fn push(&mut self, entry: VersionEntry) {
        let pos = self.log.len();
        self.per_key
            .entry(entry.artifact_path.clone())
            .or_default()
            .push(pos);
        self.log.push(entry);
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn last_commit(&self) -> Option<&str> {
        self.log.last().map(|e| e.commit_id.as_str())
    }

    pub fn head(&self, key: &str) -> Option<&VersionEntry> {
        let pos = *self.per_key.get(key)?.last()?;
        self.log.get(pos)
    }

    /// Blob hash of the live content of `key`, if any.
    pub fn live_blob(&self, key: &str) -> Option<&str> {
        self.head(key).and_then(|e| e.blob.as_deref())
    }

    pub fn history(&self, key: &str) -> Vec<VersionEntry> {
        self.per_key
            .get(key)
            .map(|positions| positions.iter().map(|&p| self.log[p].clone()).collect())
            .unwrap_or_default()
    }

    /// Resolve `reference` against the history of `key`.
    pub fn resolve(&self, key: &str, reference: &str) -> Result<&VersionEntry> {
        let not_found = || VellumError::not_found("commit", format!("{key}@{reference}"));
        if reference == HEAD_REF {
            return self.head(key).ok_or_else(not_found);
        }
        let positions = self.per_key.get(key).ok_or_else(not_found)?;
        let mut matches = positions
            .iter()
            .map(|&p| &self.log[p])
            .filter(|e| e.commit_id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(entry), None) if !reference.is_empty() => Ok(entry),
            _ => Err(not_found()),
        }
    }

    pub fn live_keys(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .per_key
            .keys()
            .filter(|k| k.starts_with(prefix) && self.live_blob(k).is_some())
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
