use crate::backend::{ArtifactBackend, ContentPair};
use crate::index::VersionIndex;
use std::collections::HashMap;
use vellum_core::digest::sha256_hex;
use vellum_core::{new_version_entry, Result, VellumError, VersionEntry, VersionOp};

/// Map-backed backend with a single global log. Nothing survives drop.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    index: VersionIndex,
    objects: HashMap<String, Vec<u8>>,
    slots: HashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn object(&self, key: &str, hash: &str) -> Result<Vec<u8>> {
        self.objects.get(hash).cloned().ok_or_else(|| VellumError::Corrupt {
            key: key.to_string(),
            detail: format!("missing object {hash}"),
        })
    }

    fn content_at(&self, key: &str, entry: &VersionEntry) -> Result<Option<Vec<u8>>> {
        match entry.blob.as_deref() {
            Some(hash) => self.object(key, hash).map(Some),
            None => Ok(None),
        }
    }
}

impl ArtifactBackend for MemoryBackend {
    fn put(&mut self, key: &str, bytes: &[u8], message: &str) -> Result<String> {
        let hash = sha256_hex(bytes);
        self.objects.entry(hash.clone()).or_insert_with(|| bytes.to_vec());
        let entry = new_version_entry(
            key,
            VersionOp::Put,
            self.index.last_commit(),
            Some(&hash),
            bytes.len() as u64,
            message,
        );
        let commit = entry.commit_id.clone();
        self.index.push(entry);
        Ok(commit)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        match self.index.live_blob(key) {
            Some(hash) => self.object(key, hash),
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
        let commit = entry.commit_id.clone();
        self.index.push(entry);
        Ok(commit)
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
        Ok(self.slots.get(name).cloned())
    }

    fn write_slot(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.slots.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HEAD_REF;

    #[test]
    fn put_get_delete_history() {
        let mut b = MemoryBackend::new();
        let c1 = b.put("/a.md", b"v1", "create /a.md").unwrap();
        let c2 = b.put("/a.md", b"v2", "update /a.md").unwrap();
        assert_eq!(b.get("/a.md").unwrap(), b"v2");
        assert!(b.exists("/a.md").unwrap());

        let c3 = b.delete("/a.md", "delete /a.md").unwrap();
        assert!(matches!(b.get("/a.md"), Err(VellumError::NotFound { .. })));
        assert!(!b.exists("/a.md").unwrap());

        let hist = b.history("/a.md").unwrap();
        let ids: Vec<_> = hist.iter().map(|e| e.commit_id.clone()).collect();
        assert_eq!(ids, vec![c1.clone(), c2.clone(), c3]);
        assert_eq!(hist[1].parent.as_deref(), Some(c1.as_str()));
        assert_eq!(hist[0].message, "create /a.md");
    }

    #[test]
    fn delete_missing_is_not_found_and_logs_nothing() {
        let mut b = MemoryBackend::new();
        assert!(b.delete("/nope", "delete /nope").is_err());
        assert!(b.history("/nope").unwrap().is_empty());
    }

    #[test]
    fn diff_between_commits() {
        let mut b = MemoryBackend::new();
        let c1 = b.put("/a.md", b"v1", "create").unwrap();
        let c2 = b.put("/a.md", b"v2", "update").unwrap();
        let (old, new) = b.diff("/a.md", &c1, &c2).unwrap();
        assert_eq!(old.as_deref(), Some(&b"v1"[..]));
        assert_eq!(new.as_deref(), Some(&b"v2"[..]));

        b.delete("/a.md", "delete").unwrap();
        let (old, new) = b.diff("/a.md", &c1[..10], HEAD_REF).unwrap();
        assert_eq!(old.as_deref(), Some(&b"v1"[..]));
        assert!(new.is_none());
    }

    #[test]
    fn keys_list_live_content_only() {
        let mut b = MemoryBackend::new();
        b.put("/sessions/s1/a.md", b"a", "m").unwrap();
        b.put("/sessions/s1/b.md", b"b", "m").unwrap();
        b.put("/docs/c.md", b"c", "m").unwrap();
        b.delete("/sessions/s1/b.md", "m").unwrap();
        assert_eq!(b.keys("/sessions/s1/").unwrap(), vec!["/sessions/s1/a.md"]);
        assert_eq!(b.keys("").unwrap().len(), 2);
    }

    #[test]
    fn slots_are_unversioned() {
        let mut b = MemoryBackend::new();
        assert!(b.read_slot("state").unwrap().is_none());
        b.write_slot("state", b"{}").unwrap();
        b.write_slot("state", b"{\"totalCycles\":1}").unwrap();
        assert_eq!(b.read_slot("state").unwrap().unwrap(), b"{\"totalCycles\":1}");
        assert!(b.history("state").unwrap().is_empty());
    }
}
