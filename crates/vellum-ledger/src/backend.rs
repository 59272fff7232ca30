use vellum_core::{Result, VersionEntry};

/// Reference accepted by [`ArtifactBackend::diff`] for the current content.
pub const HEAD_REF: &str = "HEAD";

/// Content of a key at two references. `None` means the key had no content
/// there (deleted, or not yet created).
pub type ContentPair = (Option<Vec<u8>>, Option<Vec<u8>>);

/// Byte-level persistence with an append-only version log.
///
/// Every `put`/`delete` is indivisible: it either mutates the current content
/// and appends exactly one [`VersionEntry`], or fails having done neither.
/// Slots are a separate, unversioned keyspace for reserved records.
pub trait ArtifactBackend: Send {
    /// Store `bytes` as the new content of `key`; returns the commit id.
    fn put(&mut self, key: &str, bytes: &[u8], message: &str) -> Result<String>;

    /// Current content of `key`, or `NotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Remove `key`; returns the commit id. `NotFound` if it has no content.
    fn delete(&mut self, key: &str, message: &str) -> Result<String>;

    /// Every entry for `key`, oldest first.
    fn history(&self, key: &str) -> Result<Vec<VersionEntry>>;

    /// Content of `key` at two references. A reference is a commit id, a
    /// unique commit id prefix, or [`HEAD_REF`].
    fn diff(&self, key: &str, ref_a: &str, ref_b: &str) -> Result<ContentPair>;

    /// Keys that currently have content and start with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Most recent entry for `key`, including a delete.
    fn head(&self, key: &str) -> Result<Option<VersionEntry>>;

    fn read_slot(&self, name: &str) -> Result<Option<Vec<u8>>>;

    fn write_slot(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.head(key)?.is_some_and(|e| !e.is_delete()))
    }
}
