//! Backend doubles for failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vellum_core::namespace::CHECKPOINT_PREFIX;
use vellum_core::{Result, VellumError, VersionEntry};
use vellum_ledger::{ArtifactBackend, ContentPair, MemoryBackend};

/// Memory backend that can refuse checkpoint writes, or every write once
/// its `frozen` flag is raised.
#[derive(Default)]
pub(crate) struct FaultyBackend {
    inner: MemoryBackend,
    refuse_checkpoints: bool,
    frozen: Arc<AtomicBool>,
}

impl FaultyBackend {
    pub(crate) fn refusing_checkpoints() -> Self {
        Self {
            refuse_checkpoints: true,
            ..Self::default()
        }
    }

    /// The returned flag freezes the backend when set.
    pub(crate) fn freezable() -> (Self, Arc<AtomicBool>) {
        let backend = Self::default();
        let flag = Arc::clone(&backend.frozen);
        (backend, flag)
    }

    fn check_write(&self, key: &str) -> Result<()> {
        let refused = self.frozen.load(Ordering::SeqCst)
            || (self.refuse_checkpoints && key.starts_with(CHECKPOINT_PREFIX));
        if refused {
            return Err(VellumError::io(
                key,
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        Ok(())
    }
}

impl ArtifactBackend for FaultyBackend {
    fn put(&mut self, key: &str, bytes: &[u8], message: &str) -> Result<String> {
        self.check_write(key)?;
        self.inner.put(key, bytes, message)
    }
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key)
    }
    fn delete(&mut self, key: &str, message: &str) -> Result<String> {
        self.check_write(key)?;
        self.inner.delete(key, message)
    }
    fn history(&self, key: &str) -> Result<Vec<VersionEntry>> {
        self.inner.history(key)
    }
    fn diff(&self, key: &str, ref_a: &str, ref_b: &str) -> Result<ContentPair> {
        self.inner.diff(key, ref_a, ref_b)
    }
    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.keys(prefix)
    }
    fn head(&self, key: &str) -> Result<Option<VersionEntry>> {
        self.inner.head(key)
    }
    fn read_slot(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read_slot(name)
    }
    fn write_slot(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.check_write(name)?;
        self.inner.write_slot(name, bytes)
    }
}
