use crate::paths::VellumPaths;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use vellum_core::{Result, VellumError};

/// Exclusive lock on `.vellum/LOCK`, held for as long as a backend is open so
/// that only one process writes the version log. Released on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    _file: File,
}

impl WorkspaceLock {
    /// Non-blocking; fails if another process holds the lock.
    pub fn acquire(paths: &VellumPaths) -> Result<Self> {
        let key = paths.lock_file.display().to_string();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .map_err(|e| VellumError::io(&key, e))?;
        file.try_lock_exclusive().map_err(|e| {
            VellumError::io(
                &key,
                std::io::Error::new(e.kind(), "workspace is locked by another writer"),
            )
        })?;
        Ok(Self { _file: file })
    }
}
