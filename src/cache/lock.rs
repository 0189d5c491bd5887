//! Provides the per-key advisory lock used by [`CacheStore::with_lock`](super::CacheStore::with_lock):
//! a `.lock` sibling file, exclusively locked with `fs2`, with stale-lock recovery for lock files
//! left behind by a crashed peer.

use super::LOCK_FILE_LIFETIME;
use crate::error::StoreError;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

/// A held exclusive lock on a cache key's `.lock` file. Unlocks and closes the file on drop, so
/// a panic or an early `?`-return inside the critical section can never leak the lock.
pub struct LockGuard {
    /// The locked file handle. Kept alive only so `Drop` can unlock it; never read or written.
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // best-effort: a failed unlock here just means the OS reclaims it when the fd closes,
        // which happens immediately after anyway.
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Acquires the exclusive advisory lock on `lock_path`, replacing it first if its mtime shows
/// it's older than [`LOCK_FILE_LIFETIME`] (abandoned by a crashed peer).
pub fn acquire(lock_path: &Path) -> Result<LockGuard, StoreError> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if is_stale(lock_path)? {
        log::debug!("Removing stale lock file: {}", lock_path.display());
        // another peer may have removed and recreated it between our check and this call; a
        // missing file here is not an error.
        if let Err(e) = fs::remove_file(lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e.into());
            }
        }
    }

    let file = OpenOptions::new().create(true).write(true).open(lock_path)?;
    file.lock_exclusive()?;

    Ok(LockGuard { file })
}

/// Returns whether the lock file at `path` exists and its mtime is older than
/// [`LOCK_FILE_LIFETIME`].
fn is_stale(path: &Path) -> Result<bool, StoreError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let age = metadata.modified()?.elapsed().unwrap_or_default();
    Ok(age > LOCK_FILE_LIFETIME)
}

/// Returns whether a stale lock file currently sits at `path`, without touching it. Used by
/// [`super::CacheStore::stats`] to count stale locks.
pub(super) fn is_stale_at(path: &PathBuf) -> bool {
    is_stale(path).unwrap_or(false)
}
