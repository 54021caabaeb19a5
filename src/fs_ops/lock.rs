//! Advisory bucket lock.
//! Holds an exclusive lock on a sidecar file inside a date folder while its plans execute, so
//! two runs organizing into the same root never race on the same bucket.
//!
//! - Blocking acquire via fs2 (flock on Unix, LockFileEx on Windows).
//! - On Unix the sidecar is unlinked before the lock is released, and a waiter that wins an
//!   unlinked or replaced inode retries on the current one.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::trace;

pub const LOCK_FILE_NAME: &str = ".photo_sort.lock";

/// RAII guard for a held directory lock.
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl Drop for DirLock {
    #[cfg(unix)]
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
    }

    // A pending delete blocks new opens on Windows, so release first there.
    #[cfg(not(unix))]
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

/// True when `file` is still the sidecar at `path` (same device and inode).
#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(on_disk)) => held.dev() == on_disk.dev() && held.ino() == on_disk.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> bool {
    path.exists()
}

/// Block until the lock for `dir` is held. `dir` must exist.
pub fn acquire_dir_lock(dir: &Path) -> io::Result<DirLock> {
    let path = dir.join(LOCK_FILE_NAME);
    let start = Instant::now();
    loop {
        let file = open_lock_file(&path)?;
        file.lock_exclusive()?;
        // The previous holder unlinks the sidecar on release; a lock on an unlinked or
        // replaced file excludes nobody, so start over on the current one.
        if is_current(&file, &path) {
            let waited_ms = start.elapsed().as_millis() as u64;
            trace!(path = %path.display(), waited_ms, "bucket lock acquired");
            return Ok(DirLock { file, path });
        }
    }
}

/// Non-blocking variant; `Ok(None)` when another holder has it.
pub fn try_acquire_dir_lock(dir: &Path) -> io::Result<Option<DirLock>> {
    let path = dir.join(LOCK_FILE_NAME);
    let file = open_lock_file(&path)?;
    match file.try_lock_exclusive() {
        Ok(()) if is_current(&file, &path) => Ok(Some(DirLock { file, path })),
        Ok(()) => Ok(None),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_holder_is_refused_until_release() {
        let td = tempdir().unwrap();
        let held = acquire_dir_lock(td.path()).unwrap();
        assert!(try_acquire_dir_lock(td.path()).unwrap().is_none());
        drop(held);
        assert!(!td.path().join(LOCK_FILE_NAME).exists());
        assert!(try_acquire_dir_lock(td.path()).unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn replaced_sidecar_is_not_current() {
        let td = tempdir().unwrap();
        let path = td.path().join(LOCK_FILE_NAME);
        let stale = open_lock_file(&path).unwrap();
        assert!(is_current(&stale, &path));

        std::fs::remove_file(&path).unwrap();
        assert!(!is_current(&stale, &path));

        // A newer holder recreated the sidecar; the old handle still refers to the unlinked inode.
        let fresh = open_lock_file(&path).unwrap();
        assert!(!is_current(&stale, &path));
        assert!(is_current(&fresh, &path));
    }

    #[test]
    fn blocking_acquire_skips_a_stale_handle() {
        let td = tempdir().unwrap();
        let first = acquire_dir_lock(td.path()).unwrap();
        drop(first);
        let second = acquire_dir_lock(td.path()).unwrap();
        assert!(is_current(&second.file, &second.path));
    }
}
