//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API so the rest of the crate stays
//! platform-agnostic.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    fsync_dir, open_log_file_secure_append, rename_no_replace, set_dir_mode_0700,
    write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    fsync_dir, open_log_file_secure_append, rename_no_replace, set_dir_mode_0700,
    write_config_secure_new_0600,
};

/// What a no-replace rename did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// Something already occupies the destination; nothing was touched.
    DestinationExists,
}

/// Portable fallback: refuse when the destination exists, else rename.
///
/// Not atomic against a concurrent creator of `dst`; callers hold the bucket lock.
pub(crate) fn checked_rename(src: &Path, dst: &Path) -> io::Result<RenameOutcome> {
    match fs::symlink_metadata(dst) {
        Ok(_) => return Ok(RenameOutcome::DestinationExists),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(src, dst)?;
    Ok(RenameOutcome::Renamed)
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique hidden sibling name for atomic config writes.
/// Pattern: `.photo_sort.tmp.<pid>.<nanos>.<seq>`
pub(crate) fn tmp_sibling_name(target: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    target
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".photo_sort.tmp.{pid}.{nanos}.{seq}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn tmp_names_are_unique() {
        let target = Path::new("dir/config.xml");
        let names: HashSet<PathBuf> = (0..64).map(|_| tmp_sibling_name(target)).collect();
        assert_eq!(names.len(), 64);
    }

    #[test]
    fn rename_no_replace_keeps_existing_destination() {
        let td = tempdir().unwrap();
        let src = td.path().join("a.jpg");
        let dst = td.path().join("b.jpg");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        assert_eq!(rename_no_replace(&src, &dst).unwrap(), RenameOutcome::DestinationExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
        assert!(src.exists());
    }

    #[test]
    fn rename_no_replace_moves_when_free() {
        let td = tempdir().unwrap();
        let src = td.path().join("a.jpg");
        let dst = td.path().join("b.jpg");
        fs::write(&src, "data").unwrap();

        assert_eq!(rename_no_replace(&src, &dst).unwrap(), RenameOutcome::Renamed);
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "data");
    }
}
