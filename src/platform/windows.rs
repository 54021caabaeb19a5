//! Windows implementations of platform helpers (best-effort, no ACL management).

use anyhow::{bail, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::{checked_rename, tmp_sibling_name, RenameOutcome};

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a new config file via temp file + rename. Fails if the target already exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_sibling_name(path);
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    drop(f);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// No-op on Windows; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Directory handles cannot be fsynced through std on Windows.
pub fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// `fs::rename` replaces existing files on Windows, so always check first.
pub fn rename_no_replace(src: &Path, dst: &Path) -> io::Result<RenameOutcome> {
    checked_rename(src, dst)
}
