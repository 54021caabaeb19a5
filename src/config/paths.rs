//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

/// Config file location: `$PHOTO_SORT_CONFIG` if set, else `<config_dir>/photo_sort/config.xml`.
/// A relative env value is resolved against the current directory; a directory value gets
/// `config.xml` appended.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_ENV) {
        let mut p = PathBuf::from(raw);
        if p.is_relative() {
            p = env::current_dir()?.join(p);
        }
        if p.is_dir() {
            p.push("config.xml");
        }
        return Ok(p);
    }
    let base = config_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no HOME)"))?;
    Ok(base.join("photo_sort").join("config.xml"))
}

/// Log file location. Colocated with an explicit `$PHOTO_SORT_CONFIG`, otherwise
/// `<data_dir>/photo_sort/photo_sort.log`.
pub fn default_log_path() -> Result<PathBuf> {
    if env::var_os(CONFIG_ENV).is_some() {
        let cfg = default_config_path()?;
        let parent = cfg.parent().unwrap_or_else(|| Path::new("."));
        return Ok(parent.join("photo_sort.log"));
    }
    let base = data_dir()
        .or_else(|| {
            env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
        })
        .ok_or_else(|| anyhow!("cannot determine a data directory (no HOME)"))?;
    Ok(base.join("photo_sort").join("photo_sort.log"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
