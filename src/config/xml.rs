//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template the first time the default location is missing.
//!
//! Unknown fields are rejected so typos surface instead of being silently ignored.

use anyhow::{bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{CONFIG_ENV, EXIFTOOL_DEFAULT, READ_TIMEOUT_DEFAULT};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    log_level: Option<String>,
    log_file: Option<String>,
    exiftool_path: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    jobs: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    read_timeout_seconds: Option<u64>,
}

// Numbers in hand-edited XML often carry surrounding whitespace.
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// Map XmlConfig onto defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    if let Some(s) = non_empty(parsed.log_file.as_deref()) {
        cfg.log_file = Some(PathBuf::from(s));
    }
    if let Some(s) = non_empty(parsed.exiftool_path.as_deref()) {
        cfg.exiftool_path = PathBuf::from(s);
    }
    if let Some(j) = parsed.jobs {
        cfg.jobs = usize::try_from(j).context("jobs out of range")?;
    }
    if let Some(secs) = parsed.read_timeout_seconds {
        cfg.read_timeout = Duration::from_secs(secs);
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in '{}'", path.display()))
}

/// Outcome of `load_or_init`.
#[derive(Debug)]
pub enum LoadResult {
    /// Config read from this file.
    Loaded(PathBuf, Config),
    /// No config existed; a template was written here and defaults are in effect.
    CreatedTemplate(PathBuf, Config),
    /// No config file; defaults in effect.
    Defaults(Config),
}


/// Load the config file, writing a template first when the default location is empty.
///
/// An explicit `$PHOTO_SORT_CONFIG` that points nowhere is an error, not a template.
pub fn load_or_init() -> Result<LoadResult> {
    let explicit = env::var_os(CONFIG_ENV).is_some();
    let path = default_config_path()?;

    if path.exists() {
        debug!(path = %path.display(), "loading config");
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(path, cfg));
    }
    if explicit {
        bail!("{CONFIG_ENV} points to a missing file: {}", path.display());
    }

    match create_template_config(&path) {
        Ok(()) => Ok(LoadResult::CreatedTemplate(path, Config::default())),
        Err(e) => {
            debug!(error = %e, "could not write template config; using defaults");
            Ok(LoadResult::Defaults(Config::default()))
        }
    }
}

/// Create the template config file and its parent directory.
/// Refuses to write through a symlinked ancestor.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/photo_sort.log".into());

    let content = format!(
        "<!--\n  photo_sort configuration (XML)\n\n    log_level              -> quiet | normal | info | debug\n    log_file               -> path to log file (optional; console output is kept)\n    exiftool_path          -> exiftool executable (name on PATH or absolute path)\n    jobs                   -> parallel metadata reads and date folders moved at once\n    read_timeout_seconds   -> give up on a single file's metadata after this long\n\n  CLI flags override these values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <exiftool_path>{}</exiftool_path>\n  <jobs>{}</jobs>\n  <read_timeout_seconds>{}</read_timeout_seconds>\n</config>\n",
        suggested_log,
        EXIFTOOL_DEFAULT,
        super::types::default_jobs(),
        READ_TIMEOUT_DEFAULT.as_secs()
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn whitespace_in_numbers_is_tolerated() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(
            &p,
            "<config>\n  <jobs> 2 </jobs>\n  <read_timeout_seconds>\n 9\n</read_timeout_seconds>\n</config>",
        )
        .unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.jobs, 2);
        assert_eq!(cfg.read_timeout, Duration::from_secs(9));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(&p, "<config><recursive>true</recursive></config>").unwrap();
        assert!(load_config_from_xml_path(&p).is_err());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(&p, "<config><log_level>shouty</log_level></config>").unwrap();
        assert!(load_config_from_xml_path(&p).is_err());
    }

    #[test]
    fn template_parses_back() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("nested").join("config.xml");
        create_template_config(&p).unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Normal);
        assert_eq!(cfg.exiftool_path, PathBuf::from(EXIFTOOL_DEFAULT));
        assert_eq!(cfg.read_timeout, READ_TIMEOUT_DEFAULT);
    }
}
