//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::paths;
use super::{EXIFTOOL_DEFAULT, MAX_DEFAULT_JOBS, READ_TIMEOUT_DEFAULT};
use crate::metadata::GatewayOptions;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// Per-file detail
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Worker count used when none is configured: available cores, capped.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_JOBS)
}

/// Runtime configuration for the organizer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// exiftool executable
    pub exiftool_path: PathBuf,
    /// Parallel metadata reads / bucket moves
    pub jobs: usize,
    /// Deadline for a single metadata read
    pub read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path().ok(),
            exiftool_path: PathBuf::from(EXIFTOOL_DEFAULT),
            jobs: default_jobs(),
            read_timeout: READ_TIMEOUT_DEFAULT,
        }
    }
}

impl Config {
    /// Gateway settings derived from this config.
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            program: self.exiftool_path.clone(),
            max_workers: self.jobs.max(1),
            read_timeout: self.read_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parse_aliases() {
        assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::parse(" normal "), Some(LogLevel::Normal));
        assert_eq!(LogLevel::parse("verbose"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("loud"), None);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn default_jobs_is_bounded() {
        let j = default_jobs();
        assert!((1..=MAX_DEFAULT_JOBS).contains(&j));
    }

    #[test]
    fn gateway_options_follow_config() {
        let cfg = Config {
            jobs: 3,
            read_timeout: Duration::from_secs(7),
            exiftool_path: PathBuf::from("/opt/exiftool"),
            ..Config::default()
        };
        let opts = cfg.gateway_options();
        assert_eq!(opts.max_workers, 3);
        assert_eq!(opts.read_timeout, Duration::from_secs(7));
        assert_eq!(opts.program, PathBuf::from("/opt/exiftool"));
    }
}
