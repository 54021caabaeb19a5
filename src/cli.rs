//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Folder arguments are stripped of stray quotes left by Windows shells.

use clap::{Parser, Subcommand, ValueHint};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::types::{Config, LogLevel};

/// Organize photos into dated raw/jpg folders using EXIF capture dates.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Organize photos into dated raw/jpg folders by EXIF capture date"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Write logs to this file in addition to stderr.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// exiftool executable to use.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub exiftool: Option<PathBuf>,

    /// Parallel metadata reads and date folders moved at once.
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-file metadata read timeout in seconds.
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print the analyze/organize report as JSON instead of a summary.
    #[arg(long, global = true)]
    pub report_json: bool,

    /// Print where photo_sort looks for its config file (or PHOTO_SORT_CONFIG), then exit.
    #[arg(long, help = "Print the config file location used by photo_sort and exit")]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show counts, capture dates and a preview without moving anything.
    Analyze {
        #[arg(value_name = "FOLDER", value_hint = ValueHint::DirPath)]
        folder: PathBuf,
    },
    /// Move photos into dated folders.
    Organize {
        #[arg(value_name = "FOLDER", value_hint = ValueHint::DirPath)]
        folder: PathBuf,
    },
    /// List the image files in a folder with their sizes.
    List {
        #[arg(value_name = "FOLDER", value_hint = ValueHint::DirPath)]
        folder: PathBuf,
    },
}

impl Command {
    /// Target folder with stray quotes removed.
    pub fn folder(&self) -> PathBuf {
        let raw = match self {
            Command::Analyze { folder }
            | Command::Organize { folder }
            | Command::List { folder } => folder,
        };
        Args::sanitize_path(raw)
    }
}

impl Args {
    #[inline]
    fn sanitize_path(p: &Path) -> PathBuf {
        Self::sanitize_str(&p.to_string_lossy())
    }

    pub(crate) fn sanitize_str(s: &str) -> PathBuf {
        // PowerShell and CMD sometimes pass the quotes through.
        let trimmed = s.trim();
        let mut inner = if trimmed.len() >= 2
            && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
                || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
        {
            trimmed[1..trimmed.len() - 1].to_string()
        } else {
            trimmed.trim_matches(|c| c == '\'' || c == '"').to_string()
        };
        inner.retain(|c| c != '\'' && c != '"');

        // One trailing separator left behind by quoting; keep a bare root.
        if (inner.ends_with('\\') || inner.ends_with('/')) && inner.len() > 1 {
            inner.pop();
        }
        PathBuf::from(inner)
    }

    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        if let Some(p) = &self.exiftool {
            cfg.exiftool_path = p.clone();
        }
        if let Some(j) = self.jobs {
            cfg.jobs = j;
        }
        if let Some(secs) = self.timeout {
            cfg.read_timeout = Duration::from_secs(secs);
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
