//! Tracing initialization.
//! Builds a subscriber with EnvFilter, supports compact or JSON formats, and optional file logging.
//!
//! Behavior:
//! - Log level is driven by LogLevel (no RUST_LOG override here).
//! - JSON/non-JSON formatting is selected via the `json` flag.
//! - If `log_file` is provided and passes safety checks, a non-blocking file layer is added.
//! - Console events go to stderr so `--report-json` output on stdout stays parseable.

use anyhow::Result;
use chrono::Local;
use photo_sort::output as out;
use photo_sort::platform::open_log_file_secure_append;
use photo_sort::{default_log_path, path_has_symlink_ancestor, LogLevel};
use std::fmt as stdfmt;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

#[inline]
fn to_level_filter(lvl: &LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

#[inline]
fn env_filter_from_level(level_filter: LevelFilter) -> EnvFilter {
    // Third-party crates stay at warn unless we are tracing everything.
    let directive = match level_filter {
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "warn,photo_sort=info",
        LevelFilter::DEBUG => "warn,photo_sort=debug",
        _ => "trace",
    };
    EnvFilter::new(directive)
}

/// Open a non-blocking file writer, or explain on stderr why not.
fn maybe_open_non_blocking_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(true) => {
            eprintln!(
                "Refusing to enable file logging: ancestor of {} is a symlink; proceeding without file logging.",
                path.display()
            );
            return None;
        }
        Err(e) => {
            eprintln!(
                "Error checking log path {} for symlinks: {}; proceeding without file logging.",
                path.display(),
                e
            );
            return None;
        }
        Ok(false) => {}
    }

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            None
        }
    }
}

/// Initialize tracing based on LogLevel and format. Returns the WorkerGuard of the file layer,
/// if one was created; it must be held until exit to flush logs.
pub fn init_tracing(
    lvl: &LogLevel,
    log_file: Option<&Path>,
    json: bool,
) -> Result<Option<WorkerGuard>> {
    let env_filter = env_filter_from_level(to_level_filter(lvl));

    let file = match log_file {
        Some(path) => {
            let opened = maybe_open_non_blocking_writer(path);
            if opened.is_none() {
                out::print_warn(&format!(
                    "Requested file logging to '{}' was not enabled. Check that the parent directory is writable and that no ancestor is a symlink. Logs will continue to stderr.",
                    path.display()
                ));
                if let Ok(def) = default_log_path() {
                    out::print_info(&format!(
                        "You can try using the default log path instead: {}",
                        def.display()
                    ));
                }
            }
            opened
        }
        None => None,
    };

    let (writer, guard) = match file {
        Some((w, g)) => (Some(w), Some(g)),
        None => (None, None),
    };

    // Option<Layer> is itself a Layer, so one registry chain covers both cases.
    if json {
        let console = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(io::stderr);
        let file_layer = writer.map(|w| {
            tsfmt::layer()
                .event_format(tsfmt::format().json())
                .with_timer(LocalHumanTime)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(w)
        });
        registry()
            .with(env_filter)
            .with(console)
            .with(file_layer)
            .try_init()?;
    } else {
        let console = tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_target(false)
            .compact()
            .with_writer(io::stderr);
        let file_layer = writer.map(|w| {
            tsfmt::layer()
                .with_timer(LocalHumanTime)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .compact()
                .with_writer(w)
        });
        registry()
            .with(env_filter)
            .with(console)
            .with(file_layer)
            .try_init()?;
    }
    Ok(guard)
}
