//! User-facing console lines.
//! Colors are enabled only when the stream is a TTY, so piped output stays plain.

use owo_colors::OwoColorize;

use crate::engine::FolderScan;
use crate::report::{AnalysisReport, OrganizeReport};

fn stdout_is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn stderr_is_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

pub fn print_info(msg: &str) {
    if stdout_is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if stderr_is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if stderr_is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if stdout_is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain line (no prefix). Used for listings users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// `12.3` for a size in bytes, one decimal, base 1024.
pub fn megabytes(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / (1024.0 * 1024.0))
}

pub fn print_listing(scan: &FolderScan) {
    for f in &scan.images {
        print_user(&format!("  {} - {} MB", f.name, megabytes(f.size)));
    }
    print_user(&format!("Found {} image files", scan.images.len()));
}

pub fn print_analysis(report: &AnalysisReport) {
    if report.image_files == 0 {
        print_info("No image files found in this folder");
        return;
    }
    print_user(&format!("Total files:  {}", report.total_files));
    print_user(&format!(
        "Image files:  {} ({} RAW, {} JPEG)",
        report.image_files, report.raw_files, report.jpeg_files
    ));
    let dates: Vec<String> = report.unique_dates.iter().map(ToString::to_string).collect();
    print_user(&format!("Dates:        {}", dates.join(", ")));
    if report.undated_count > 0 {
        print_warn(&format!("{} file(s) have no usable capture date", report.undated_count));
    }
    print_user("Preview:");
    for op in &report.preview {
        match (&op.new_path, &op.error) {
            (Some(dest), _) => print_user(&format!("  {} -> {}", op.old_name, dest.display())),
            (None, Some(err)) => print_user(&format!("  {} (skipped: {})", op.old_name, err)),
            (None, None) => print_user(&format!("  {}", op.old_name)),
        }
    }
    if let Some(more) = preview_remainder(report) {
        print_user(&format!("  ... and {more} more"));
    }
}

/// Images left out of the preview, if any.
fn preview_remainder(report: &AnalysisReport) -> Option<usize> {
    if !report.has_more_files {
        return None;
    }
    Some(report.image_files.saturating_sub(report.preview.len())).filter(|n| *n > 0)
}

pub fn print_organize(report: &OrganizeReport) {
    if report.image_files == 0 {
        print_info("No image files found in this folder");
        return;
    }
    let line = format!(
        "Organized {} file(s): {} moved, {} skipped (already present), {} failed, {} undated",
        report.image_files,
        report.success_count,
        report.skipped_count,
        report.error_count,
        report.undated_count
    );
    if report.is_clean() {
        print_success(&line);
    } else {
        print_warn(&line);
    }
    for f in report.failures.iter().chain(report.undated.iter()) {
        print_user(&format!("  {}: {}", f.file, f.reason));
    }
}
