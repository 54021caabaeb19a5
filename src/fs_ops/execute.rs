//! Move executor.
//!
//! Buckets run in parallel (their paths never overlap); the plans of one bucket run
//! sequentially under the bucket lock. Per plan:
//! - cancellation requested -> Failed(Interrupted)
//! - destination exists -> SkippedExists (never overwritten)
//! - otherwise a no-replace rename -> Moved, or Failed with a described I/O error

use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::helpers::describe_io_error;
use super::lock::{acquire_dir_lock, try_acquire_dir_lock, DirLock};
use crate::classify::ImageKind;
use crate::date::CaptureDate;
use crate::errors::{FileErrorKind, FileFailure};
use crate::plan::{kind_dir, BucketPlan, MovePlan, MoveStatus};
use crate::platform::{fsync_dir, rename_no_replace, RenameOutcome};
use crate::pool;
use crate::shutdown;

/// Final state of one planned file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub file: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub date: CaptureDate,
    pub kind: ImageKind,
    #[serde(flatten)]
    pub status: MoveStatus,
}

impl From<MovePlan> for FileOutcome {
    fn from(p: MovePlan) -> Self {
        let status = p.status().clone();
        Self {
            file: p.file,
            source: p.source,
            destination: p.destination,
            date: p.date,
            kind: p.kind,
            status,
        }
    }
}

/// Tally of an execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSummary {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// one entry per plan, in date then file order
    pub outcomes: Vec<FileOutcome>,
    /// detail for every failed plan
    pub failures: Vec<FileFailure>,
    /// distinct dates whose bucket was processed, ascending
    pub dates: Vec<CaptureDate>,
}

/// Create the date folder and the subfolders this bucket needs. Existing folders are fine.
fn prepare_dirs(root: &Path, bucket: &BucketPlan) -> Result<(), String> {
    let mut dirs = vec![bucket.date_dir.clone()];
    if bucket.needs_raw {
        dirs.push(kind_dir(root, bucket.date, ImageKind::Raw));
    }
    if bucket.needs_compressed {
        dirs.push(kind_dir(root, bucket.date, ImageKind::Compressed));
    }
    for dir in dirs {
        fs::create_dir_all(&dir).map_err(|e| describe_io_error("create directory", &dir, &e))?;
        debug!(dir = %dir.display(), "directory ready");
    }
    Ok(())
}

/// Relocate one file without ever replacing an existing destination.
fn relocate(plan: &MovePlan) -> MoveStatus {
    if shutdown::is_requested() {
        return MoveStatus::Failed(FileErrorKind::Interrupted);
    }

    match fs::symlink_metadata(&plan.destination) {
        Ok(_) => {
            info!(file = %plan.file, dest = %plan.destination.display(), "destination exists; skipping");
            return MoveStatus::SkippedExists;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            let msg = describe_io_error("inspect destination", &plan.destination, &e);
            return MoveStatus::Failed(FileErrorKind::Relocation(msg));
        }
    }

    match rename_no_replace(&plan.source, &plan.destination) {
        Ok(RenameOutcome::Renamed) => {
            if let Some(parent) = plan.destination.parent() {
                let _ = fsync_dir(parent);
            }
            info!(file = %plan.file, dest = %plan.destination.display(), "moved");
            MoveStatus::Moved
        }
        Ok(RenameOutcome::DestinationExists) => {
            info!(file = %plan.file, dest = %plan.destination.display(), "destination appeared; skipping");
            MoveStatus::SkippedExists
        }
        Err(e) => {
            let msg = describe_io_error("rename file", &plan.source, &e);
            warn!(file = %plan.file, error = %msg, "move failed");
            MoveStatus::Failed(FileErrorKind::Relocation(msg))
        }
    }
}

fn lock_bucket(dir: &Path) -> io::Result<DirLock> {
    if let Some(lock) = try_acquire_dir_lock(dir)? {
        return Ok(lock);
    }
    info!(dir = %dir.display(), "another run holds this date folder; waiting");
    acquire_dir_lock(dir)
}

fn run_bucket(root: &Path, mut bucket: BucketPlan) -> BucketPlan {
    if shutdown::is_requested() {
        for plan in &mut bucket.plans {
            plan.finish(MoveStatus::Failed(FileErrorKind::Interrupted));
        }
        return bucket;
    }

    if let Err(reason) = prepare_dirs(root, &bucket) {
        warn!(date = %bucket.date, error = %reason, "cannot prepare date folder");
        for plan in &mut bucket.plans {
            plan.finish(MoveStatus::Failed(FileErrorKind::Relocation(reason.clone())));
        }
        return bucket;
    }

    // Advisory only: a filesystem without lock support still gets the per-bucket ordering.
    let _lock = match lock_bucket(&bucket.date_dir) {
        Ok(l) => Some(l),
        Err(e) => {
            warn!(dir = %bucket.date_dir.display(), error = %e, "bucket lock unavailable; continuing unlocked");
            None
        }
    };

    for plan in &mut bucket.plans {
        let status = relocate(plan);
        plan.finish(status);
    }
    bucket
}

/// Execute every bucket's plans under `root` with up to `jobs` buckets in flight.
pub fn execute(root: &Path, buckets: Vec<BucketPlan>, jobs: usize) -> ExecutionSummary {
    let done: Vec<BucketPlan> = pool::install(jobs, "move", || {
        buckets
            .into_par_iter()
            .map(|b| run_bucket(root, b))
            .collect()
    });

    let mut summary = ExecutionSummary::default();
    for bucket in done {
        summary.dates.push(bucket.date);
        for plan in bucket.plans {
            match plan.status() {
                MoveStatus::Moved => summary.moved += 1,
                MoveStatus::SkippedExists => summary.skipped += 1,
                MoveStatus::Failed(kind) => {
                    summary.failed += 1;
                    summary
                        .failures
                        .push(FileFailure::new(plan.file.clone(), kind.clone()));
                }
                MoveStatus::Pending => {
                    // run_bucket finishes every plan; treat a leftover as a failure anyway.
                    summary.failed += 1;
                    summary.failures.push(FileFailure::new(
                        plan.file.clone(),
                        FileErrorKind::Relocation("plan was never executed".into()),
                    ));
                }
            }
            summary.outcomes.push(plan.into());
        }
    }
    summary.dates.sort();
    summary.dates.dedup();

    info!(
        moved = summary.moved,
        skipped = summary.skipped,
        failed = summary.failed,
        dates = summary.dates.len(),
        "execution finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ImageFile;
    use crate::plan::{build_plan, group_by_date};
    use serial_test::serial;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn plan_for(root: &Path, names: &[&str]) -> Vec<BucketPlan> {
        let files: Vec<ImageFile> = names
            .iter()
            .map(|n| {
                fs::write(root.join(n), n.as_bytes()).unwrap();
                ImageFile::from_name(root, n, 0).unwrap()
            })
            .collect();
        let date = CaptureDate::from_ymd(2025, 10, 26).unwrap();
        let dates: BTreeMap<String, CaptureDate> =
            files.iter().map(|f| (f.name.clone(), date)).collect();
        build_plan(root, group_by_date(&files, &dates)).buckets
    }

    #[test]
    #[serial]
    fn moves_and_creates_only_needed_subfolders() {
        let td = tempdir().unwrap();
        let root = td.path();
        let buckets = plan_for(root, &["IMG_1.jpg", "IMG_2.png"]);

        let summary = execute(root, buckets, 2);
        assert_eq!((summary.moved, summary.skipped, summary.failed), (2, 0, 0));
        assert!(root.join("2025_10_26/2025_10_26-jpg/2025_10_26_1.jpg").exists());
        assert!(root.join("2025_10_26/2025_10_26-jpg/2025_10_26_2.png").exists());
        assert!(!root.join("2025_10_26/2025_10_26-raw").exists());
        assert!(!root.join("2025_10_26").join(super::super::lock::LOCK_FILE_NAME).exists());
        assert!(!root.join("IMG_1.jpg").exists());
    }

    #[test]
    #[serial]
    fn existing_destination_is_skipped_and_untouched() {
        let td = tempdir().unwrap();
        let root = td.path();
        let buckets = plan_for(root, &["IMG_5.CR2"]);
        let dest = root.join("2025_10_26/2025_10_26-raw/2025_10_26_5.CR2");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "original").unwrap();

        let summary = execute(root, buckets, 1);
        assert_eq!((summary.moved, summary.skipped, summary.failed), (0, 1, 0));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "original");
        assert!(root.join("IMG_5.CR2").exists());
        assert_eq!(summary.outcomes[0].status, MoveStatus::SkippedExists);
    }

    #[test]
    #[serial]
    fn vanished_source_fails_without_stopping_others() {
        let td = tempdir().unwrap();
        let root = td.path();
        let buckets = plan_for(root, &["IMG_1.jpg", "IMG_2.jpg"]);
        fs::remove_file(root.join("IMG_1.jpg")).unwrap();

        let summary = execute(root, buckets, 1);
        assert_eq!((summary.moved, summary.skipped, summary.failed), (1, 0, 1));
        assert_eq!(summary.failures[0].file, "IMG_1.jpg");
        assert!(matches!(summary.failures[0].error, FileErrorKind::Relocation(_)));
    }

    #[test]
    #[serial]
    fn cancellation_leaves_files_in_place() {
        let td = tempdir().unwrap();
        let root = td.path();
        let buckets = plan_for(root, &["IMG_1.jpg"]);
        shutdown::request();
        let summary = execute(root, buckets, 1);
        shutdown::reset();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].error, FileErrorKind::Interrupted);
        assert!(root.join("IMG_1.jpg").exists());
    }
}
