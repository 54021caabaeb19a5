//! Grouping by capture date and move-plan construction.
//!
//! Buckets are keyed by `CaptureDate` in a `BTreeMap`, so iteration is already chronological.
//! Within a bucket, files are ordered by name to keep previews and tests deterministic.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::path::{date_dir, destination};
use crate::classify::{ImageFile, ImageKind};
use crate::date::CaptureDate;
use crate::errors::{FileErrorKind, FileFailure};

/// Files sharing one capture date.
#[derive(Debug, Clone)]
pub struct DateBucket {
    pub date: CaptureDate,
    pub files: Vec<ImageFile>,
}

impl DateBucket {
    pub fn has_raw(&self) -> bool {
        self.files.iter().any(|f| f.kind == ImageKind::Raw)
    }

    pub fn has_compressed(&self) -> bool {
        self.files.iter().any(|f| f.kind == ImageKind::Compressed)
    }
}

/// Lifecycle of one planned move. Leaves `Pending` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "camelCase")]
pub enum MoveStatus {
    Pending,
    Moved,
    SkippedExists,
    Failed(FileErrorKind),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePlan {
    pub file: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub date: CaptureDate,
    pub kind: ImageKind,
    status: MoveStatus,
}

impl MovePlan {
    pub fn status(&self) -> &MoveStatus {
        &self.status
    }

    /// Record the terminal state. Returns false (and changes nothing) if the plan already left
    /// `Pending` or if `status` is `Pending`.
    pub fn finish(&mut self, status: MoveStatus) -> bool {
        if self.status != MoveStatus::Pending || status == MoveStatus::Pending {
            warn!(file = %self.file, from = ?self.status, to = ?status, "ignored second plan transition");
            return false;
        }
        self.status = status;
        true
    }
}

/// All plans for one date plus the subfolders they need.
#[derive(Debug, Clone)]
pub struct BucketPlan {
    pub date: CaptureDate,
    pub date_dir: PathBuf,
    pub needs_raw: bool,
    pub needs_compressed: bool,
    pub plans: Vec<MovePlan>,
}

/// Output of the plan builder.
#[derive(Debug, Clone, Default)]
pub struct PlanSet {
    /// sorted by date ascending
    pub buckets: Vec<BucketPlan>,
    /// dated files whose destination could not be computed
    pub errors: Vec<FileFailure>,
}

impl PlanSet {
    pub fn plan_count(&self) -> usize {
        self.buckets.iter().map(|b| b.plans.len()).sum()
    }

    pub fn plans(&self) -> impl Iterator<Item = &MovePlan> {
        self.buckets.iter().flat_map(|b| b.plans.iter())
    }
}

/// Group files by their resolved date. Files without a date are left out.
pub fn group_by_date(
    files: &[ImageFile],
    dates: &BTreeMap<String, CaptureDate>,
) -> BTreeMap<CaptureDate, DateBucket> {
    let mut buckets: BTreeMap<CaptureDate, DateBucket> = BTreeMap::new();
    for file in files {
        let Some(&date) = dates.get(&file.name) else {
            continue;
        };
        buckets
            .entry(date)
            .or_insert_with(|| DateBucket {
                date,
                files: Vec::new(),
            })
            .files
            .push(file.clone());
    }
    for bucket in buckets.values_mut() {
        bucket.files.sort_by(|a, b| a.name.cmp(&b.name));
    }
    buckets
}

/// Build one pending `MovePlan` per dated file under `root`.
pub fn build_plan(root: &Path, buckets: BTreeMap<CaptureDate, DateBucket>) -> PlanSet {
    let mut out = PlanSet::default();
    for (date, bucket) in buckets {
        let mut plans = Vec::with_capacity(bucket.files.len());
        for file in bucket.files {
            match destination(root, date, &file) {
                Ok(dest) => plans.push(MovePlan {
                    file: file.name,
                    source: file.source,
                    destination: dest,
                    date,
                    kind: file.kind,
                    status: MoveStatus::Pending,
                }),
                Err(e) => {
                    warn!(file = %file.name, error = %e, "cannot plan destination");
                    out.errors.push(FileFailure::new(
                        file.name,
                        FileErrorKind::PathPlanning(e.to_string()),
                    ));
                }
            }
        }
        if plans.is_empty() {
            continue;
        }
        let needs_raw = plans.iter().any(|p| p.kind == ImageKind::Raw);
        let needs_compressed = plans.iter().any(|p| p.kind == ImageKind::Compressed);
        debug!(%date, plans = plans.len(), needs_raw, needs_compressed, "bucket planned");
        out.buckets.push(BucketPlan {
            date,
            date_dir: date_dir(root, date),
            needs_raw,
            needs_compressed,
            plans,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<ImageFile> {
        names
            .iter()
            .map(|n| ImageFile::from_name(Path::new("/r"), n, 0).unwrap())
            .collect()
    }

    fn date(d: u32) -> CaptureDate {
        CaptureDate::from_ymd(2025, 10, d).unwrap()
    }

    #[test]
    fn groups_by_date_and_skips_undated() {
        let fs = files(&["IMG_3.jpg", "IMG_1.CR2", "IMG_2.jpg", "IMG_9.jpg"]);
        let mut dates = BTreeMap::new();
        dates.insert("IMG_1.CR2".to_string(), date(26));
        dates.insert("IMG_2.jpg".to_string(), date(26));
        dates.insert("IMG_3.jpg".to_string(), date(1));

        let buckets = group_by_date(&fs, &dates);
        let keys: Vec<String> = buckets.keys().map(|d| d.to_string()).collect();
        assert_eq!(keys, vec!["2025_10_01", "2025_10_26"]);

        let b = &buckets[&date(26)];
        assert!(b.has_raw() && b.has_compressed());
        let names: Vec<&str> = b.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["IMG_1.CR2", "IMG_2.jpg"]);

        let total: usize = buckets.values().map(|b| b.files.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn plans_record_errors_and_subfolders() {
        let fs = files(&["IMG_5499.jpg", "photo.CR2", "IMG_5498.CR2", "IMG_7.png"]);
        let mut dates = BTreeMap::new();
        for f in &fs {
            dates.insert(f.name.clone(), date(26));
        }
        dates.insert("IMG_7.png".to_string(), date(27));

        let set = build_plan(Path::new("/r"), group_by_date(&fs, &dates));
        assert_eq!(set.plan_count(), 3);
        assert_eq!(set.errors.len(), 1);
        assert_eq!(set.errors[0].file, "photo.CR2");
        assert!(matches!(set.errors[0].error, FileErrorKind::PathPlanning(_)));

        let first = &set.buckets[0];
        assert_eq!(first.date, date(26));
        assert!(first.needs_raw && first.needs_compressed);
        assert_eq!(first.date_dir, PathBuf::from("/r/2025_10_26"));

        let second = &set.buckets[1];
        assert!(!second.needs_raw && second.needs_compressed);
        assert!(set.plans().all(|p| *p.status() == MoveStatus::Pending));
    }

    #[test]
    fn plan_transitions_once() {
        let fs = files(&["IMG_1.jpg"]);
        let mut dates = BTreeMap::new();
        dates.insert("IMG_1.jpg".to_string(), date(26));
        let mut set = build_plan(Path::new("/r"), group_by_date(&fs, &dates));
        let plan = &mut set.buckets[0].plans[0];
        assert!(!plan.finish(MoveStatus::Pending));
        assert!(plan.finish(MoveStatus::Moved));
        assert!(!plan.finish(MoveStatus::SkippedExists));
        assert_eq!(*plan.status(), MoveStatus::Moved);
    }
}
