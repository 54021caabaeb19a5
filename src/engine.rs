//! Engine entry points.
//!
//! `Engine::analyze` reads metadata and reports what organizing would do without touching the
//! folder. `Engine::organize` runs the whole pipeline: scan, extract, plan, execute.
//! Both consume the engine; the metadata source is shut down when the engine is dropped, so
//! every exit path (including `?` early returns) releases the reader.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::classify::{ImageFile, ImageKind};
use crate::config::Config;
use crate::errors::{EngineError, FileErrorKind};
use crate::extract::{extract_dates, Extraction};
use crate::fs_ops::{describe_io_error, execute};
use crate::metadata::{ExifToolGateway, GatewayError, MetadataSource};
use crate::plan::{build_plan, destination, group_by_date};
use crate::report::{AnalysisReport, OrganizeReport, PreviewOperation, PREVIEW_LIMIT};

/// Contents of a scanned folder.
#[derive(Debug, Clone)]
pub struct FolderScan {
    /// canonical folder path; also the root of the destination layout
    pub root: PathBuf,
    /// non-directory entries seen, images or not
    pub total_files: usize,
    /// recognised images, sorted by name
    pub images: Vec<ImageFile>,
}

impl FolderScan {
    pub fn raw_count(&self) -> usize {
        self.count(ImageKind::Raw)
    }

    pub fn compressed_count(&self) -> usize {
        self.count(ImageKind::Compressed)
    }

    fn count(&self, kind: ImageKind) -> usize {
        self.images.iter().filter(|f| f.kind == kind).count()
    }
}

fn validate_folder(folder: &Path) -> Result<PathBuf, EngineError> {
    let meta = fs::metadata(folder).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EngineError::InputNotFound(folder.to_path_buf()),
        _ => EngineError::InputUnreadable {
            path: folder.to_path_buf(),
            context: describe_io_error("stat folder", folder, &e),
        },
    })?;
    if !meta.is_dir() {
        return Err(EngineError::InputNotDirectory(folder.to_path_buf()));
    }
    dunce::canonicalize(folder).map_err(|e| EngineError::InputUnreadable {
        path: folder.to_path_buf(),
        context: describe_io_error("canonicalize folder", folder, &e),
    })
}

/// List `folder` (not recursive) and classify its entries.
pub fn scan_folder(folder: &Path) -> Result<FolderScan, EngineError> {
    let root = validate_folder(folder)?;

    let mut total_files = 0usize;
    let mut images = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                let context = e
                    .io_error()
                    .map(|io| describe_io_error("read folder", &root, io))
                    .unwrap_or_else(|| e.to_string());
                return Err(EngineError::InputUnreadable {
                    path: root.clone(),
                    context,
                });
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        total_files += 1;

        let Some(name) = entry.file_name().to_str() else {
            debug!(path = %entry.path().display(), "skipping non-UTF-8 file name");
            continue;
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if let Some(image) = ImageFile::from_name(&root, name, size) {
            images.push(image);
        }
    }
    images.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        folder = %root.display(),
        total_files,
        images = images.len(),
        "folder scanned"
    );
    Ok(FolderScan {
        root,
        total_files,
        images,
    })
}

fn preview_for(root: &Path, file: &ImageFile, extraction: &Extraction) -> PreviewOperation {
    let date = extraction.dates.get(&file.name).copied();
    let (new_path, error) = match date {
        Some(d) => match destination(root, d, file) {
            Ok(p) => (Some(p), None),
            Err(e) => (None, Some(FileErrorKind::PathPlanning(e.to_string()).to_string())),
        },
        None => {
            let reason = extraction
                .failures
                .iter()
                .find(|f| f.file == file.name)
                .map(|f| f.reason.clone())
                .unwrap_or_else(|| FileErrorKind::MetadataUnavailable.to_string());
            (None, Some(reason))
        }
    };
    PreviewOperation {
        old_name: file.name.clone(),
        source: file.source.clone(),
        new_path,
        date,
        kind: file.kind,
        error,
    }
}

/// Organization engine bound to one metadata source.
pub struct Engine<M: MetadataSource> {
    config: Config,
    source: M,
}

impl<M: MetadataSource> Engine<M> {
    pub fn new(config: Config, source: M) -> Self {
        Self { config, source }
    }

    /// Report counts, dates and a short preview. The folder is left untouched.
    pub fn analyze(self, folder: &Path) -> Result<AnalysisReport, EngineError> {
        let scan = scan_folder(folder)?;
        let mut report = AnalysisReport {
            total_files: scan.total_files,
            image_files: scan.images.len(),
            raw_files: scan.raw_count(),
            jpeg_files: scan.compressed_count(),
            ..Default::default()
        };
        if scan.images.is_empty() {
            info!(folder = %scan.root.display(), "no image files found");
            return Ok(report);
        }

        let extraction = extract_dates(&self.source, &scan.images, self.config.jobs)?;
        let buckets = group_by_date(&scan.images, &extraction.dates);

        report.unique_dates = buckets.keys().copied().collect();
        report.preview = scan
            .images
            .iter()
            .take(PREVIEW_LIMIT)
            .map(|f| preview_for(&scan.root, f, &extraction))
            .collect();
        report.has_more_files = report.image_files > PREVIEW_LIMIT;
        report.undated_count = extraction.failures.len();
        report.undated = extraction.failures;
        report.warnings = extraction.warnings.into_iter().map(Into::into).collect();

        info!(
            images = report.image_files,
            dates = report.unique_dates.len(),
            undated = report.undated_count,
            "analysis finished"
        );
        Ok(report)
    }

    /// Move every dated image into its date folder. Existing destinations are never replaced.
    pub fn organize(self, folder: &Path) -> Result<OrganizeReport, EngineError> {
        let scan = scan_folder(folder)?;
        let mut report = OrganizeReport {
            total_files: scan.total_files,
            image_files: scan.images.len(),
            ..Default::default()
        };
        if scan.images.is_empty() {
            info!(folder = %scan.root.display(), "no image files found");
            return Ok(report);
        }

        let extraction = extract_dates(&self.source, &scan.images, self.config.jobs)?;
        let plan_set = build_plan(&scan.root, group_by_date(&scan.images, &extraction.dates));
        let summary = execute(&scan.root, plan_set.buckets, self.config.jobs);

        let mut failures = plan_set.errors;
        failures.extend(summary.failures);

        report.success_count = summary.moved;
        report.skipped_count = summary.skipped;
        report.error_count = failures.len();
        report.undated_count = extraction.failures.len();
        report.outcomes = summary.outcomes;
        report.failures = failures;
        report.undated = extraction.failures;
        report.dates_processed = summary.dates;

        if report.accounted() != report.image_files {
            warn!(
                accounted = report.accounted(),
                images = report.image_files,
                "report does not account for every image"
            );
        }
        info!(
            moved = report.success_count,
            skipped = report.skipped_count,
            errors = report.error_count,
            undated = report.undated_count,
            "organize finished"
        );
        Ok(report)
    }
}

impl<M: MetadataSource> Drop for Engine<M> {
    fn drop(&mut self) {
        self.source.shutdown();
    }
}

fn open_gateway(config: &Config) -> Result<ExifToolGateway, EngineError> {
    ExifToolGateway::new(config.gateway_options()).map_err(|e| match e {
        GatewayError::AlreadyLive => EngineError::GatewayUnavailable(e.to_string()),
    })
}

/// `Engine::analyze` with an exiftool gateway owned for the duration of the call.
pub fn analyze(folder: &Path, config: &Config) -> Result<AnalysisReport, EngineError> {
    Engine::new(config.clone(), open_gateway(config)?).analyze(folder)
}

/// `Engine::organize` with an exiftool gateway owned for the duration of the call.
pub fn organize(folder: &Path, config: &Config) -> Result<OrganizeReport, EngineError> {
    Engine::new(config.clone(), open_gateway(config)?).organize(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::CaptureDate;
    use crate::metadata::{MetadataError, MetadataRecord};
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct SameDay {
        shutdowns: AtomicUsize,
    }

    impl MetadataSource for SameDay {
        fn read(&self, _path: &Path) -> Result<MetadataRecord, MetadataError> {
            Ok(MetadataRecord {
                capture_date: CaptureDate::from_ymd(2025, 10, 26),
                warnings: Vec::new(),
            })
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn source() -> SameDay {
        SameDay {
            shutdowns: AtomicUsize::new(0),
        }
    }

    #[test]
    fn scan_counts_everything_but_keeps_images() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("b_2.JPG"), b"12").unwrap();
        fs::write(td.path().join("a_1.nef"), b"1").unwrap();
        fs::write(td.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(td.path().join("2025_01_01")).unwrap();

        let scan = scan_folder(td.path()).unwrap();
        assert_eq!(scan.total_files, 3);
        let names: Vec<&str> = scan.images.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a_1.nef", "b_2.JPG"]);
        assert_eq!((scan.raw_count(), scan.compressed_count()), (1, 1));
        assert_eq!(scan.images[1].size, 2);
    }

    #[test]
    fn scan_rejects_missing_and_file_inputs() {
        let td = tempdir().unwrap();
        let missing = td.path().join("nope");
        assert!(matches!(scan_folder(&missing), Err(EngineError::InputNotFound(_))));
        let file = td.path().join("f.jpg");
        fs::write(&file, b"").unwrap();
        assert!(matches!(scan_folder(&file), Err(EngineError::InputNotDirectory(_))));
    }

    #[test]
    #[serial]
    fn source_is_shut_down_on_error_paths() {
        let td = tempdir().unwrap();
        let src = source();
        let res = Engine::new(Config::default(), &src).organize(&td.path().join("missing"));
        assert!(res.is_err());
        assert_eq!(src.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[serial]
    fn empty_folder_reports_zero_images() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("readme.md"), b"").unwrap();
        let src = source();
        let report = Engine::new(Config::default(), &src).analyze(td.path()).unwrap();
        assert_eq!((report.total_files, report.image_files), (1, 0));
        assert!(report.preview.is_empty());
    }

    #[test]
    #[serial]
    fn preview_is_limited_and_flags_planning_errors() {
        let td = tempdir().unwrap();
        for n in ["IMG_1.jpg", "IMG_2.jpg", "IMG_3.jpg", "IMG_4.jpg", "IMG_5.jpg", "IMG_6.jpg"] {
            fs::write(td.path().join(n), b"x").unwrap();
        }
        fs::write(td.path().join("Apple.CR2"), b"x").unwrap();

        let report = Engine::new(Config::default(), source()).analyze(td.path()).unwrap();
        assert_eq!(report.image_files, 7);
        assert_eq!(report.preview.len(), PREVIEW_LIMIT);
        assert!(report.has_more_files);

        let first = &report.preview[0];
        assert_eq!(first.old_name, "Apple.CR2");
        assert!(first.new_path.is_none());
        assert!(first.error.as_deref().unwrap().starts_with("Path error"));

        let second = &report.preview[1];
        assert_eq!(second.old_name, "IMG_1.jpg");
        let dest = second.new_path.as_ref().unwrap();
        assert!(dest.ends_with("2025_10_26/2025_10_26-jpg/2025_10_26_1.jpg"));
        assert!(td.path().join("IMG_1.jpg").exists());
    }
}
