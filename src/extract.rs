//! Batch metadata extraction.
//! Reads the capture date of every image through a `MetadataSource` with bounded parallelism.
//! One bad file never aborts the batch: its failure is recorded and the rest continue.
//! Only a gateway startup failure is fatal.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::classify::ImageFile;
use crate::date::CaptureDate;
use crate::errors::{EngineError, FileErrorKind, FileFailure};
use crate::metadata::{MetadataError, MetadataSource};
use crate::pool;
use crate::shutdown;

/// Outcome of a batch read.
///
/// Every input file lands in exactly one of `dates` or `failures`.
#[derive(Debug, Default, Clone)]
pub struct Extraction {
    /// file name -> capture date
    pub dates: BTreeMap<String, CaptureDate>,
    /// files with no usable capture date, with the reason
    pub failures: Vec<FileFailure>,
    /// (file name, warning) pairs reported by the reader
    pub warnings: Vec<(String, String)>,
}

enum Read {
    Dated(CaptureDate, Vec<String>),
    Undated(FileErrorKind, Vec<String>),
    Fatal(String),
}

fn read_one<M: MetadataSource + ?Sized>(source: &M, file: &ImageFile) -> Read {
    if shutdown::is_requested() {
        return Read::Undated(FileErrorKind::Interrupted, Vec::new());
    }
    match source.read(&file.source) {
        Ok(rec) => match rec.capture_date {
            Some(date) => Read::Dated(date, rec.warnings),
            None => Read::Undated(FileErrorKind::MetadataUnavailable, rec.warnings),
        },
        Err(MetadataError::Startup(msg)) => Read::Fatal(msg),
        Err(e) => Read::Undated(FileErrorKind::MetadataRead(e.to_string()), Vec::new()),
    }
}

/// Read capture dates for `files` using at most `jobs` concurrent reads.
pub fn extract_dates<M>(
    source: &M,
    files: &[ImageFile],
    jobs: usize,
) -> Result<Extraction, EngineError>
where
    M: MetadataSource + ?Sized,
{
    let reads: Vec<(&ImageFile, Read)> = pool::install(jobs, "exif", || {
        files.par_iter().map(|f| (f, read_one(source, f))).collect()
    });

    let mut out = Extraction::default();
    for (file, read) in reads {
        match read {
            Read::Fatal(msg) => {
                warn!(file = %file.name, error = %msg, "metadata reader failed to start");
                return Err(EngineError::GatewayStartup(msg));
            }
            Read::Dated(date, warnings) => {
                debug!(file = %file.name, %date, "capture date read");
                out.dates.insert(file.name.clone(), date);
                out.warnings
                    .extend(warnings.into_iter().map(|w| (file.name.clone(), w)));
            }
            Read::Undated(kind, warnings) => {
                warn!(file = %file.name, reason = %kind, "no usable capture date");
                out.warnings
                    .extend(warnings.into_iter().map(|w| (file.name.clone(), w)));
                out.failures.push(FileFailure::new(file.name.clone(), kind));
            }
        }
    }

    info!(
        dated = out.dates.len(),
        undated = out.failures.len(),
        "metadata extraction finished"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataRecord;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fake {
        answers: HashMap<PathBuf, Result<MetadataRecord, MetadataError>>,
        reads: AtomicUsize,
    }

    impl MetadataSource for Fake {
        fn read(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.answers
                .get(path)
                .cloned()
                .unwrap_or(Err(MetadataError::Read("unknown file".into())))
        }
        fn shutdown(&self) {}
    }

    fn img(name: &str) -> ImageFile {
        ImageFile::from_name(Path::new("/p"), name, 0).unwrap()
    }

    fn dated(y: i32, m: u32, d: u32) -> Result<MetadataRecord, MetadataError> {
        Ok(MetadataRecord {
            capture_date: CaptureDate::from_ymd(y, m, d),
            warnings: vec![],
        })
    }

    #[test]
    #[serial]
    fn per_file_failures_do_not_abort() {
        let files = vec![img("IMG_1.jpg"), img("IMG_2.jpg"), img("IMG_3.CR2"), img("IMG_4.png")];
        let mut answers = HashMap::new();
        answers.insert(PathBuf::from("/p/IMG_1.jpg"), dated(2025, 10, 26));
        answers.insert(PathBuf::from("/p/IMG_2.jpg"), Err(MetadataError::Read("corrupt".into())));
        answers.insert(PathBuf::from("/p/IMG_3.CR2"), Ok(MetadataRecord::default()));
        answers.insert(
            PathBuf::from("/p/IMG_4.png"),
            Err(MetadataError::Timeout(std::time::Duration::from_secs(1))),
        );
        let fake = Fake {
            answers,
            reads: AtomicUsize::new(0),
        };

        let out = extract_dates(&fake, &files, 3).unwrap();
        assert_eq!(fake.reads.load(Ordering::SeqCst), 4);
        assert_eq!(out.dates.len(), 1);
        assert_eq!(out.failures.len(), 3);
        assert_eq!(out.dates.len() + out.failures.len(), files.len());

        let unavailable = out.failures.iter().find(|f| f.file == "IMG_3.CR2").unwrap();
        assert_eq!(unavailable.error, FileErrorKind::MetadataUnavailable);
        let corrupt = out.failures.iter().find(|f| f.file == "IMG_2.jpg").unwrap();
        assert!(matches!(corrupt.error, FileErrorKind::MetadataRead(_)));
    }

    #[test]
    #[serial]
    fn startup_failure_is_fatal() {
        let mut answers = HashMap::new();
        answers.insert(
            PathBuf::from("/p/IMG_1.jpg"),
            Err(MetadataError::Startup("no exiftool".into())),
        );
        let fake = Fake {
            answers,
            reads: AtomicUsize::new(0),
        };
        let err = extract_dates(&fake, &[img("IMG_1.jpg")], 1).unwrap_err();
        assert!(matches!(err, EngineError::GatewayStartup(_)));
    }

    #[test]
    #[serial]
    fn cancellation_skips_reads() {
        let fake = Fake {
            answers: HashMap::new(),
            reads: AtomicUsize::new(0),
        };
        shutdown::request();
        let out = extract_dates(&fake, &[img("IMG_1.jpg"), img("IMG_2.jpg")], 2).unwrap();
        shutdown::reset();
        assert_eq!(fake.reads.load(Ordering::SeqCst), 0);
        assert!(out.failures.iter().all(|f| f.error == FileErrorKind::Interrupted));
        assert_eq!(out.failures.len(), 2);
    }
}
