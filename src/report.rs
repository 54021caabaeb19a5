//! Serializable run reports.
//! Keys are camelCase so a GUI or IPC caller can consume `serde_json` output directly.

use serde::Serialize;
use std::path::PathBuf;

use crate::classify::ImageKind;
use crate::date::CaptureDate;
use crate::errors::FileFailure;
use crate::fs_ops::FileOutcome;

/// Number of images sampled into `AnalysisReport::preview`.
pub const PREVIEW_LIMIT: usize = 5;

/// What would happen to one image if the folder were organized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOperation {
    pub old_name: String,
    pub source: PathBuf,
    pub new_path: Option<PathBuf>,
    pub date: Option<CaptureDate>,
    #[serde(rename = "type")]
    pub kind: ImageKind,
    /// Why the file would not be moved, if it would not.
    pub error: Option<String>,
}

/// Result of `analyze`. Nothing on disk is changed to produce it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub total_files: usize,
    pub image_files: usize,
    pub raw_files: usize,
    pub jpeg_files: usize,
    pub unique_dates: Vec<CaptureDate>,
    #[serde(rename = "filesWithoutExif")]
    pub undated_count: usize,
    #[serde(rename = "previewOperations")]
    pub preview: Vec<PreviewOperation>,
    /// More images exist than the preview shows.
    pub has_more_files: bool,
    pub undated: Vec<FileFailure>,
    pub warnings: Vec<FileWarning>,
}

/// A non-fatal message the metadata reader attached to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWarning {
    pub file: String,
    pub message: String,
}

impl From<(String, String)> for FileWarning {
    fn from((file, message): (String, String)) -> Self {
        Self { file, message }
    }
}

/// Result of `organize`.
///
/// `success_count + skipped_count + error_count + undated_count == image_files`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeReport {
    pub total_files: usize,
    pub image_files: usize,
    pub success_count: usize,
    pub skipped_count: usize,
    /// path planning plus relocation failures
    pub error_count: usize,
    pub undated_count: usize,
    pub outcomes: Vec<FileOutcome>,
    pub failures: Vec<FileFailure>,
    pub undated: Vec<FileFailure>,
    pub dates_processed: Vec<CaptureDate>,
}

impl OrganizeReport {
    /// True when every image was moved or was already in place.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.undated_count == 0
    }

    pub fn accounted(&self) -> usize {
        self.success_count + self.skipped_count + self.error_count + self.undated_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FileErrorKind;

    #[test]
    fn analysis_keys_are_camel_case() {
        let report = AnalysisReport {
            total_files: 9,
            image_files: 7,
            raw_files: 1,
            jpeg_files: 1,
            unique_dates: vec![CaptureDate::from_ymd(2025, 10, 26).unwrap()],
            preview: vec![PreviewOperation {
                old_name: "IMG_1.CR2".into(),
                source: PathBuf::from("/in/IMG_1.CR2"),
                new_path: None,
                date: None,
                kind: ImageKind::Raw,
                error: Some("No EXIF date found".into()),
            }],
            undated_count: 1,
            has_more_files: true,
            ..Default::default()
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["totalFiles"], 9);
        assert_eq!(v["jpegFiles"], 1);
        assert_eq!(v["uniqueDates"][0], "2025_10_26");
        assert_eq!(v["filesWithoutExif"], 1);
        assert_eq!(v["hasMoreFiles"], true);
        assert_eq!(v["previewOperations"][0]["oldName"], "IMG_1.CR2");
        assert_eq!(v["previewOperations"][0]["type"], "RAW");
        assert!(v["previewOperations"][0]["newPath"].is_null());
        assert!(v.get("preview").is_none());
        assert!(v.get("undatedCount").is_none());
    }

    #[test]
    fn organize_accounting() {
        let report = OrganizeReport {
            image_files: 4,
            success_count: 1,
            skipped_count: 1,
            error_count: 1,
            undated_count: 1,
            undated: vec![FileFailure::new("a.jpg", FileErrorKind::MetadataUnavailable)],
            ..Default::default()
        };
        assert_eq!(report.accounted(), report.image_files);
        assert!(!report.is_clean());
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["undated"][0]["error"]["kind"], "metadataUnavailable");
        assert_eq!(v["undated"][0]["reason"], "No EXIF date found");
    }
}
