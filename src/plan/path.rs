//! Path planner.
//! `root/D/D-{raw|jpg}/D_<id><ext>` with `D = YYYY_MM_DD`. Pure: no filesystem access.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classify::{classify, extension, extract_identifier, ImageFile, ImageKind};
use crate::date::CaptureDate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no numeric identifier in '{0}' (expected <prefix>_<digits>.<ext>)")]
    NoIdentifier(String),
    #[error("'{0}' is not a recognised image file")]
    NotAnImage(String),
}

/// `root/YYYY_MM_DD`
pub fn date_dir(root: &Path, date: CaptureDate) -> PathBuf {
    root.join(date.to_string())
}

/// `root/YYYY_MM_DD/YYYY_MM_DD-raw` or `...-jpg`
pub fn kind_dir(root: &Path, date: CaptureDate, kind: ImageKind) -> PathBuf {
    date_dir(root, date).join(format!("{date}-{}", kind.folder_suffix()))
}

fn build(root: &Path, date: CaptureDate, kind: ImageKind, id: &str, ext: &str) -> PathBuf {
    kind_dir(root, date, kind).join(format!("{date}_{id}{ext}"))
}

/// Destination for a bare file name.
pub fn plan(root: &Path, date: CaptureDate, file_name: &str) -> Result<PathBuf, PlanError> {
    let kind = classify(file_name).ok_or_else(|| PlanError::NotAnImage(file_name.to_string()))?;
    let id = extract_identifier(file_name)
        .map_err(|_| PlanError::NoIdentifier(file_name.to_string()))?;
    Ok(build(root, date, kind, &id, extension(file_name)))
}

/// Destination for a scanned file (uses its cached classification and identifier).
pub fn destination(root: &Path, date: CaptureDate, file: &ImageFile) -> Result<PathBuf, PlanError> {
    let id = file
        .identifier
        .as_deref()
        .map_err(|_| PlanError::NoIdentifier(file.name.clone()))?;
    Ok(build(root, date, file.kind, id, file.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> CaptureDate {
        CaptureDate::from_ymd(2025, 10, 26).unwrap()
    }

    #[test]
    fn raw_and_jpg_layout() {
        let root = Path::new("/photos");
        assert_eq!(
            plan(root, d(), "IMG_5498.CR2").unwrap(),
            PathBuf::from("/photos/2025_10_26/2025_10_26-raw/2025_10_26_5498.CR2")
        );
        assert_eq!(
            plan(root, d(), "IMG_5499.jpg").unwrap(),
            PathBuf::from("/photos/2025_10_26/2025_10_26-jpg/2025_10_26_5499.jpg")
        );
        assert_eq!(
            plan(root, d(), "DSC_0001.PNG").unwrap(),
            PathBuf::from("/photos/2025_10_26/2025_10_26-jpg/2025_10_26_0001.PNG")
        );
    }

    #[test]
    fn deterministic() {
        let root = Path::new("/photos");
        for name in ["IMG_1.CR2", "IMG_22.jpeg", "A_3.nef"] {
            assert_eq!(plan(root, d(), name), plan(root, d(), name));
        }
    }

    #[test]
    fn missing_identifier_is_an_error() {
        let root = Path::new("/photos");
        assert_eq!(
            plan(root, d(), "photo.CR2"),
            Err(PlanError::NoIdentifier("photo.CR2".into()))
        );
        assert_eq!(
            plan(root, d(), "notes.txt"),
            Err(PlanError::NotAnImage("notes.txt".into()))
        );
    }

    #[test]
    fn destination_matches_plan() {
        let root = Path::new("/photos");
        let file = ImageFile::from_name(root, "IMG_77.ARW", 0).unwrap();
        assert_eq!(destination(root, d(), &file), plan(root, d(), "IMG_77.ARW"));
    }
}
