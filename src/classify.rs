//! Filename classification.
//! Decides whether a file name is an image we organize, and whether it is RAW or compressed.
//! Also extracts the numeric identifier camera bodies embed in file names (`IMG_5498.CR2`).
//!
//! Everything here is pure string work; nothing touches the filesystem.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Vendor RAW extensions (lowercase, no dot).
pub const RAW_EXTENSIONS: &[&str] = &["cr2", "nef", "arw"];
/// Compressed image extensions (lowercase, no dot).
pub const COMPRESSED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Image class used to pick the destination subfolder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ImageKind {
    #[serde(rename = "RAW")]
    Raw,
    #[serde(rename = "JPEG")]
    Compressed,
}

impl ImageKind {
    /// Suffix of the per-date subfolder: `raw` or `jpg`.
    pub fn folder_suffix(self) -> &'static str {
        match self {
            ImageKind::Raw => "raw",
            ImageKind::Compressed => "jpg",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageKind::Raw => "RAW",
            ImageKind::Compressed => "JPEG",
        })
    }
}

/// The file name does not follow `<prefix>_<digits>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoIdentifier;

impl fmt::Display for NoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("file name does not match <prefix>_<digits>.<ext>")
    }
}

impl std::error::Error for NoIdentifier {}

/// Lowercase extension without the dot, if any.
fn lower_extension(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    if ext.is_empty() || dot == 0 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a file name. `None` means "not an image we handle" (silently filtered).
pub fn classify(name: &str) -> Option<ImageKind> {
    let ext = lower_extension(name)?;
    if RAW_EXTENSIONS.contains(&ext.as_str()) {
        Some(ImageKind::Raw)
    } else if COMPRESSED_EXTENSIONS.contains(&ext.as_str()) {
        Some(ImageKind::Compressed)
    } else {
        None
    }
}

/// Extension including the leading dot, original case preserved (`.CR2`).
/// Returns an empty string when the name has no extension.
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[dot..],
        _ => "",
    }
}

/// Extract the digits from `<prefix>_<digits>.<ext>`.
///
/// Digits are returned as written so leading zeros survive (`IMG_0042.jpg` -> `"0042"`).
pub fn extract_identifier(name: &str) -> Result<String, NoIdentifier> {
    let dot = name.rfind('.').ok_or(NoIdentifier)?;
    let stem = &name[..dot];
    let underscore = stem.rfind('_').ok_or(NoIdentifier)?;
    let (prefix, digits) = (&stem[..underscore], &stem[underscore + 1..]);
    if prefix.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NoIdentifier);
    }
    Ok(digits.to_string())
}

/// A recognised image discovered by a folder scan. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub source: PathBuf,
    pub kind: ImageKind,
    pub identifier: Result<String, NoIdentifier>,
    pub size: u64,
}

impl ImageFile {
    /// Build an ImageFile for `name` inside `folder`; `None` if the name is not an image.
    pub fn from_name(folder: &Path, name: &str, size: u64) -> Option<Self> {
        let kind = classify(name)?;
        Some(Self {
            name: name.to_string(),
            source: folder.join(name),
            kind,
            identifier: extract_identifier(name),
            size,
        })
    }

    pub fn extension(&self) -> &str {
        extension(&self.name)
    }
}
