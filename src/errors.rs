//! Typed error definitions for photo_sort.
//! `EngineError` covers the few failures that abort a whole run; everything else is a
//! per-file `FileErrorKind` recorded in the report.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Folder does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    InputNotDirectory(PathBuf),

    #[error("Cannot read folder {path}: {context}")]
    InputUnreadable { path: PathBuf, context: String },

    #[error("Failed to start metadata reader: {0}")]
    GatewayStartup(String),

    #[error("Metadata reader unavailable: {0}")]
    GatewayUnavailable(String),
}

impl EngineError {
    /// Stable numeric code for structured logs and exit codes.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::InputNotFound(_) => 10,
            EngineError::InputNotDirectory(_) => 11,
            EngineError::InputUnreadable { .. } => 12,
            EngineError::GatewayStartup(_) => 20,
            EngineError::GatewayUnavailable(_) => 21,
        }
    }

    /// Short machine-friendly kind, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InputNotFound(_) => "input_not_found",
            EngineError::InputNotDirectory(_) => "input_not_directory",
            EngineError::InputUnreadable { .. } => "input_unreadable",
            EngineError::GatewayStartup(_) => "gateway_startup",
            EngineError::GatewayUnavailable(_) => "gateway_unavailable",
        }
    }
}

/// Why a single file was not organized.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum FileErrorKind {
    #[error("No EXIF date found")]
    MetadataUnavailable,

    #[error("Could not read EXIF: {0}")]
    MetadataRead(String),

    #[error("Path error: {0}")]
    PathPlanning(String),

    #[error("Move failed: {0}")]
    Relocation(String),

    #[error("Interrupted before processing")]
    Interrupted,
}

/// A file name paired with the reason it was not organized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file: String,
    pub error: FileErrorKind,
    pub reason: String,
}

impl FileFailure {
    pub fn new(file: impl Into<String>, error: FileErrorKind) -> Self {
        let reason = error.to_string();
        Self {
            file: file.into(),
            error,
            reason,
        }
    }
}
