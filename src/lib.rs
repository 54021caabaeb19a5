//! Core library for `photo_sort`.
//!
//! Scans a folder of photos, reads each capture date through exiftool, and moves files into
//! `YYYY_MM_DD/YYYY_MM_DD-{raw|jpg}/` folders without ever replacing an existing file.
//!
//! Entry points: [`analyze`] (read-only preview) and [`organize`] (moves files), or
//! [`Engine`] when the caller supplies its own [`MetadataSource`].

pub mod classify;
pub mod cli;
pub mod config;
pub mod date;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod fs_ops;
pub mod metadata;
pub mod output;
pub mod plan;
pub mod platform;
mod pool;
pub mod report;
pub mod shutdown;

pub use classify::{classify, extension, extract_identifier, ImageFile, ImageKind, NoIdentifier};
pub use config::{
    default_config_path, default_log_path, path_has_symlink_ancestor, Config, LogLevel,
};
pub use date::CaptureDate;
pub use engine::{analyze, organize, scan_folder, Engine, FolderScan};
pub use errors::{EngineError, FileErrorKind, FileFailure};
pub use metadata::{
    ExifToolGateway, GatewayError, GatewayOptions, MetadataError, MetadataRecord, MetadataSource,
};
pub use plan::{plan as plan_path, MoveStatus};
pub use report::{AnalysisReport, FileWarning, OrganizeReport, PreviewOperation, PREVIEW_LIMIT};
