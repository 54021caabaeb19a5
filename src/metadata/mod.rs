//! Metadata gateway.
//! The engine only needs two capabilities from a metadata reader: `read(path)` and
//! `shutdown()`. `ExifToolGateway` is the production implementation; tests plug in their own.

mod exiftool;

pub use exiftool::{ExifToolGateway, GatewayError, GatewayOptions};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::date::CaptureDate;

/// Result of a successful metadata read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    /// `None` when the file carries no DateTimeOriginal tag.
    pub capture_date: Option<CaptureDate>,
    /// Non-fatal parser warnings.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The reader could not be started at all. Fatal for the run.
    #[error("metadata reader failed to start: {0}")]
    Startup(String),

    #[error("{0}")]
    Read(String),

    #[error("metadata read timed out after {0:?}")]
    Timeout(Duration),

    /// A read was attempted after shutdown began.
    #[error("metadata reader is shut down")]
    Closed,
}

/// Capability the engine consumes to recover capture dates.
///
/// Implementations must be safe to call from several threads at once, and `shutdown` must be
/// idempotent and must never panic.
pub trait MetadataSource: Send + Sync {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetadataError>;
    fn shutdown(&self);
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        (**self).read(path)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

impl<T: MetadataSource + ?Sized> MetadataSource for Arc<T> {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        (**self).read(path)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
