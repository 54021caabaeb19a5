//! Filesystem mutation: directory preparation, locking and no-overwrite relocation.

mod execute;
mod helpers;
mod lock;

pub use execute::{execute, ExecutionSummary, FileOutcome};
pub use helpers::describe_io_error;
pub use lock::{acquire_dir_lock, try_acquire_dir_lock, DirLock, LOCK_FILE_NAME};
