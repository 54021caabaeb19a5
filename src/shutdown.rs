//! Cooperative cancellation for a run.
//! The Ctrl-C handler flips the flag; the batch extractor and the move executor poll it
//! before starting each file so in-flight work finishes and nothing new begins.

use std::sync::atomic::{AtomicBool, Ordering};

static CANCELLED: AtomicBool = AtomicBool::new(false);

/// Ask the current run to stop starting new work. Safe to call from a signal handler.
#[inline]
pub fn request() {
    CANCELLED.store(true, Ordering::Relaxed);
}

/// True once `request()` has been called.
#[inline]
pub fn is_requested() -> bool {
    CANCELLED.load(Ordering::Relaxed)
}

/// Clear the flag (tests only).
#[cfg(test)]
#[inline]
pub fn reset() {
    CANCELLED.store(false, Ordering::Relaxed);
}
