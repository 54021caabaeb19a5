//! Bounded rayon pools for one run.

use rayon::ThreadPoolBuilder;
use tracing::warn;

/// Run `op` on a dedicated pool of `jobs` threads.
/// Falls back to the global pool if a dedicated one cannot be built.
pub(crate) fn install<R, F>(jobs: usize, name: &'static str, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(move |i| format!("photo_sort-{name}-{i}"))
        .build()
    {
        Ok(pool) => pool.install(op),
        Err(e) => {
            warn!(error = %e, pool = name, "could not build thread pool; using global pool");
            op()
        }
    }
}
