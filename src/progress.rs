//! Stage progress reporting for the rendering pipeline.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use uvrender::progress::Progress;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let progress = Progress::new(move |_, _, _| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! progress.report(0, 2, "Loading");
//! progress.report(1, 2, "Rendering");
//! assert_eq!(seen.load(Ordering::Relaxed), 2);
//! ```

use crate::logging::LOG_TARGET;

/// A progress callback that receives stage updates.
///
/// The callback receives:
/// - `current`: Current stage (0-based)
/// - `total`: Total number of stages
/// - `message`: Description of the stage
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Progress reporter that emits `debug` records tagged with `name`.
    pub fn debug_log(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |current, total, message| {
            log::debug!(
                target: LOG_TARGET,
                "{}: [{}/{}] {}",
                name,
                current + 1,
                total,
                message
            );
        })
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
