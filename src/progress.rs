//! Progress reporting for replay.
//!
//! Replay reports after every physical post through a [`ProgressCallback`].
//! Reporting is fire-and-forget: the engine never waits on the callback's
//! result, so callbacks should return quickly.
//!
//! # Example
//!
//! ```rust
//! use slackport::progress::{Progress, ProgressCallback};
//! use std::sync::Arc;
//!
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     println!("{}/{} ({:.1}%)", progress.current, progress.total, progress.percentage());
//! });
//!
//! callback(Progress::new(3, 12));
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of replay progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Physical posts attempted so far, across all channels.
    pub current: usize,

    /// Physical posts planned for the whole run.
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Returns the progress as a percentage (0.0 - 100.0).
    ///
    /// ```rust
    /// use slackport::progress::Progress;
    ///
    /// assert_eq!(Progress::new(5, 10).percentage(), 50.0);
    /// assert_eq!(Progress::new(0, 0).percentage(), 100.0);
    /// ```
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.current as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.current)
    }
}

/// Callback type for receiving progress updates.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Creates a no-op progress callback.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that prints to stderr.
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|progress| {
        eprintln!(
            "Progress: {}/{} ({:.1}%)",
            progress.current,
            progress.total,
            progress.percentage()
        );
    })
}

/// Monotonic counter shared by every channel of one run.
///
/// Each call to [`advance`](ProgressCounter::advance) bumps the counter and
/// reports the new value. The callback runs under the counter's lock, so
/// reports arrive in increasing order even when channels replay in parallel.
pub struct ProgressCounter {
    current: Mutex<usize>,
    total: usize,
    callback: ProgressCallback,
}

impl ProgressCounter {
    pub fn new(total: usize, callback: ProgressCallback) -> Self {
        Self {
            current: Mutex::new(0),
            total,
            callback,
        }
    }

    /// Records one physical post and reports it.
    pub fn advance(&self) {
        let mut current = self.lock();
        *current += 1;
        (self.callback)(Progress::new(*current, self.total));
    }

    pub fn current(&self) -> usize {
        *self.lock()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // A panicking callback must not stop later posts from counting.
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
