//! Progress reporting for a batch run.
//!
//! The driver reports "listing i/n" through [`ProgressCallback`] so it does
//! not depend on any terminal rendering. The CLI plugs in an `indicatif`
//! bar; tests and offline runs use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from [`crate::run_batch`].
pub trait ProgressCallback: Send + Sync {
    /// Number of listings that will be processed.
    fn set_total(&self, total: u64);

    /// Advances by `delta` listings.
    fn inc(&self, delta: u64);

    /// Replaces the status line.
    fn set_message(&self, msg: String);

    /// Marks the run as complete.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
