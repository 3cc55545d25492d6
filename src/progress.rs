//! Progress reporting for batch runs.
//!
//! Implement [`BatchProgressCallback`] to observe a run; every method has a
//! no-op default, so callers override only what they care about. The CLI's
//! progress bar is one implementation; [`NoopProgressCallback`] is the
//! silent baseline.

use std::sync::Arc;

/// Observer for batch run milestones.
///
/// Error text is passed as an owned `String` so implementations can move
/// it into channels or logs without borrowing from the run.
pub trait BatchProgressCallback: Send + Sync {
    /// A run has started with `total` items.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Item `index` (zero-based) is about to be converted.
    fn on_item_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Item `index` finished successfully with `output_size` bytes.
    fn on_item_complete(&self, index: usize, total: usize, output_size: u64) {
        let _ = (index, total, output_size);
    }

    /// Item `index` failed; the run continues with the next item.
    fn on_item_error(&self, index: usize, total: usize, error: String) {
        let _ = (index, total, error);
    }

    /// The run finished; `succeeded` of `total` items completed.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// Callback that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Shared handle to a progress callback.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
