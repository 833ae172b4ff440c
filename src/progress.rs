/// Trait for reporting tagging progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_load_start(&self) {}
    fn on_load_complete(
        &self,
        _rows_to_label: usize,
        _already_stored: usize,
        _duration_secs: f64,
    ) {
    }
    fn on_batch_start(&self, _batch: usize, _total_batches: usize, _rows: usize) {}
    fn on_batch_complete(&self, _stored: usize, _skipped: usize) {}
    fn on_batch_failed(&self, _batch: usize, _error: &str) {}
    fn on_run_complete(&self, _stored: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
