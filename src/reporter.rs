use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use vision_labeler::ProgressReporter;

/// CLI progress reporter using indicatif.
///
/// - Load phase: spinner (hashing every listed image)
/// - Label phase: progress bar over batches
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

impl ProgressReporter for CliReporter {
    fn on_load_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(spinner_style());
        pb.set_message("Hashing dataset images...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_load_complete(&self, rows_to_label: usize, already_stored: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Load complete: {} to label, {} already labeled in {:.2}s",
            rows_to_label, already_stored, duration_secs
        );
    }

    fn on_batch_start(&self, batch: usize, total_batches: usize, rows: usize) {
        if batch == 1 {
            let pb = ProgressBar::new(total_batches as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "  {spinner:.cyan} Labeling [{bar:30.cyan/dim}] {pos}/{len} batches {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸─")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            pb.enable_steady_tick(Duration::from_millis(80));
            self.set_bar(pb);
        }
        self.with_bar(|pb| pb.set_message(format!("({} images)", rows)));
    }

    fn on_batch_complete(&self, _stored: usize, _skipped: usize) {
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_batch_failed(&self, _batch: usize, _error: &str) {
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_run_complete(&self, stored: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Labeling complete: {} records stored in {:.2}s",
            stored, duration_secs
        );
    }
}
