use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::annotate;
use crate::batch;
use crate::config::AppConfig;
use crate::dataset::{self, SourceRow};
use crate::error::Error;
use crate::persist::{LabeledRow, PersistReport, Persister};
use crate::progress::ProgressReporter;
use crate::storage::{DocumentStore, ObjectStore};
use crate::vision::LabelAnnotator;

pub struct TaggingEngine<'a> {
    config: AppConfig,
    documents: &'a dyn DocumentStore,
    objects: &'a dyn ObjectStore,
    annotator: &'a dyn LabelAnnotator,
    export_json: bool,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub load_duration: Duration,
    pub label_duration: Duration,
    pub total_rows: usize,
    pub already_stored: usize,
    pub duplicates_in_dataset: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub stored: usize,
    pub skipped: usize,
    /// Documents built for a batch whose put-multi failed before they were written.
    pub unwritten: usize,
}

impl<'a> TaggingEngine<'a> {
    pub fn new(
        config: AppConfig,
        documents: &'a dyn DocumentStore,
        objects: &'a dyn ObjectStore,
        annotator: &'a dyn LabelAnnotator,
    ) -> Self {
        Self {
            config,
            documents,
            objects,
            annotator,
            export_json: false,
        }
    }

    pub fn with_json_export(mut self, enabled: bool) -> Self {
        self.export_json = enabled;
        self
    }

    /// Run the labeling pipeline over a dataset CSV:
    /// 1. Load rows, hash images, drop already-stored hashes
    /// 2. Split into annotation-sized batches
    /// 3. Per batch: annotate, filter labels, upload, write documents
    ///
    /// Load errors abort the run; a failing batch is logged and the run moves on.
    pub fn run(
        &self,
        dataset: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary, Error> {
        info!("Loading dataset {}", dataset.display());
        reporter.on_load_start();
        let load_start = Instant::now();
        let loaded = dataset::load_dataset(dataset, &self.config, self.documents)?;
        let load_duration = load_start.elapsed();
        reporter.on_load_complete(
            loaded.rows.len(),
            loaded.already_stored,
            load_duration.as_secs_f64(),
        );

        let mut summary = RunSummary {
            load_duration,
            total_rows: loaded.total_rows,
            already_stored: loaded.already_stored,
            duplicates_in_dataset: loaded.duplicates_in_dataset,
            ..RunSummary::default()
        };

        if loaded.rows.is_empty() {
            info!("Nothing to label.");
            return Ok(summary);
        }

        let persister = self.persister()?;
        let label_start = Instant::now();
        let batches = batch::split(
            loaded.rows,
            self.config.max_batch_size,
            self.config.batch_split,
        );
        let total_batches = batches.len();
        summary.batches = total_batches;

        for (index, rows) in batches.into_iter().enumerate() {
            let batch_number = index + 1;
            reporter.on_batch_start(batch_number, total_batches, rows.len());
            debug!(
                "Batch {}/{}: {} rows",
                batch_number,
                total_batches,
                rows.len()
            );

            match self.tag_images(rows, &persister) {
                Ok(report) => {
                    summary.stored += report.written;
                    summary.skipped += report.skipped();
                    match &report.put_error {
                        Some(e) => {
                            error!(
                                "Batch {}/{}: {} of {} documents written: {}",
                                batch_number,
                                total_batches,
                                report.written,
                                report.built(),
                                e
                            );
                            summary.failed_batches += 1;
                            summary.unwritten += report.unwritten();
                            reporter.on_batch_failed(batch_number, &e.to_string());
                        }
                        None => reporter.on_batch_complete(report.written, report.skipped()),
                    }
                }
                Err(e) => {
                    error!("Batch {}/{} failed: {}", batch_number, total_batches, e);
                    summary.failed_batches += 1;
                    reporter.on_batch_failed(batch_number, &e.to_string());
                }
            }
        }

        summary.label_duration = label_start.elapsed();
        reporter.on_run_complete(summary.stored, summary.label_duration.as_secs_f64());
        Ok(summary)
    }

    fn persister(&self) -> Result<Persister<'_>, Error> {
        let persister = Persister::new(&self.config, self.objects, self.documents);
        if !self.export_json {
            return Ok(persister);
        }
        let dir = PathBuf::from(&self.config.output_dir);
        fs::create_dir_all(&dir)?;
        Ok(persister.with_json_export(dir))
    }

    fn tag_images(
        &self,
        rows: Vec<SourceRow>,
        persister: &Persister,
    ) -> Result<PersistReport, Error> {
        let labeled =
            annotate::get_labels(&rows, self.annotator, self.config.score_threshold)?;
        let merged = merge_labels(rows, labeled);
        Ok(persister.store_image_label(&merged))
    }
}

/// Inner join of rows and annotation results on file path.
fn merge_labels(rows: Vec<SourceRow>, labeled: Vec<annotate::LabeledImage>) -> Vec<LabeledRow> {
    let by_path: HashMap<PathBuf, _> = labeled
        .into_iter()
        .map(|image| (image.file_path, image.labels))
        .collect();

    rows.into_iter()
        .filter_map(|row| {
            by_path.get(&row.file_path).map(|labels| LabeledRow {
                labels: labels.clone(),
                row,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::LabeledImage;
    use crate::labels::LabelMap;

    fn row(file: &str) -> SourceRow {
        SourceRow {
            file: file.to_string(),
            file_path: PathBuf::from(format!("images/{}", file)),
            file_id: dataset::file_id(&format!("images/{}", file)),
            image_hash: format!("hash-{}", file),
        }
    }

    #[test]
    fn test_merge_drops_unannotated_rows() {
        let mut labels = LabelMap::new();
        labels.insert("Cat".to_string(), 0.95);
        let labeled = vec![LabeledImage {
            file_path: PathBuf::from("images/b.png"),
            labels: labels.clone(),
        }];

        let merged = merge_labels(vec![row("a.png"), row("b.png")], labeled);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].row.file, "b.png");
        assert_eq!(merged[0].labels, labels);
    }
}
