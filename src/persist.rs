use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::batch::{self, BatchSplit};
use crate::config::AppConfig;
use crate::dataset::{self, SourceRow};
use crate::error::Error;
use crate::labels::LabelMap;
use crate::storage::{DocumentStore, ImageLabelEntity, ObjectStore};

/// A source row joined with its filtered labels.
#[derive(Debug, Clone)]
pub struct LabeledRow {
    pub row: SourceRow,
    pub labels: LabelMap,
}

/// What happened to one row during persistence.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Stored(ImageLabelEntity),
    Skipped {
        file_id: Option<String>,
        reason: String,
    },
}

impl RowOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, RowOutcome::Stored(_))
    }
}

/// Per-row outcomes of one batch and how far the document writes got.
///
/// Entities are written in order; `written` counts those the store accepted before
/// `put_error`, if any. Later sub-batches are not attempted after a failed put.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub outcomes: Vec<RowOutcome>,
    pub put_calls: usize,
    pub written: usize,
    pub put_error: Option<Error>,
}

impl PersistReport {
    /// Rows that produced an entity, whether or not it reached the store.
    pub fn built(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_stored()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.built()
    }

    /// Entities built but never written because a put failed.
    pub fn unwritten(&self) -> usize {
        self.built() - self.written
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LabelExport<'a> {
    image_hash: &'a str,
    labels: &'a LabelMap,
}

pub struct Persister<'a> {
    config: &'a AppConfig,
    objects: &'a dyn ObjectStore,
    documents: &'a dyn DocumentStore,
    export_dir: Option<PathBuf>,
}

impl<'a> Persister<'a> {
    pub fn new(
        config: &'a AppConfig,
        objects: &'a dyn ObjectStore,
        documents: &'a dyn DocumentStore,
    ) -> Self {
        Self {
            config,
            objects,
            documents,
            export_dir: None,
        }
    }

    /// Mirror every stored record to `<dir>/<file id>.json`.
    pub fn with_json_export<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.export_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Upload the image and return its canonical location. Errors are logged and returned.
    pub fn upload_image(&self, file_id: &str, file_path: &Path) -> Result<String, Error> {
        let location = self.objects.location(file_id);
        match self.objects.upload_from_filename(file_id, file_path) {
            Ok(()) => Ok(location),
            Err(e) => {
                error!("Error uploading file {}", location);
                Err(e)
            }
        }
    }

    /// Upload, build the entity and optionally export JSON for a single row.
    /// Never fails: any error turns into `RowOutcome::Skipped`.
    pub fn store_data(&self, labeled: &LabeledRow) -> RowOutcome {
        let file_id = labeled.row.file_id.clone();
        match self.try_store_data(labeled) {
            Ok(entity) => RowOutcome::Stored(entity),
            Err(e) => {
                error!(
                    "Error storing file data: {}: {}",
                    file_id.as_deref().unwrap_or(&labeled.row.file),
                    e
                );
                RowOutcome::Skipped {
                    file_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_store_data(&self, labeled: &LabeledRow) -> Result<ImageLabelEntity, Error> {
        let row = &labeled.row;
        let file_id = row.file_id.as_deref().ok_or_else(|| {
            Error::Other(format!("No file identifier for '{}'", row.file))
        })?;

        let gcs_file = self.upload_image(file_id, &row.file_path)?;
        let entity = ImageLabelEntity::new(
            dataset::entity_key(self.config, &row.image_hash),
            gcs_file,
            labeled.labels.clone(),
        );

        if let Some(dir) = &self.export_dir {
            export_json(dir, file_id, &row.image_hash, &labeled.labels)?;
        }
        Ok(entity)
    }

    /// Persist a labeled batch; documents go out in put-multi calls of at most
    /// `max_put_batch_size`. Stops at the first failed put and records it in the report.
    pub fn store_image_label(&self, rows: &[LabeledRow]) -> PersistReport {
        let outcomes: Vec<RowOutcome> = rows.iter().map(|row| self.store_data(row)).collect();

        let entities: Vec<ImageLabelEntity> = outcomes
            .iter()
            .filter_map(|o| match o {
                RowOutcome::Stored(entity) => Some(entity.clone()),
                RowOutcome::Skipped { .. } => None,
            })
            .collect();

        let mut report = PersistReport {
            outcomes,
            ..PersistReport::default()
        };
        if entities.is_empty() {
            info!("No entities to store.");
            return report;
        }

        let chunks = batch::split(entities, self.config.max_put_batch_size, BatchSplit::Balanced);
        for chunk in chunks {
            report.put_calls += 1;
            match self.documents.put_multi(&chunk) {
                Ok(()) => {
                    report.written += chunk.len();
                    debug!("Stored {} entities", chunk.len());
                }
                Err(e) => {
                    error!(
                        "Error writing {} entities ({} already written): {}",
                        chunk.len(),
                        report.written,
                        e
                    );
                    report.put_error = Some(e);
                    break;
                }
            }
        }
        report
    }
}

fn export_json(
    dir: &Path,
    file_id: &str,
    image_hash: &str,
    labels: &LabelMap,
) -> Result<(), Error> {
    let path = dir.join(format!("{}.json", file_id));
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(
        &mut writer,
        &LabelExport {
            image_hash,
            labels,
        },
    )?;
    writer.flush()?;
    debug!("Exported labels to {}", path.display());
    Ok(())
}
