use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::phash;
use crate::storage::{DocumentStore, EntityKey};

/// One image listed in the dataset CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub file: String,
    pub file_path: PathBuf,
    pub file_id: Option<String>,
    pub image_hash: String,
}

#[derive(Debug, Deserialize)]
struct DatasetRecord {
    file: String,
}

/// Rows left to label after deduplication, with load counters.
#[derive(Debug, Default)]
pub struct LoadedDataset {
    pub rows: Vec<SourceRow>,
    pub total_rows: usize,
    pub already_stored: usize,
    pub duplicates_in_dataset: usize,
}

fn file_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.+/([A-Za-z0-9_-]+).[A-Za-z]+").expect("file id pattern is valid")
    })
}

/// Name portion of `<dir>/<name>.<ext>`, or `None` when the path has another shape.
pub fn file_id(file_path: &str) -> Option<String> {
    file_id_pattern()
        .captures(file_path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn entity_key(config: &AppConfig, image_hash: &str) -> EntityKey {
    EntityKey::new(&config.namespace, &config.entity_kind, image_hash)
}

/// Read the dataset CSV and keep the rows whose image hash is not stored yet.
///
/// CSV and image errors abort the load.
pub fn load_dataset(
    csv_path: &Path,
    config: &AppConfig,
    documents: &dyn DocumentStore,
) -> Result<LoadedDataset, Error> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let records = reader
        .deserialize::<DatasetRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    let total_rows = records.len();
    debug!("Read {} rows from {}", total_rows, csv_path.display());

    let rows = records
        .into_par_iter()
        .map(|record| -> Result<SourceRow, Error> {
            let file_path = format!("{}/{}", config.image_folder, record.file);
            let image_hash = phash::average_hash(Path::new(&file_path))?;
            Ok(SourceRow {
                file_id: file_id(&file_path),
                file: record.file,
                file_path: PathBuf::from(file_path),
                image_hash,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (rows, duplicates_in_dataset) = if config.dedupe_within_dataset {
        drop_repeated_hashes(rows)
    } else {
        (rows, 0)
    };

    let keys: Vec<EntityKey> = rows
        .iter()
        .map(|row| entity_key(config, &row.image_hash))
        .collect();
    let existing: HashSet<String> = if keys.is_empty() {
        HashSet::new()
    } else {
        documents
            .get_multi(&keys)?
            .into_iter()
            .map(|entity| entity.key.name)
            .collect()
    };

    let before = rows.len();
    let rows: Vec<SourceRow> = rows
        .into_iter()
        .filter(|row| !existing.contains(&row.image_hash))
        .collect();
    let already_stored = before - rows.len();

    info!(
        "{} rows in dataset, {} already labeled, {} to label",
        total_rows,
        already_stored,
        rows.len()
    );

    Ok(LoadedDataset {
        rows,
        total_rows,
        already_stored,
        duplicates_in_dataset,
    })
}

fn drop_repeated_hashes(rows: Vec<SourceRow>) -> (Vec<SourceRow>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    for row in rows {
        if seen.insert(row.image_hash.clone()) {
            kept.push(row);
        } else {
            warn!(
                "Skipping {}: same image hash {} as an earlier row",
                row.file, row.image_hash
            );
            dropped += 1;
        }
    }
    (kept, dropped)
}
