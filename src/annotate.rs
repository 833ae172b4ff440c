use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::dataset::SourceRow;
use crate::error::Error;
use crate::labels::{filter_labels, LabelMap};
use crate::vision::{AnnotateImageRequest, LabelAnnotator};

/// Filtered labels for one successfully annotated file.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub file_path: PathBuf,
    pub labels: LabelMap,
}

/// Request labels for one chunk of rows in a single batched call.
///
/// Unreadable files are logged and left out of the request. Responses are matched
/// back to rows by their position in the request list.
pub fn get_labels(
    rows: &[SourceRow],
    annotator: &dyn LabelAnnotator,
    score_threshold: f64,
) -> Result<Vec<LabeledImage>, Error> {
    let mut requests = Vec::with_capacity(rows.len());
    let mut request_files: Vec<&PathBuf> = Vec::with_capacity(rows.len());

    for row in rows {
        match fs::read(&row.file_path) {
            Ok(content) => {
                requests.push(AnnotateImageRequest::label_detection(content));
                request_files.push(&row.file_path);
            }
            Err(e) => {
                error!("Error reading {}: {}", row.file_path.display(), e);
            }
        }
    }

    if requests.is_empty() {
        return Ok(Vec::new());
    }

    info!("Detect labels for image batch {:?}", request_files);
    let responses = annotator.batch_annotate_images(&requests)?;
    if responses.len() != requests.len() {
        warn!(
            "Expected {} annotation responses, got {}",
            requests.len(),
            responses.len()
        );
    }

    let mut labeled = Vec::with_capacity(responses.len());
    for (file_path, response) in request_files.into_iter().zip(responses) {
        if let Some(status) = response.error {
            error!(
                "Annotation failed for {}: {} ({})",
                file_path.display(),
                status.message,
                status.code
            );
            continue;
        }
        labeled.push(LabeledImage {
            file_path: file_path.clone(),
            labels: filter_labels(response.label_annotations.as_deref(), score_threshold),
        });
    }
    Ok(labeled)
}
