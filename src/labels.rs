use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Description → rounded confidence score.
pub type LabelMap = BTreeMap<String, f64>;

/// A single label annotation returned for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f64,
}

impl Label {
    pub fn new(description: &str, score: f64) -> Self {
        Self {
            description: description.to_string(),
            score,
        }
    }
}

/// Keep labels scoring at or above `threshold`, rounded to two decimals.
/// A repeated description keeps the last score seen.
pub fn filter_labels(labels: Option<&[Label]>, threshold: f64) -> LabelMap {
    let mut filtered = LabelMap::new();
    for label in labels.unwrap_or_default() {
        if label.score >= threshold {
            filtered.insert(label.description.clone(), round_score(label.score));
        }
    }
    filtered
}

// Decimal formatting rounds on the exact binary value, which keeps e.g. 0.125 at 0.12.
fn round_score(score: f64) -> f64 {
    format!("{:.2}", score).parse().unwrap_or(score)
}
