use serde::{Deserialize, Serialize};

use crate::labels::LabelMap;

/// Property holding the object-store location of the image.
pub const LOCATION_PROPERTY: &str = "gcs_file";
/// Property holding the filtered label map.
pub const LABELS_PROPERTY: &str = "labels";

/// Namespaced key of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

impl EntityKey {
    pub fn new(namespace: &str, kind: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Storage key, `namespace/kind/name`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

/// Label result for one unique image, keyed by its average hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLabelEntity {
    pub key: EntityKey,
    pub gcs_file: String,
    pub labels: LabelMap,
    pub exclude_from_indexes: Vec<String>,
}

impl ImageLabelEntity {
    /// Both properties are stored unindexed.
    pub fn new(key: EntityKey, gcs_file: String, labels: LabelMap) -> Self {
        Self {
            key,
            gcs_file,
            labels,
            exclude_from_indexes: vec![
                LOCATION_PROPERTY.to_string(),
                LABELS_PROPERTY.to_string(),
            ],
        }
    }

    pub fn image_hash(&self) -> &str {
        &self.key.name
    }
}
