use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::error::Error;

/// Blob storage for the raw image bytes.
pub trait ObjectStore {
    fn bucket(&self) -> &str;

    /// Upload the contents of `source` under `object_name` in the bucket.
    fn upload_from_filename(&self, object_name: &str, source: &Path) -> Result<(), Error>;

    /// Canonical location string of an object in this store.
    fn location(&self, object_name: &str) -> String {
        format!("gs://{}/{}", self.bucket(), object_name)
    }
}

/// Object store laid out on the local filesystem as `<root>/<bucket>/<object>`.
pub struct FsObjectStore {
    root: PathBuf,
    bucket: String,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P, bucket: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            bucket: bucket.to_string(),
        }
    }

    pub fn object_path(&self, object_name: &str) -> PathBuf {
        self.root.join(&self.bucket).join(object_name)
    }
}

impl ObjectStore for FsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn upload_from_filename(&self, object_name: &str, source: &Path) -> Result<(), Error> {
        if object_name.is_empty() || object_name.contains(['/', '\\']) || object_name == ".." {
            return Err(Error::Other(format!("Invalid object name '{}'", object_name)));
        }
        let dest = self.object_path(object_name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = fs::copy(source, &dest)?;
        trace!("Uploaded {} ({} bytes) to {}", source.display(), bytes, dest.display());
        Ok(())
    }
}
