#![allow(dead_code)]

use image::{GrayImage, Luma};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

use vision_labeler::labels::Label;
use vision_labeler::storage::{
    DocumentStore, EntityKey, FsObjectStore, ImageLabelEntity, ObjectStore,
};
use vision_labeler::vision::{AnnotateImageRequest, AnnotateImageResponse, LabelAnnotator};
use vision_labeler::{AppConfig, Error};

/// Write an 8x8 black/white PNG whose average hash is exactly `pattern`.
/// `pattern` must contain both set and unset bits.
pub fn write_pattern_image(path: &Path, pattern: u64) {
    let img = GrayImage::from_fn(8, 8, |x, y| {
        let bit = 63 - (y * 8 + x);
        if (pattern >> bit) & 1 == 1 {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    img.save(path).unwrap();
}

/// Distinct hash patterns for test images.
pub fn pattern(i: usize) -> u64 {
    0x00ff_00ff_0000_0000 ^ ((i as u64 + 1) << 4)
}

/// Create `<root>/images/<name>` for every (name, pattern) and a dataset CSV listing them.
pub fn write_dataset(root: &Path, files: &[(&str, u64)]) -> std::path::PathBuf {
    let images = root.join("images");
    fs::create_dir_all(&images).unwrap();
    let mut csv = String::from("file,comment\n");
    for (name, bits) in files {
        write_pattern_image(&images.join(name), *bits);
        csv.push_str(&format!("{},test image\n", name));
    }
    let csv_path = root.join("dataset.csv");
    fs::write(&csv_path, csv).unwrap();
    csv_path
}

pub fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        image_folder: root.join("images").to_string_lossy().into_owned(),
        output_dir: root.join("output").to_string_lossy().into_owned(),
        document_store_path: root.join("labels.db").to_string_lossy().into_owned(),
        object_store_root: root.join("buckets").to_string_lossy().into_owned(),
        ..AppConfig::default()
    }
}

/// Answers every image with a Cat (0.95) and a Blurry (0.4) label.
#[derive(Default)]
pub struct FakeAnnotator {
    pub calls: RefCell<Vec<usize>>,
    pub fail_calls: Vec<usize>,
}

impl FakeAnnotator {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_calls: calls.to_vec(),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.borrow().clone()
    }
}

impl LabelAnnotator for FakeAnnotator {
    fn batch_annotate_images(
        &self,
        requests: &[AnnotateImageRequest],
    ) -> Result<Vec<AnnotateImageResponse>, Error> {
        let call = self.calls.borrow().len();
        self.calls.borrow_mut().push(requests.len());
        if self.fail_calls.contains(&call) {
            return Err(Error::Annotation("service unavailable".to_string()));
        }
        Ok(requests
            .iter()
            .map(|_| AnnotateImageResponse {
                label_annotations: Some(vec![
                    Label::new("Cat", 0.95),
                    Label::new("Blurry", 0.4),
                ]),
                error: None,
            })
            .collect())
    }
}

/// Filesystem object store that refuses one object name.
pub struct FailingObjectStore {
    pub inner: FsObjectStore,
    pub fail_on: String,
}

impl ObjectStore for FailingObjectStore {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    fn upload_from_filename(&self, object_name: &str, source: &Path) -> Result<(), Error> {
        if object_name == self.fail_on {
            return Err(Error::Other(format!("upload of {} refused", object_name)));
        }
        self.inner.upload_from_filename(object_name, source)
    }
}

/// Accepts every upload without touching the filesystem.
pub struct NullObjectStore;

impl ObjectStore for NullObjectStore {
    fn bucket(&self) -> &str {
        "null-bucket"
    }

    fn upload_from_filename(&self, _object_name: &str, _source: &Path) -> Result<(), Error> {
        Ok(())
    }
}

/// In-memory document store that records the size of every put-multi call.
#[derive(Default)]
pub struct RecordingDocumentStore {
    pub entities: RefCell<Vec<ImageLabelEntity>>,
    pub put_sizes: RefCell<Vec<usize>>,
}

impl DocumentStore for RecordingDocumentStore {
    fn get_multi(&self, keys: &[EntityKey]) -> Result<Vec<ImageLabelEntity>, Error> {
        let entities = self.entities.borrow();
        Ok(keys
            .iter()
            .filter_map(|k| entities.iter().find(|e| &e.key == k).cloned())
            .collect())
    }

    fn put_multi(&self, entities: &[ImageLabelEntity]) -> Result<(), Error> {
        self.put_sizes.borrow_mut().push(entities.len());
        self.entities.borrow_mut().extend_from_slice(entities);
        Ok(())
    }
}

/// Document store whose `fail_on_put`-th put-multi call (1-based) fails.
pub struct FailingDocumentStore<S> {
    pub inner: S,
    pub fail_on_put: usize,
    pub puts: Cell<usize>,
}

impl<S: DocumentStore> FailingDocumentStore<S> {
    pub fn new(inner: S, fail_on_put: usize) -> Self {
        Self {
            inner,
            fail_on_put,
            puts: Cell::new(0),
        }
    }
}

impl<S: DocumentStore> DocumentStore for FailingDocumentStore<S> {
    fn get_multi(&self, keys: &[EntityKey]) -> Result<Vec<ImageLabelEntity>, Error> {
        self.inner.get_multi(keys)
    }

    fn put_multi(&self, entities: &[ImageLabelEntity]) -> Result<(), Error> {
        let call = self.puts.get() + 1;
        self.puts.set(call);
        if call == self.fail_on_put {
            return Err(Error::Other("deadline exceeded".to_string()));
        }
        self.inner.put_multi(entities)
    }
}
