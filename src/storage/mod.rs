pub mod documents;
pub mod models;
pub mod objects;

pub use documents::{DocumentStore, RocksDbDocumentStore};
pub use models::{EntityKey, ImageLabelEntity};
pub use objects::{FsObjectStore, ObjectStore};
