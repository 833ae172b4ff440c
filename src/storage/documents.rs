use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, trace};

use super::models::{EntityKey, ImageLabelEntity};
use crate::error::Error;

/// Namespaced entity store used as the dedup index and label repository.
pub trait DocumentStore {
    /// Fetch the entities that exist for `keys`. Missing keys are absent from the result.
    fn get_multi(&self, keys: &[EntityKey]) -> Result<Vec<ImageLabelEntity>, Error>;

    /// Write all `entities` in one call, overwriting any existing key.
    fn put_multi(&self, entities: &[ImageLabelEntity]) -> Result<(), Error>;
}

/// Document store persisted in a local RocksDB database.
/// Values are bincode-encoded entities under `namespace/kind/name` keys.
pub struct RocksDbDocumentStore {
    db: DB,
}

impl RocksDbDocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        let db = DB::open(&db_options, path.as_ref())?;
        debug!("Using '{}' for document store", path.as_ref().display());
        Ok(Self { db })
    }

    pub fn get(&self, key: &EntityKey) -> Result<Option<ImageLabelEntity>, Error> {
        match self.db.get(key.path().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<usize, Error> {
        let mut count = 0usize;
        for item in self.db.iterator(IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

impl DocumentStore for RocksDbDocumentStore {
    fn get_multi(&self, keys: &[EntityKey]) -> Result<Vec<ImageLabelEntity>, Error> {
        let db_keys: Vec<String> = keys.iter().map(|k| k.path()).collect();
        let mut found = Vec::new();
        for value in self.db.multi_get(db_keys.iter().map(|k| k.as_bytes())) {
            if let Some(bytes) = value? {
                found.push(bincode::deserialize::<ImageLabelEntity>(&bytes)?);
            }
        }
        trace!("get_multi: {} of {} keys found", found.len(), keys.len());
        Ok(found)
    }

    fn put_multi(&self, entities: &[ImageLabelEntity]) -> Result<(), Error> {
        let mut batch = WriteBatch::default();
        for entity in entities {
            batch.put(entity.key.path().as_bytes(), bincode::serialize(entity)?);
        }
        self.db.write(batch)?;
        trace!("put_multi: {} entities written", entities.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelMap;
    use tempfile::tempdir;

    fn entity(hash: &str) -> ImageLabelEntity {
        let mut labels = LabelMap::new();
        labels.insert("Cat".to_string(), 0.95);
        ImageLabelEntity::new(
            EntityKey::new("ns", "ImageLabel", hash),
            format!("gs://bucket/{}", hash),
            labels,
        )
    }

    #[test]
    fn test_put_then_get_multi() {
        let dir = tempdir().unwrap();
        let store = RocksDbDocumentStore::open(dir.path().join("docs")).unwrap();

        store.put_multi(&[entity("aa"), entity("bb")]).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let keys = vec![
            EntityKey::new("ns", "ImageLabel", "aa"),
            EntityKey::new("ns", "ImageLabel", "zz"),
            EntityKey::new("ns", "ImageLabel", "bb"),
        ];
        let found = store.get_multi(&keys).unwrap();
        let names: Vec<&str> = found.iter().map(|e| e.image_hash()).collect();
        assert_eq!(names, vec!["aa", "bb"]);
        assert_eq!(found[0].labels.get("Cat"), Some(&0.95));
        assert_eq!(found[0].exclude_from_indexes, vec!["gcs_file", "labels"]);
    }

    #[test]
    fn test_namespace_separates_keys() {
        let dir = tempdir().unwrap();
        let store = RocksDbDocumentStore::open(dir.path().join("docs")).unwrap();
        store.put_multi(&[entity("aa")]).unwrap();

        let other = EntityKey::new("other-ns", "ImageLabel", "aa");
        assert!(store.get(&other).unwrap().is_none());
        assert!(store.get_multi(&[other]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_get_multi() {
        let dir = tempdir().unwrap();
        let store = RocksDbDocumentStore::open(dir.path().join("docs")).unwrap();
        assert!(store.get_multi(&[]).unwrap().is_empty());
    }
}
